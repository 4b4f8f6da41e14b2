//! Repository policy envelope: the policy applies to the listed
//! repositories, or to the whole project when none are listed.

use super::PolicyType;
use super::driver::Envelope;
use super::settings::{PolicySettings, strings};
use declarative::{Attribute, Error, Result, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireScope {
    repository_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryPolicy<S> {
    #[serde(default)]
    pub repository_ids: Vec<String>,
    #[serde(flatten)]
    pub settings: S,
}

impl<S: PolicySettings> Envelope for RepositoryPolicy<S> {
    fn policy_type() -> PolicyType {
        S::POLICY_TYPE
    }

    fn schema(schema: Schema) -> Schema {
        let repository_ids = match S::POLICY_TYPE {
            PolicyType::SearchableBranches => Attribute::required(strings()).items(Some(1), Some(1)),
            _ => Attribute::optional(strings())
                .description("Repositories the policy applies to. Empty applies it to the whole project."),
        };
        S::attributes()
            .into_iter()
            .fold(schema.attribute("repository_ids", repository_ids), |schema, (name, attribute)| {
                schema.attribute(name, attribute)
            })
    }

    fn expand(&self) -> Result<Map<String, Value>> {
        let scope: Vec<Value> = if self.repository_ids.is_empty() {
            vec![json!({"repositoryId": ""})]
        } else {
            self.repository_ids
                .iter()
                .map(|id| json!({"repositoryId": id}))
                .collect()
        };
        let mut wire = Map::new();
        wire.insert("scope".to_string(), Value::Array(scope));
        self.settings.expand(&mut wire)?;
        Ok(wire)
    }

    fn flatten(settings: &Map<String, Value>) -> Result<Self> {
        let scope: Vec<WireScope> = match settings.get("scope") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::internal(format!("Unable to unmarshal policy settings. Error: {e}")))?,
        };
        Ok(Self {
            repository_ids: scope
                .into_iter()
                .filter_map(|s| s.repository_id)
                .filter(|id| !id.is_empty())
                .collect(),
            settings: S::flatten(settings)?,
        })
    }

    fn forced_flags() -> Option<bool> {
        S::forced_flags()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Clients;
    use crate::policy::driver::{PolicyResource, expand, flatten};
    use crate::policy::settings::{FileSizeSettings, ReservedNamesSettings, SearchableBranchesSettings};
    use crate::policy::{PolicyBase, PolicyState};
    use crate::testutil::FakeDevOps;
    use declarative::{CreateRequest, ManagedResource, Resource, ResourceWrapper};

    #[test]
    fn test_no_repositories_means_project_wide() {
        let policy = RepositoryPolicy {
            repository_ids: Vec::new(),
            settings: ReservedNamesSettings {},
        };
        let wire = policy.expand().unwrap();
        assert_eq!(wire["scope"], json!([{"repositoryId": ""}]));

        let read = RepositoryPolicy::<ReservedNamesSettings>::flatten(&wire).unwrap();
        assert!(read.repository_ids.is_empty());
    }

    #[test]
    fn test_repositories_become_scopes() {
        let policy = RepositoryPolicy {
            repository_ids: vec!["r1".to_string(), "r2".to_string()],
            settings: FileSizeSettings { max_file_size: 1 },
        };
        let wire = policy.expand().unwrap();
        assert_eq!(wire["scope"], json!([{"repositoryId": "r1"}, {"repositoryId": "r2"}]));
        assert_eq!(wire["maximumGitBlobSizeInBytes"], 1_048_576);
        assert_eq!(RepositoryPolicy::<FileSizeSettings>::flatten(&wire).unwrap(), policy);
    }

    #[test]
    fn test_searchable_branches_forces_flags_off() {
        let state = PolicyState {
            base: PolicyBase {
                project_id: "p".to_string(),
                ..PolicyBase::default()
            },
            body: RepositoryPolicy {
                repository_ids: vec!["r1".to_string()],
                settings: SearchableBranchesSettings {
                    searchable_branches: vec!["refs/heads/main".to_string()],
                },
            },
        };
        let (config, _) = expand(&state).unwrap();
        assert!(!config.is_enabled);
        assert!(!config.is_blocking);
        assert_eq!(config.settings["searchBranches"], json!(["refs/heads/main"]));

        let mut created = config;
        created.id = Some(3);
        let read: PolicyState<RepositoryPolicy<SearchableBranchesSettings>> = flatten(&created, "p").unwrap();
        assert_eq!(read.body, state.body);
    }

    #[test]
    fn test_searchable_branches_schema() {
        let clients = Clients::from_backend(FakeDevOps::new());
        let resource = PolicyResource::<RepositoryPolicy<SearchableBranchesSettings>>::new(&clients);
        let schema = resource.schema();
        assert!(schema.get("enabled").is_none());
        assert!(schema.get("blocking").is_none());
        let repository_ids = schema.get("repository_ids").unwrap();
        assert!(repository_ids.required);
        assert_eq!((repository_ids.min_items, repository_ids.max_items), (Some(1), Some(1)));
    }

    #[test]
    fn test_create_file_size_policy() {
        let fake = FakeDevOps::new();
        let clients = Clients::from_backend(fake.clone());
        let wrapper = ResourceWrapper::new(PolicyResource::<RepositoryPolicy<FileSizeSettings>>::new(&clients));
        let response = wrapper.create(CreateRequest {
            plan: json!({"project_id": "p", "max_file_size": 200}),
            ..CreateRequest::default()
        });
        assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["max_file_size"], 200);
        assert_eq!(state["repository_ids"], json!([]));
        let stored = fake.policy(1).unwrap();
        assert_eq!(stored.settings["maximumGitBlobSizeInBytes"], 209_715_200);
        assert_eq!(stored.settings["scope"], json!([{"repositoryId": ""}]));
    }
}
