//! Generic lifecycle of one policy configuration type.
//!
//! [`expand`] turns resource state into a [`PolicyConfiguration`] and
//! [`flatten`] goes the other way. The envelope `E` encodes everything
//! under `settings`; the driver owns the id, project and the two flags.

use super::PolicyType;
use crate::client::Clients;
use azdo_api::models::policy::{PolicyConfiguration, PolicyTypeRef};
use azdo_api::{CoreClient, PolicyClient};
use declarative::{
    Attribute, AttributeType, BoxedResource, Context, Error, IdentityField, Resource, ResourceTimeout,
    ResourceWrapper, Result, Schema,
};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Wire layout of the `settings` object for one family of policy types.
pub trait Envelope: Serialize + DeserializeOwned + Clone + Default + Debug + PartialEq + Send + Sync + 'static {
    fn policy_type() -> PolicyType;

    /// Add the attributes this envelope owns.
    fn schema(schema: Schema) -> Schema;

    fn expand(&self) -> Result<Map<String, Value>>;

    fn flatten(settings: &Map<String, Value>) -> Result<Self>;

    /// Value the service requires for both `enabled` and `blocking`.
    fn forced_flags() -> Option<bool> {
        None
    }
}

const fn enabled_by_default() -> bool {
    true
}

/// Attributes shared by every policy resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBase {
    /// Policy configuration id, as a decimal string.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default = "enabled_by_default")]
    pub blocking: bool,
}

impl Default for PolicyBase {
    fn default() -> Self {
        Self {
            id: String::new(),
            project_id: String::new(),
            enabled: true,
            blocking: true,
        }
    }
}

/// Resource state of one policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyState<E> {
    #[serde(flatten)]
    pub base: PolicyBase,
    #[serde(flatten)]
    pub body: E,
}

fn parse_policy_id(id: &str, summary: &str) -> Result<i64> {
    id.parse()
        .map_err(|e| Error::input(format!("{summary}: ({e})")))
}

/// Build the configuration for `state`, returning it with the project id.
pub fn expand<E: Envelope>(state: &PolicyState<E>) -> Result<(PolicyConfiguration, String)> {
    let settings = state
        .body
        .expand()
        .map_err(|e| e.context("parsing policy configuration settings"))?;
    let (enabled, blocking) = match E::forced_flags() {
        Some(flag) => (flag, flag),
        None => (state.base.enabled, state.base.blocking),
    };
    let id = match state.base.id.as_str() {
        "" => None,
        id => Some(parse_policy_id(id, "parsing policy configuration ID")?),
    };

    let config = PolicyConfiguration {
        id,
        is_enabled: enabled,
        is_blocking: blocking,
        is_deleted: false,
        policy_type: PolicyTypeRef {
            id: E::policy_type().id(),
            display_name: None,
        },
        settings,
        revision: None,
    };
    Ok((config, state.base.project_id.clone()))
}

/// State for a configuration read from `project_id`.
pub fn flatten<E: Envelope>(config: &PolicyConfiguration, project_id: &str) -> Result<PolicyState<E>> {
    let id = config
        .id
        .ok_or_else(|| Error::not_found("the policy configuration has no id"))?;
    Ok(PolicyState {
        base: PolicyBase {
            id: id.to_string(),
            project_id: project_id.to_string(),
            enabled: config.is_enabled,
            blocking: config.is_blocking,
        },
        body: E::flatten(&config.settings)?,
    })
}

/// Resource managing one policy type through its envelope `E`.
pub struct PolicyResource<E> {
    policy: Arc<dyn PolicyClient>,
    core: Arc<dyn CoreClient>,
    envelope: PhantomData<fn() -> E>,
}

impl<E: Envelope> PolicyResource<E> {
    pub fn new(clients: &Clients) -> Self {
        Self {
            policy: clients.policy.clone(),
            core: clients.core.clone(),
            envelope: PhantomData,
        }
    }

    pub fn boxed(clients: &Clients) -> BoxedResource {
        ResourceWrapper::boxed(Self::new(clients))
    }
}

impl<E: Envelope> Resource for PolicyResource<E> {
    type Model = PolicyState<E>;

    fn resource_type(&self) -> &'static str {
        E::policy_type().resource_type()
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::new()
            .description(E::policy_type().description())
            .attribute("id", Attribute::computed(AttributeType::String))
            .attribute(
                "project_id",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .description("The ID of the project in which the policy will be created."),
            );
        if E::forced_flags().is_none() {
            schema = schema
                .attribute(
                    "enabled",
                    Attribute::optional(AttributeType::Bool)
                        .default_value(true)
                        .description("Enable or disable the policy."),
                )
                .attribute(
                    "blocking",
                    Attribute::optional(AttributeType::Bool)
                        .default_value(true)
                        .description("A flag indicating if the policy should be blocking."),
                );
        }
        E::schema(schema)
    }

    fn identity_fields(&self) -> Vec<IdentityField> {
        vec![
            IdentityField::new("project_id", "project_id").described("Project id or name"),
            IdentityField::new("id", "id").described("Policy configuration id"),
        ]
    }

    fn timeouts(&self) -> ResourceTimeout {
        ResourceTimeout {
            create: Duration::from_secs(5 * 60),
            read: Duration::from_secs(2 * 60),
            update: Duration::from_secs(5 * 60),
            delete: Duration::from_secs(5 * 60),
        }
    }

    fn create(&self, ctx: &Context, plan: &Self::Model) -> Result<Option<Self::Model>> {
        let (config, project_id) = expand(plan)?;
        let created = self
            .policy
            .create_policy_configuration(ctx, &project_id, &config)
            .map_err(|e| Error::from(e).context("creating policy in Azure DevOps"))?;
        debug!(
            "{}: created policy configuration {:?} in project {project_id}",
            self.resource_type(),
            created.id
        );
        flatten(&created, &project_id).map(Some)
    }

    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Self::Model> {
        let project_id = &state.base.project_id;
        let id = parse_policy_id(&state.base.id, "converting policy ID to an integer")?;
        let config = self
            .policy
            .get_policy_configuration(ctx, project_id, id)
            .map_err(|e| {
                Error::from(e).context(format!(
                    "looking up build policy configuration with ID ({id}) and project ID ({project_id})"
                ))
            })?;
        if config.is_deleted {
            return Err(Error::not_found(format!("policy configuration {id} is deleted")));
        }
        flatten(&config, project_id)
    }

    fn update(&self, ctx: &Context, plan: &Self::Model, prior: &Self::Model) -> Result<Option<Self::Model>> {
        let mut plan = plan.clone();
        plan.base.id = prior.base.id.clone();
        let (config, project_id) = expand(&plan)?;
        let id = parse_policy_id(&plan.base.id, "parsing policy configuration ID")?;
        let updated = self
            .policy
            .update_policy_configuration(ctx, &project_id, id, &config)
            .map_err(|e| Error::from(e).context("updating policy in Azure DevOps"))?;
        debug!(
            "{}: updated policy configuration {id} to revision {:?}",
            self.resource_type(),
            updated.revision
        );
        flatten(&updated, &project_id).map(Some)
    }

    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()> {
        let (_, project_id) = expand(state)?;
        let id = parse_policy_id(&state.base.id, "parsing policy configuration ID")?;
        self.policy
            .delete_policy_configuration(ctx, &project_id, id)
            .map_err(|e| Error::from(e).context("deleting policy in Azure DevOps"))
    }

    /// Resolve a project name to its id and check the policy id is numeric.
    fn resolve_import(&self, ctx: &Context, mut state: Map<String, Value>) -> Result<Map<String, Value>> {
        let id = state.get("id").and_then(Value::as_str).unwrap_or_default();
        parse_policy_id(id, "converting policy ID to an integer")?;

        let project = state
            .get("project_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if Uuid::parse_str(&project).is_err() {
            let resolved = self
                .core
                .get_project(ctx, &project, false)
                .map_err(|e| Error::from(e).context(format!("getting the project {project}")))?;
            let project_id = resolved
                .id
                .ok_or_else(|| Error::internal(format!("project {project} has no id")))?;
            state.insert("project_id".to_string(), Value::String(project_id.to_string()));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::branch::{BranchPolicy, BranchScope, BranchSettings};
    use crate::policy::settings::BuildValidationSettings;
    use crate::testutil::FakeDevOps;
    use azdo_api::models::project::TeamProject;
    use declarative::{
        CreateRequest, DeleteRequest, ImportRequest, ManagedResource, ReadRequest, UpdateRequest,
    };
    use serde_json::json;

    type BuildValidation = PolicyResource<BranchPolicy<BuildValidationSettings>>;

    fn wrapper(fake: &Arc<FakeDevOps>) -> ResourceWrapper<BuildValidation> {
        ResourceWrapper::new(BuildValidation::new(&Clients::from_backend(fake.clone())))
    }

    fn plan() -> serde_json::Value {
        json!({
            "project_id": "00000000-0000-0000-0000-000000000001",
            "enabled": true,
            "blocking": false,
            "settings": [{
                "build_definition_id": 12,
                "display_name": "ci",
                "valid_duration": 720,
                "queue_on_source_update_only": true,
                "scope": [{"repository_id": "repo", "repository_ref": "refs/heads/main", "match_type": "Exact"}]
            }]
        })
    }

    #[test]
    fn test_flatten_expand_round_trip_is_bit_exact() {
        let settings = json!({
            "scope": [{"repositoryId": "test-repo-id", "refName": "test-ref-name", "matchKind": "test-match-kind"}],
            "buildDefinitionId": 77,
            "displayName": "test policy",
            "manualQueueOnly": true,
            "queueOnSourceUpdateOnly": true,
            "validDuration": 700,
            "filenamePatterns": ["*md"]
        });
        let input = PolicyConfiguration {
            id: Some(42),
            is_enabled: true,
            is_blocking: true,
            is_deleted: false,
            policy_type: PolicyTypeRef {
                id: PolicyType::BuildValidation.id(),
                display_name: None,
            },
            settings: serde_json::from_value(settings).unwrap(),
            revision: None,
        };

        let state: PolicyState<BranchPolicy<BuildValidationSettings>> = flatten(&input, "p").unwrap();
        assert_eq!(state.base.id, "42");
        assert_eq!(state.body.settings[0].settings.build_definition_id, 77);
        let (expanded, project) = expand(&state).unwrap();
        assert_eq!(project, "p");
        assert_eq!(expanded, input);
    }

    #[test]
    fn test_expand_without_id_and_with_bad_id() {
        let mut state = PolicyState::<BranchPolicy<BuildValidationSettings>> {
            body: BranchPolicy {
                settings: vec![BranchSettings {
                    scope: vec![BranchScope::default()],
                    settings: BuildValidationSettings::default(),
                }],
            },
            ..PolicyState::default()
        };
        let (config, _) = expand(&state).unwrap();
        assert_eq!(config.id, None);
        assert!(config.is_enabled && config.is_blocking);

        state.base.id = "abc".to_string();
        let err = expand(&state).unwrap_err();
        assert!(err.to_string().starts_with("parsing policy configuration ID: ("));
    }

    #[test]
    fn test_create_read_update_delete() {
        let fake = FakeDevOps::new();
        let wrapper = wrapper(&fake);

        let created = wrapper.create(CreateRequest {
            plan: plan(),
            ..CreateRequest::default()
        });
        assert!(!created.diagnostics.has_error(), "{:?}", created.diagnostics);
        let state = created.state.unwrap();
        assert_eq!(state["id"], "1");
        assert_eq!(state["blocking"], false);
        let stored = fake.policy(1).unwrap();
        assert_eq!(stored.policy_type.id, PolicyType::BuildValidation.id());
        assert_eq!(stored.settings["buildDefinitionId"], 12);
        assert_eq!(stored.settings["scope"][0]["refName"], "refs/heads/main");

        let mut changed = plan();
        changed["settings"][0]["display_name"] = json!("nightly");
        changed["id"] = json!("999");
        let updated = wrapper.update(UpdateRequest {
            plan: changed,
            prior_state: state.clone(),
            ..UpdateRequest::default()
        });
        assert!(!updated.diagnostics.has_error(), "{:?}", updated.diagnostics);
        assert_eq!(updated.state.unwrap()["id"], "1");
        assert_eq!(fake.policy(1).unwrap().settings["displayName"], "nightly");
        assert_eq!(fake.policy(1).unwrap().revision, Some(2));

        let deleted = wrapper.delete(DeleteRequest {
            state,
            ..DeleteRequest::default()
        });
        assert!(!deleted.diagnostics.has_error());
        assert!(fake.policy(1).is_none());
    }

    #[test]
    fn test_read_drops_deleted_and_missing_policies() {
        let fake = FakeDevOps::new();
        let wrapper = wrapper(&fake);
        let created = wrapper.create(CreateRequest {
            plan: plan(),
            ..CreateRequest::default()
        });
        let state = created.state.unwrap();

        fake.state().policies.get_mut(&1).unwrap().is_deleted = true;
        let read = wrapper.read(ReadRequest {
            state: state.clone(),
            ..ReadRequest::default()
        });
        assert!(read.state.is_none());
        assert!(!read.diagnostics.has_error());

        fake.state().policies.clear();
        let read = wrapper.read(ReadRequest {
            state,
            ..ReadRequest::default()
        });
        assert!(read.state.is_none());
    }

    #[test]
    fn test_create_failure_is_prefixed() {
        let fake = FakeDevOps::new();
        fake.fail_once("create_policy_configuration", 400);
        let response = wrapper(&fake).create(CreateRequest {
            plan: plan(),
            ..CreateRequest::default()
        });
        assert!(response.state.is_none());
        let diagnostic = response.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.summary, "creating policy in Azure DevOps");
    }

    #[test]
    fn test_import_resolves_project_name() {
        let fake = FakeDevOps::new();
        let project_id = Uuid::from_u128(7);
        fake.add_project(TeamProject {
            id: Some(project_id),
            name: "Fabrikam".to_string(),
            ..TeamProject::default()
        });
        let wrapper = wrapper(&fake);

        let response = wrapper.import_state(ImportRequest {
            id: Some("Fabrikam/12".to_string()),
            ..ImportRequest::default()
        });
        let state = response.state.unwrap();
        assert_eq!(state["project_id"], project_id.to_string());
        assert_eq!(state["id"], "12");

        let response = wrapper.import_state(ImportRequest {
            id: Some(format!("{project_id}/12")),
            ..ImportRequest::default()
        });
        assert!(response.state.is_some());
        assert_eq!(fake.calls("get_project"), 1);

        let response = wrapper.import_state(ImportRequest {
            id: Some("Fabrikam/twelve".to_string()),
            ..ImportRequest::default()
        });
        assert!(response.state.is_none());
        assert!(response.diagnostics.has_error());
    }

    #[test]
    fn test_schema_and_timeouts() {
        let fake = FakeDevOps::new();
        let resource = BuildValidation::new(&Clients::from_backend(fake));
        let schema = resource.schema();
        assert!(schema.get("project_id").unwrap().force_new);
        assert_eq!(schema.get("enabled").unwrap().default, Some(json!(true)));
        assert!(schema.get("settings").is_some());
        assert_eq!(resource.timeouts().read, Duration::from_secs(120));
    }
}
