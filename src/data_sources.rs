//! Read-only lookups: project attributes and security namespace tokens.

use crate::client::Clients;
use crate::converter::{CaseInsensitiveString, parse_uuid};
use crate::resources::project::{ProjectModel, ProjectResource};
use crate::security::NamespaceCatalog;
use crate::security::tokens::{namespace_token, token_template};
use declarative::{
    Attribute, AttributeType, BoxedDataSource, Context, DataSource, DataSourceWrapper, Error, Resource, Result,
    ResultExt, Schema,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub fn data_sources(clients: &Clients) -> Vec<BoxedDataSource> {
    vec![
        DataSourceWrapper::boxed(ProjectDataSource::new(clients)),
        DataSourceWrapper::boxed(NamespaceTokenDataSource::new(clients)),
    ]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectData {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub id: String,
    pub description: String,
    pub visibility: String,
    pub version_control: String,
    pub work_item_template: String,
    pub process_template_id: String,
}

/// `azuredevops_project` data source: one project by name or id.
pub struct ProjectDataSource {
    project: ProjectResource,
}

impl ProjectDataSource {
    pub fn new(clients: &Clients) -> Self {
        Self {
            project: ProjectResource::new(clients),
        }
    }
}

impl DataSource for ProjectDataSource {
    type Model = ProjectData;

    fn data_source_type(&self) -> &'static str {
        "azuredevops_project"
    }

    fn schema(&self) -> Schema {
        let computed = || Attribute::computed(AttributeType::String);
        Schema::new()
            .description("Use this data source to access information about an existing project.")
            .attribute("project_id", Attribute::optional(AttributeType::String))
            .attribute("name", Attribute::optional(AttributeType::String))
            .attribute("id", computed())
            .attribute("description", computed())
            .attribute("visibility", computed())
            .attribute("version_control", computed())
            .attribute("work_item_template", computed())
            .attribute("process_template_id", computed())
    }

    fn read(&self, ctx: &Context, config: &ProjectData) -> Result<ProjectData> {
        let project_id = config.project_id.as_deref().filter(|id| !id.is_empty());
        let name = config.name.as_deref().filter(|name| !name.is_empty());
        let lookup = match (project_id, name) {
            (Some(id), None) => ProjectModel {
                id: parse_uuid("project_id", id)?.to_string(),
                ..ProjectModel::default()
            },
            (None, Some(name)) => ProjectModel {
                name: CaseInsensitiveString::new(name),
                ..ProjectModel::default()
            },
            _ => return Err(Error::input("Exactly one of project_id or name must be set")),
        };

        let project = self
            .project
            .read(ctx, &lookup)
            .context(format!("Finding project {}", project_id.or(name).unwrap_or_default()))?;
        Ok(ProjectData {
            project_id: config.project_id.clone(),
            name: Some(project.name.to_string()),
            id: project.id,
            description: project.description,
            visibility: project.visibility,
            version_control: project.version_control,
            work_item_template: project.work_item_template,
            process_template_id: project.process_template_id,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceTokenData {
    pub id: String,
    pub namespace_id: Option<String>,
    pub namespace_name: Option<String>,
    pub identifiers: BTreeMap<String, String>,
    pub return_identifier_info: bool,
    pub token: String,
    pub required_identifiers: Vec<String>,
    pub optional_identifiers: Vec<String>,
}

/// `azuredevops_security_namespace_token` data source.
///
/// Builds the token of a namespace from an identifier map, or reports
/// which identifiers the namespace token takes.
pub struct NamespaceTokenDataSource {
    namespaces: Arc<NamespaceCatalog>,
}

impl NamespaceTokenDataSource {
    pub fn new(clients: &Clients) -> Self {
        Self {
            namespaces: clients.namespaces.clone(),
        }
    }

    fn namespace_id(&self, ctx: &Context, config: &NamespaceTokenData) -> Result<Uuid> {
        let id = config.namespace_id.as_deref().filter(|id| !id.is_empty());
        let name = config.namespace_name.as_deref().filter(|name| !name.is_empty());
        match (id, name) {
            (Some(id), None) => parse_uuid("namespace_id", id),
            (None, Some(name)) => self.namespaces.find_by_name(ctx, name),
            _ => Err(Error::input("Exactly one of namespace_id or namespace_name must be set")),
        }
    }
}

impl DataSource for NamespaceTokenDataSource {
    type Model = NamespaceTokenData;

    fn data_source_type(&self) -> &'static str {
        "azuredevops_security_namespace_token"
    }

    fn schema(&self) -> Schema {
        let strings = || AttributeType::List(Box::new(Attribute::optional(AttributeType::String)));
        Schema::new()
            .description("Computes the security token of a namespace from resource identifiers.")
            .attribute("id", Attribute::computed(AttributeType::String))
            .attribute(
                "namespace_id",
                Attribute::optional(AttributeType::String).description("The ID of the security namespace"),
            )
            .attribute(
                "namespace_name",
                Attribute::optional(AttributeType::String)
                    .description("The name of the security namespace (e.g., 'Git Repositories', 'Project')"),
            )
            .attribute(
                "identifiers",
                Attribute::optional(AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Map of identifiers required for token generation (e.g., project_id, repository_id)"),
            )
            .attribute(
                "return_identifier_info",
                Attribute::optional(AttributeType::Bool).default_value(false),
            )
            .attribute("token", Attribute::computed(AttributeType::String))
            .attribute("required_identifiers", Attribute::computed(strings()))
            .attribute("optional_identifiers", Attribute::computed(strings()))
    }

    fn read(&self, ctx: &Context, config: &NamespaceTokenData) -> Result<NamespaceTokenData> {
        let namespace_id = self.namespace_id(ctx, config)?;

        if config.return_identifier_info {
            let template = token_template(namespace_id).ok_or_else(|| {
                Error::input(format!("no template information available for namespace {namespace_id}"))
            })?;
            return Ok(NamespaceTokenData {
                id: format!("ns-info-{namespace_id}"),
                required_identifiers: template.required.iter().map(ToString::to_string).collect(),
                optional_identifiers: template.optional.iter().map(ToString::to_string).collect(),
                ..config.clone()
            });
        }

        let token = namespace_token(namespace_id, &config.identifiers).context("generating token")?;
        Ok(NamespaceTokenData {
            id: format!("ns-token-{namespace_id}-{token}"),
            token,
            ..config.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SecurityNamespace;
    use crate::testutil::{FakeDevOps, action};
    use azdo_api::models::project::TeamProject;
    use declarative::{CancellationToken, ManagedDataSource};
    use serde_json::{Value, json};

    fn read(source: &dyn ManagedDataSource, config: Value) -> declarative::Response {
        source.read(config, CancellationToken::new())
    }

    #[test]
    fn test_project_by_name_and_by_id() {
        let fake = FakeDevOps::new();
        let process = Uuid::new_v4();
        fake.add_process(process, "Basic", true);
        let id = Uuid::new_v4();
        fake.add_project(TeamProject {
            id: Some(id),
            name: "Contoso".to_string(),
            description: Some("web".to_string()),
            visibility: Some("private".to_string()),
            ..TeamProject::default()
        });
        let source = DataSourceWrapper::new(ProjectDataSource::new(&Clients::from_backend(fake)));

        let by_name = read(&source, json!({"name": "contoso"})).state.unwrap();
        assert_eq!(by_name["id"], id.to_string());
        assert_eq!(by_name["name"], "Contoso");
        assert_eq!(by_name["work_item_template"], "Basic");

        let by_id = read(&source, json!({"project_id": id.to_string()})).state.unwrap();
        assert_eq!(by_id["name"], "Contoso");
        assert_eq!(by_id["description"], "web");
    }

    #[test]
    fn test_project_requires_exactly_one_key() {
        let source = DataSourceWrapper::new(ProjectDataSource::new(&Clients::from_backend(FakeDevOps::new())));
        for config in [json!({}), json!({"name": "a", "project_id": Uuid::nil().to_string()})] {
            let response = read(&source, config);
            assert!(response.state.is_none());
            assert!(response.diagnostics.has_error());
        }
    }

    #[test]
    fn test_token_by_namespace_name() {
        let fake = FakeDevOps::new();
        fake.add_namespace(SecurityNamespace::GitRepositories.id(), "Git Repositories", vec![action("Read", 2)]);
        let source = DataSourceWrapper::new(NamespaceTokenDataSource::new(&Clients::from_backend(fake)));

        let state = read(
            &source,
            json!({
                "namespace_name": "Git Repositories",
                "identifiers": {"project_id": "p", "repository_id": "r"}
            }),
        )
        .state
        .unwrap();
        assert_eq!(state["token"], "repoV2/p/r");
        assert_eq!(
            state["id"],
            format!("ns-token-{}-repoV2/p/r", SecurityNamespace::GitRepositories.id())
        );
    }

    #[test]
    fn test_identifier_info() {
        let source = DataSourceWrapper::new(NamespaceTokenDataSource::new(&Clients::from_backend(FakeDevOps::new())));
        let namespace = SecurityNamespace::Build.id();
        let state = read(
            &source,
            json!({"namespace_id": namespace.to_string(), "return_identifier_info": true}),
        )
        .state
        .unwrap();
        assert_eq!(state["id"], format!("ns-info-{namespace}"));
        assert_eq!(state["required_identifiers"], json!(["project_id"]));
        assert_eq!(state["optional_identifiers"], json!(["path", "build_definition_id"]));

        let library = SecurityNamespace::Library.id();
        let response = read(
            &source,
            json!({"namespace_id": library.to_string(), "return_identifier_info": true}),
        );
        let diagnostic = response.diagnostics.iter().next().unwrap();
        assert!(
            format!("{} {}", diagnostic.summary, diagnostic.detail)
                .contains(&format!("no template information available for namespace {library}")),
            "{diagnostic:?}"
        );
    }

    #[test]
    fn test_missing_identifiers_are_reported() {
        let source = DataSourceWrapper::new(NamespaceTokenDataSource::new(&Clients::from_backend(FakeDevOps::new())));
        let response = read(
            &source,
            json!({"namespace_id": SecurityNamespace::Project.id().to_string()}),
        );
        let diagnostic = response.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.summary, "generating token");
        assert!(diagnostic.detail.contains("missing required identifiers: project_id"), "{diagnostic:?}");
    }
}
