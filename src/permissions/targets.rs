//! Secured objects addressable by a permission resource.

use super::driver::PermissionTarget;
use crate::client::Clients;
use crate::converter::parse_uuid;
use crate::security::SecurityNamespace;
use crate::security::tokens::{
    build_definition_token, build_folder_token, classification_token, git_token, library_token, process_token,
    project_token, secure_file_token, service_endpoint_token, variable_group_token, work_item_query_token,
};
use azdo_api::models::wit::TreeStructureGroup;
use declarative::{Attribute, AttributeType, Context, Error, Result, ResultExt, Schema};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PROJECT_TOKEN_PREFIX: &str = "$PROJECT:vstfs:///Classification/TeamProject/";

fn project_id(schema: Schema) -> Schema {
    schema.attribute(
        "project_id",
        Attribute::required(AttributeType::String)
            .force_new()
            .description("The ID of the project to assign the permissions."),
    )
}

fn optional_id(description: &str) -> Attribute {
    Attribute::optional(AttributeType::String)
        .force_new()
        .description(description.to_string())
}

fn required_id(description: &str) -> Attribute {
    Attribute::required(AttributeType::String)
        .force_new()
        .description(description.to_string())
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

fn segments(token: &str) -> Vec<&str> {
    token.split('/').collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectTarget {
    pub project_id: String,
}

impl PermissionTarget for ProjectTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_project_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for a project.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema)
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::Project.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(project_token(&self.project_id))
    }

    fn from_token(token: &str) -> Option<Self> {
        let project_id = token.strip_prefix(PROJECT_TOKEN_PREFIX).and_then(non_empty)?;
        Some(Self {
            project_id: project_id.to_string(),
        })
    }
}

/// A project's repositories, one repository, or one branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitTarget {
    pub project_id: String,
    pub repository_id: Option<String>,
    pub branch_name: Option<String>,
}

impl PermissionTarget for GitTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_git_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for Git repositories.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema)
            .attribute("repository_id", optional_id("The ID of the repository."))
            .attribute(
                "branch_name",
                optional_id("The name of the branch. Requires repository_id."),
            )
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::GitRepositories.id())
    }

    fn token(&self, ctx: &Context, clients: &Clients) -> Result<String> {
        git_token(
            ctx,
            clients.git.as_ref(),
            &self.project_id,
            self.repository_id.as_deref().and_then(non_empty),
            self.branch_name.as_deref().and_then(non_empty),
        )
    }

    /// Project and repository tokens only; branch names are hex encoded
    /// and cannot be turned back into a `refs/heads/` lookup reliably.
    fn from_token(token: &str) -> Option<Self> {
        match segments(token).as_slice() {
            ["repoV2", project] if !project.is_empty() => Some(Self {
                project_id: project.to_string(),
                ..Self::default()
            }),
            ["repoV2", project, repository] if !project.is_empty() && !repository.is_empty() => Some(Self {
                project_id: project.to_string(),
                repository_id: Some(repository.to_string()),
                branch_name: None,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildDefinitionTarget {
    pub project_id: String,
    pub build_definition_id: String,
}

impl PermissionTarget for BuildDefinitionTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_build_definition_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for a build definition.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute(
            "build_definition_id",
            required_id("The ID of the build definition."),
        )
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::Build.id())
    }

    /// The token embeds the definition's folder, which is read from the service.
    fn token(&self, ctx: &Context, clients: &Clients) -> Result<String> {
        let definition_id: i64 = self.build_definition_id.parse().map_err(|_| {
            Error::attribute(
                "build_definition_id",
                format!("build definition id {:?} is not an integer", self.build_definition_id),
            )
        })?;
        let definition = clients
            .build
            .get_definition(ctx, &self.project_id, definition_id)
            .context(format!("Get build definition {definition_id}"))?;
        Ok(build_definition_token(
            &self.project_id,
            definition.id,
            definition.path.as_deref(),
        ))
    }

    fn from_token(token: &str) -> Option<Self> {
        let parts = segments(token);
        match (parts.first(), parts.last()) {
            (Some(project), Some(id)) if parts.len() >= 2 && id.parse::<i64>().is_ok() => Some(Self {
                project_id: project.to_string(),
                build_definition_id: id.to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFolderTarget {
    pub project_id: String,
    pub path: String,
}

impl PermissionTarget for BuildFolderTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_build_folder_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for a build folder.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute(
            "path",
            Attribute::required(AttributeType::String)
                .force_new()
                .description("The folder path, `\\` for the root folder."),
        )
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::Build.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(build_folder_token(&self.project_id, &self.path))
    }

    fn from_token(token: &str) -> Option<Self> {
        let (project, folder) = token.split_once('/').unwrap_or((token, ""));
        non_empty(project)?;
        Some(Self {
            project_id: project.to_string(),
            path: format!("\\{}", folder.replace('/', "\\")),
        })
    }
}

/// Area or iteration node, addressed by path below the root node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTarget<const ITERATION: bool> {
    // Field-level defaults: serde's derive rejects container-level
    // `#[serde(default)]` on const-generic types. Equivalent since `Default` is derived.
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub path: Option<String>,
}

pub type AreaTarget = ClassificationTarget<false>;
pub type IterationTarget = ClassificationTarget<true>;

impl<const ITERATION: bool> ClassificationTarget<ITERATION> {
    const fn group() -> TreeStructureGroup {
        if ITERATION {
            TreeStructureGroup::Iterations
        } else {
            TreeStructureGroup::Areas
        }
    }
}

impl<const ITERATION: bool> PermissionTarget for ClassificationTarget<ITERATION> {
    const RESOURCE_TYPE: &'static str = if ITERATION {
        "azuredevops_iteration_permissions"
    } else {
        "azuredevops_area_permissions"
    };
    const DESCRIPTION: &'static str = if ITERATION {
        "Manages permissions for an iteration node."
    } else {
        "Manages permissions for an area node."
    };

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute(
            "path",
            optional_id("Path of the node below the root node. Empty for the root node."),
        )
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(if ITERATION {
            SecurityNamespace::Iteration.id()
        } else {
            SecurityNamespace::Css.id()
        })
    }

    fn token(&self, ctx: &Context, clients: &Clients) -> Result<String> {
        classification_token(
            ctx,
            clients.work_items.as_ref(),
            &self.project_id,
            Self::group(),
            self.path.as_deref(),
        )
    }
}

/// The project's queries, or one folder below `Shared Queries`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemQueryTarget {
    pub project_id: String,
    pub path: Option<String>,
}

impl PermissionTarget for WorkItemQueryTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_workitemquery_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for work item queries.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute(
            "path",
            optional_id("Path of the query folder below Shared Queries."),
        )
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::WorkItemQueryFolders.id())
    }

    fn token(&self, ctx: &Context, clients: &Clients) -> Result<String> {
        work_item_query_token(ctx, clients.work_items.as_ref(), &self.project_id, self.path.as_deref())
    }

    fn from_token(token: &str) -> Option<Self> {
        ProjectTarget::from_token(token).map(|project| Self {
            project_id: project.project_id,
            path: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryTarget {
    pub project_id: String,
}

impl PermissionTarget for LibraryTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_library_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for the pipeline library.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema)
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::Library.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(library_token(&self.project_id))
    }

    fn from_token(token: &str) -> Option<Self> {
        match segments(token).as_slice() {
            ["Library", project] if !project.is_empty() => Some(Self {
                project_id: project.to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableGroupTarget {
    pub project_id: String,
    pub variable_group_id: String,
}

impl PermissionTarget for VariableGroupTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_variable_group_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for a variable group.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute("variable_group_id", required_id("The ID of the variable group."))
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::Library.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(variable_group_token(&self.project_id, &self.variable_group_id))
    }

    fn from_token(token: &str) -> Option<Self> {
        match segments(token).as_slice() {
            ["Library", project, "VariableGroup", id] if !project.is_empty() && !id.is_empty() => Some(Self {
                project_id: project.to_string(),
                variable_group_id: id.to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecureFileTarget {
    pub project_id: String,
    pub secure_file_id: String,
}

impl PermissionTarget for SecureFileTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_securefile_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for a secure file.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute("secure_file_id", required_id("The ID of the secure file."))
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::DistributedTask.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(secure_file_token(&self.project_id, &self.secure_file_id))
    }

    fn from_token(token: &str) -> Option<Self> {
        match segments(token).as_slice() {
            ["Library", project, "SecureFile", id] if !project.is_empty() && !id.is_empty() => Some(Self {
                project_id: project.to_string(),
                secure_file_id: id.to_string(),
            }),
            _ => None,
        }
    }
}

/// All service endpoints of a project, or one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpointTarget {
    pub project_id: String,
    pub serviceendpoint_id: Option<String>,
}

impl PermissionTarget for ServiceEndpointTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_serviceendpoint_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for service endpoints.";

    fn schema(schema: Schema) -> Schema {
        project_id(schema).attribute(
            "serviceendpoint_id",
            optional_id("The ID of the service endpoint. Empty for every endpoint."),
        )
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::ServiceEndpoints.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(service_endpoint_token(
            &self.project_id,
            self.serviceendpoint_id.as_deref().and_then(non_empty),
        ))
    }

    fn from_token(token: &str) -> Option<Self> {
        match segments(token).as_slice() {
            ["endpoints", project] if !project.is_empty() => Some(Self {
                project_id: project.to_string(),
                serviceendpoint_id: None,
            }),
            ["endpoints", project, id] if !project.is_empty() && !id.is_empty() => Some(Self {
                project_id: project.to_string(),
                serviceendpoint_id: Some(id.to_string()),
            }),
            _ => None,
        }
    }
}

/// An inherited process below its parent system process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessTarget {
    pub parent_process_id: String,
    pub process_id: String,
}

impl PermissionTarget for ProcessTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_process_permissions";
    const DESCRIPTION: &'static str = "Manages permissions for an inherited process.";

    fn schema(schema: Schema) -> Schema {
        schema
            .attribute(
                "parent_process_id",
                required_id("The ID of the system process the process inherits from."),
            )
            .attribute("process_id", required_id("The ID of the inherited process."))
    }

    fn namespace_id(&self) -> Result<Uuid> {
        Ok(SecurityNamespace::Process.id())
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        Ok(process_token(&self.parent_process_id, &self.process_id))
    }

    fn from_token(token: &str) -> Option<Self> {
        let rest = token.strip_prefix("$PROCESS:")?.strip_suffix(':')?;
        let (parent, process) = rest.split_once(':')?;
        (!parent.is_empty() && !process.is_empty() && !process.contains(':')).then(|| Self {
            parent_process_id: parent.to_string(),
            process_id: process.to_string(),
        })
    }
}

/// Any namespace and token, for objects without a dedicated resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityTarget {
    pub namespace_id: String,
    pub token: String,
}

impl PermissionTarget for SecurityTarget {
    const RESOURCE_TYPE: &'static str = "azuredevops_security_permissions";
    const DESCRIPTION: &'static str = "Manages permissions on any token of any security namespace.";

    fn schema(schema: Schema) -> Schema {
        schema
            .attribute("namespace_id", required_id("The ID of the security namespace."))
            .attribute("token", required_id("The security token within the namespace."))
    }

    fn namespace_id(&self) -> Result<Uuid> {
        parse_uuid("namespace_id", &self.namespace_id)
    }

    fn token(&self, _ctx: &Context, _clients: &Clients) -> Result<String> {
        non_empty(&self.token)
            .map(str::to_string)
            .ok_or_else(|| Error::attribute("token", "token must not be empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDevOps;
    use std::time::Duration;

    const PROJECT: &str = "9083e944-8e9e-405e-960a-c80180aa71e6";

    fn clients() -> (std::sync::Arc<FakeDevOps>, Clients) {
        let fake = FakeDevOps::new();
        let clients = Clients::from_backend(fake.clone());
        (fake, clients)
    }

    fn ctx() -> Context {
        Context::background(Duration::from_secs(5))
    }

    #[test]
    fn test_build_definition_token_reads_definition_path() {
        let (fake, clients) = clients();
        fake.add_definition(5, "\\a\\b\\c");
        fake.add_definition(6, "\\");

        let nested = BuildDefinitionTarget {
            project_id: PROJECT.to_string(),
            build_definition_id: "5".to_string(),
        };
        assert_eq!(nested.token(&ctx(), &clients).unwrap(), format!("{PROJECT}/a/b/c/5"));

        let root = BuildDefinitionTarget {
            build_definition_id: "6".to_string(),
            ..nested.clone()
        };
        assert_eq!(root.token(&ctx(), &clients).unwrap(), format!("{PROJECT}/6"));

        let bad = BuildDefinitionTarget {
            build_definition_id: "five".to_string(),
            ..nested
        };
        assert!(bad.token(&ctx(), &clients).is_err());
        assert_eq!(fake.calls("get_definition"), 2);
    }

    #[test]
    fn test_git_branch_target_token() {
        let (fake, clients) = clients();
        let project = "00000000-0000-0000-0000-000000000001";
        let repository = "00000000-0000-0000-0000-000000000002";
        fake.add_ref(repository, "refs/heads/main");

        let target = GitTarget {
            project_id: project.to_string(),
            repository_id: Some(repository.to_string()),
            branch_name: Some("refs/heads/main".to_string()),
        };
        assert_eq!(
            target.token(&ctx(), &clients).unwrap(),
            format!("repoV2/{project}/{repository}/refs/heads/6d00610069006e00")
        );

        let empty_branch = GitTarget {
            branch_name: Some(String::new()),
            ..target
        };
        assert_eq!(
            empty_branch.token(&ctx(), &clients).unwrap(),
            format!("repoV2/{project}/{repository}")
        );
    }

    #[test]
    fn test_iteration_target_uses_iteration_namespace() {
        let (fake, clients) = clients();
        let root = Uuid::parse_str("0b401c26-b0da-4655-995a-ab62f0b05187").unwrap();
        let child = Uuid::new_v4();
        fake.add_classification_node(PROJECT, TreeStructureGroup::Iterations, "", root, true);
        fake.add_classification_node(PROJECT, TreeStructureGroup::Iterations, "i1", child, false);

        let target = IterationTarget {
            project_id: PROJECT.to_string(),
            path: Some("/i1".to_string()),
        };
        assert_eq!(target.namespace_id().unwrap(), SecurityNamespace::Iteration.id());
        assert_eq!(
            target.token(&ctx(), &clients).unwrap(),
            format!("vstfs:///Classification/Node/{root}:vstfs:///Classification/Node/{child}")
        );
        assert_eq!(AreaTarget::default().namespace_id().unwrap(), SecurityNamespace::Css.id());
        assert_eq!(AreaTarget::RESOURCE_TYPE, "azuredevops_area_permissions");
    }

    #[test]
    fn test_query_target_without_path_is_project_token() {
        let (_, clients) = clients();
        let target = WorkItemQueryTarget {
            project_id: PROJECT.to_string(),
            path: Some("  ".to_string()),
        };
        assert_eq!(target.token(&ctx(), &clients).unwrap(), project_token(PROJECT));
    }

    #[test]
    fn test_targets_round_trip_through_tokens() {
        let (_, clients) = clients();

        let library = VariableGroupTarget {
            project_id: PROJECT.to_string(),
            variable_group_id: "12".to_string(),
        };
        let token = library.token(&ctx(), &clients).unwrap();
        assert_eq!(VariableGroupTarget::from_token(&token), Some(library));

        let endpoint = ServiceEndpointTarget {
            project_id: PROJECT.to_string(),
            serviceendpoint_id: None,
        };
        let token = endpoint.token(&ctx(), &clients).unwrap();
        assert_eq!(ServiceEndpointTarget::from_token(&token), Some(endpoint));

        let process = ProcessTarget {
            parent_process_id: "adcc42ab-9882-485e-a3ed-7678f01f66bc".to_string(),
            process_id: "8dc8bc43-8b56-4a93-a5e4-c7a0f1b4cfb0".to_string(),
        };
        let token = process.token(&ctx(), &clients).unwrap();
        assert_eq!(ProcessTarget::from_token(&token), Some(process));

        let folder = BuildFolderTarget {
            project_id: PROJECT.to_string(),
            path: "\\a\\b".to_string(),
        };
        let token = folder.token(&ctx(), &clients).unwrap();
        assert_eq!(token, format!("{PROJECT}/a/b"));
        assert_eq!(BuildFolderTarget::from_token(&token), Some(folder));
    }

    #[test]
    fn test_from_token_rejects_foreign_tokens() {
        assert_eq!(ProjectTarget::from_token("repoV2/p"), None);
        assert_eq!(LibraryTarget::from_token("Library/p/VariableGroup/1"), None);
        assert_eq!(SecureFileTarget::from_token("Library/p/VariableGroup/1"), None);
        assert_eq!(BuildDefinitionTarget::from_token("p/folder"), None);
        assert_eq!(ProcessTarget::from_token("$PROCESS:a:"), None);
        assert_eq!(SecurityTarget::from_token("anything"), None);
        assert_eq!(
            GitTarget::from_token("repoV2/p/r"),
            Some(GitTarget {
                project_id: "p".to_string(),
                repository_id: Some("r".to_string()),
                branch_name: None,
            })
        );
    }

    #[test]
    fn test_security_target_requires_valid_namespace() {
        let (_, clients) = clients();
        let target = SecurityTarget {
            namespace_id: "not-a-uuid".to_string(),
            token: "t".to_string(),
        };
        assert!(target.namespace_id().is_err());

        let target = SecurityTarget {
            namespace_id: SecurityNamespace::Tagging.id().to_string(),
            token: String::new(),
        };
        assert_eq!(target.namespace_id().unwrap(), SecurityNamespace::Tagging.id());
        assert!(target.token(&ctx(), &clients).is_err());
    }
}
