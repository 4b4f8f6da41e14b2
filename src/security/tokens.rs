//! ACL token construction.
//!
//! Tokens are exact strings on the wire. Most are pure functions of the
//! resource identifiers; classification nodes, query folders and git
//! branches need lookups to turn names into ids.

use super::SecurityNamespace;
use crate::converter::encode_utf16_hex;
use azdo_api::models::git::GitRef;
use azdo_api::models::wit::TreeStructureGroup;
use azdo_api::{GitClient, WorkItemTrackingClient};
use declarative::{Context, Error, Result, ResultExt};
use log::debug;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const CLASSIFICATION_NODE_PREFIX: &str = "vstfs:///Classification/Node/";

const SHARED_QUERIES: &str = "Shared Queries";

pub fn project_token(project_id: &str) -> String {
    format!("$PROJECT:vstfs:///Classification/TeamProject/{project_id}")
}

pub fn library_token(project_id: &str) -> String {
    format!("Library/{project_id}")
}

pub fn variable_group_token(project_id: &str, variable_group_id: &str) -> String {
    format!("Library/{project_id}/VariableGroup/{variable_group_id}")
}

pub fn secure_file_token(project_id: &str, secure_file_id: &str) -> String {
    format!("Library/{project_id}/SecureFile/{secure_file_id}")
}

pub fn service_endpoint_token(project_id: &str, endpoint_id: Option<&str>) -> String {
    match endpoint_id {
        Some(id) => format!("endpoints/{project_id}/{id}"),
        None => format!("endpoints/{project_id}"),
    }
}

pub fn process_token(parent_process_id: &str, process_id: &str) -> String {
    format!("$PROCESS:{parent_process_id}:{process_id}:")
}

/// Build folder path with `/` separators and no leading slash; empty for the root.
pub fn build_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

pub fn build_folder_token(project_id: &str, path: &str) -> String {
    match build_path(path).as_str() {
        "" => project_id.to_string(),
        folder => format!("{project_id}/{folder}"),
    }
}

pub fn build_definition_token(project_id: &str, definition_id: i64, path: Option<&str>) -> String {
    match build_path(path.unwrap_or_default()).as_str() {
        "" => format!("{project_id}/{definition_id}"),
        folder => format!("{project_id}/{folder}/{definition_id}"),
    }
}

/// Token for every repository of a project, or for one repository.
pub fn git_repository_token(project_id: &str, repository_id: Option<&str>) -> String {
    match repository_id {
        Some(repo) => format!("repoV2/{project_id}/{repo}"),
        None => format!("repoV2/{project_id}"),
    }
}

/// Token for a project, repository or branch.
///
/// The branch is looked up in the repository; its last name segment is
/// encoded as little-endian UTF-16 hex.
pub fn git_token(
    ctx: &Context,
    git: &dyn GitClient,
    project_id: &str,
    repository_id: Option<&str>,
    branch_name: Option<&str>,
) -> Result<String> {
    let mut token = git_repository_token(project_id, repository_id);
    let Some(branch_name) = branch_name else {
        return Ok(token);
    };
    let Some(repository_id) = repository_id else {
        return Err(Error::attribute(
            "branch_name",
            format!("Unable to create ACL token for branch {branch_name}, because no repository is specified"),
        ));
    };

    let branch = find_branch(ctx, git, repository_id, branch_name)?;
    let last = branch.name.rsplit('/').next().unwrap_or_default();
    token.push_str("/refs/heads/");
    token.push_str(&encode_utf16_hex(last));
    Ok(token)
}

/// The ref of `branch_name` (short or `refs/heads/` form) in a repository.
pub fn find_branch(ctx: &Context, git: &dyn GitClient, repository_id: &str, branch_name: &str) -> Result<GitRef> {
    let short = branch_name.strip_prefix("refs/heads/").unwrap_or(branch_name);
    let refs = git
        .get_refs(ctx, repository_id, &format!("heads/{short}"))
        .context("Get git refs")?;
    refs.into_iter()
        .find(|r| r.name.ends_with(short))
        .ok_or_else(|| {
            Error::not_found(format!(
                "No branch found with name [{branch_name}] in repository with id [{repository_id}]"
            ))
        })
}

/// Token of a classification node: the root node followed by one
/// segment per element of `path`.
pub fn classification_token(
    ctx: &Context,
    wit: &dyn WorkItemTrackingClient,
    project_id: &str,
    group: TreeStructureGroup,
    path: Option<&str>,
) -> Result<String> {
    let kind = match group {
        TreeStructureGroup::Areas => "area",
        TreeStructureGroup::Iterations => "Iteration",
    };
    let root = wit
        .get_classification_node(ctx, project_id, group, "", 1)
        .context(format!("Error getting {kind}"))?;
    let root_id = root
        .identifier
        .ok_or_else(|| Error::internal(format!("root {kind} of project {project_id} has no identifier")))?;
    let mut token = format!("{CLASSIFICATION_NODE_PREFIX}{root_id}");

    let elements: Vec<&str> = path
        .map(str::trim)
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if elements.is_empty() {
        return Ok(token);
    }
    if !root.has_children.unwrap_or(false) {
        return Err(Error::attribute(
            "path",
            format!("A path was specified but the root {kind} has no children"),
        ));
    }

    for i in 0..elements.len() {
        let prefix = elements[..=i].join("/");
        let node = wit
            .get_classification_node(ctx, project_id, group, &prefix, 1)
            .context(format!("Failed to get ID for {kind} {prefix}"))?;
        let id = node
            .identifier
            .ok_or_else(|| Error::internal(format!("{kind} {prefix} has no identifier")))?;
        token.push(':');
        token.push_str(CLASSIFICATION_NODE_PREFIX);
        token.push_str(&id.to_string());
    }
    debug!("Discovered {kind} token {token}");
    Ok(token)
}

/// Token of the project, or of a query folder below `Shared Queries`.
pub fn work_item_query_token(
    ctx: &Context,
    wit: &dyn WorkItemTrackingClient,
    project_id: &str,
    path: Option<&str>,
) -> Result<String> {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(project_token(project_id)),
        Some(path) => {
            let ids = query_ids_from_path(ctx, wit, project_id, path)?;
            Ok(format!("$/{project_id}/{}", ids.join("/")))
        }
    }
}

/// Ids of `Shared Queries` and of every folder along `path` below it.
///
/// Segments match a child by id or by case-insensitive name.
pub fn query_ids_from_path(
    ctx: &Context,
    wit: &dyn WorkItemTrackingClient,
    project_id: &str,
    path: &str,
) -> Result<Vec<String>> {
    let mut folder = wit
        .get_query(ctx, project_id, SHARED_QUERIES, 1)
        .context("Get shared queries folder")?;
    let mut ids = vec![item_id(folder.id)?];

    for segment in path.trim().split('/').filter(|s| !s.is_empty()) {
        let folder_name = if folder.name.is_empty() {
            item_id(folder.id)?
        } else {
            folder.name.clone()
        };
        let children = folder.children.as_deref().unwrap_or_default();
        if children.is_empty() {
            return Err(Error::attribute(
                "path",
                format!("Unable to find query [{segment}] in folder [{folder_name}] because it has no children"),
            ));
        }

        let wanted = Uuid::parse_str(segment).ok();
        let child = children
            .iter()
            .rev()
            .find(|child| (wanted.is_some() && child.id == wanted) || child.name.eq_ignore_ascii_case(segment))
            .ok_or_else(|| {
                Error::attribute(
                    "path",
                    format!("Unable to find query [{segment}] in folder [{folder_name}]"),
                )
            })?;
        let child_id = item_id(child.id)?;

        folder = wit
            .get_query(ctx, project_id, &child_id, 1)
            .context(format!("Get query {child_id}"))?;
        ids.push(item_id(folder.id)?);
    }
    Ok(ids)
}

fn item_id(id: Option<Uuid>) -> Result<String> {
    id.map(|id| id.to_string())
        .ok_or_else(|| Error::internal("query hierarchy item has no id"))
}

// ==================== Namespace templates ====================

/// Identifiers a namespace token is built from, and how.
#[derive(Debug, Clone, Copy)]
pub struct TokenTemplate {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    build: fn(&BTreeMap<String, String>) -> String,
}

impl TokenTemplate {
    const fn new(
        required: &'static [&'static str],
        optional: &'static [&'static str],
        build: fn(&BTreeMap<String, String>) -> String,
    ) -> Self {
        Self {
            required,
            optional,
            build,
        }
    }

    /// Build the token after checking that every required identifier is present.
    pub fn build(&self, identifiers: &BTreeMap<String, String>) -> Result<String> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|key| !identifiers.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::attribute(
                "identifiers",
                format!("missing required identifiers: {}", missing.join(", ")),
            ));
        }
        Ok((self.build)(identifiers))
    }
}

fn id<'a>(identifiers: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    identifiers.get(key).map(String::as_str).unwrap_or_default()
}

fn git_template(ids: &BTreeMap<String, String>) -> String {
    let project = id(ids, "project_id");
    let Some(repo) = ids.get("repository_id") else {
        return format!("repoV2/{project}");
    };
    let Some(ref_name) = ids.get("ref_name") else {
        return format!("repoV2/{project}/{repo}");
    };
    let encoded: Vec<String> = ref_name
        .split('/')
        .enumerate()
        .map(|(i, segment)| if i < 2 { segment.to_string() } else { encode_utf16_hex(segment) })
        .collect();
    format!("repoV2/{project}/{repo}/{}/", encoded.join("/"))
}

fn build_template(ids: &BTreeMap<String, String>) -> String {
    let project = id(ids, "project_id");
    let Some(definition) = ids.get("build_definition_id") else {
        return project.to_string();
    };
    match ids.get("path").map(String::as_str) {
        Some(path) if !path.is_empty() && path != "\\" => {
            let folder = path.replace('\\', "/");
            format!("{project}/{}/{definition}", folder.trim_matches('/'))
        }
        _ => format!("{project}/{definition}"),
    }
}

fn node_template(ids: &BTreeMap<String, String>) -> String {
    ids.get("node_id")
        .map(|node| format!("{CLASSIFICATION_NODE_PREFIX}{node}"))
        .unwrap_or_default()
}

/// Token template of a namespace, if one is known.
pub fn token_template(namespace_id: Uuid) -> Option<TokenTemplate> {
    use SecurityNamespace as Ns;

    let template = match Ns::from_id(namespace_id)? {
        Ns::GitRepositories => TokenTemplate::new(&["project_id"], &["repository_id", "ref_name"], git_template),
        Ns::Project => TokenTemplate::new(&["project_id"], &[], |ids| project_token(id(ids, "project_id"))),
        Ns::Build => TokenTemplate::new(&["project_id"], &["path", "build_definition_id"], build_template),
        Ns::ServiceEndpoints => TokenTemplate::new(&["project_id"], &["serviceendpoint_id"], |ids| {
            service_endpoint_token(id(ids, "project_id"), ids.get("serviceendpoint_id").map(String::as_str))
        }),
        Ns::Css | Ns::Iteration => TokenTemplate::new(&[], &["node_id"], node_template),
        Ns::Tagging => TokenTemplate::new(&[], &["project_id"], |ids| {
            ids.get("project_id").map(|p| format!("/{p}")).unwrap_or_default()
        }),
        Ns::ServiceHooks => TokenTemplate::new(&[], &["project_id"], |ids| match ids.get("project_id") {
            Some(p) => format!("PublisherSecurity/{p}"),
            None => "PublisherSecurity".to_string(),
        }),
        Ns::WorkItemQueryFolders => TokenTemplate::new(&["project_id"], &["query_id"], |ids| {
            match ids.get("query_id") {
                Some(q) => format!("$/{}/{q}", id(ids, "project_id")),
                None => format!("$/{}", id(ids, "project_id")),
            }
        }),
        Ns::Analytics => TokenTemplate::new(&["project_id"], &[], |ids| format!("$/{}", id(ids, "project_id"))),
        Ns::AnalyticsViews => {
            TokenTemplate::new(&["project_id"], &[], |ids| format!("$/Shared/{}", id(ids, "project_id")))
        }
        Ns::Collection => TokenTemplate::new(&[], &[], |_| "NAMESPACE:".to_string()),
        Ns::Process => TokenTemplate::new(&[], &[], |_| "$PROCESS:".to_string()),
        Ns::AuditLog => TokenTemplate::new(&[], &[], |_| "AllPermissions".to_string()),
        Ns::BuildAdministration => TokenTemplate::new(&[], &[], |_| "BuildPrivileges".to_string()),
        Ns::Server => TokenTemplate::new(&[], &[], |_| "FrameworkGlobalSecurity".to_string()),
        Ns::VersionControlPrivileges => TokenTemplate::new(&[], &[], |_| "Global".to_string()),
        Ns::DistributedTask | Ns::Library => return None,
    };
    Some(template)
}

/// Token of `namespace_id` built from an identifier map.
///
/// Namespaces without a template fall back to `$/<project_id>`.
pub fn namespace_token(namespace_id: Uuid, identifiers: &BTreeMap<String, String>) -> Result<String> {
    match token_template(namespace_id) {
        Some(template) => template.build(identifiers),
        None => match identifiers.get("project_id") {
            Some(project) => Ok(format!("$/{project}")),
            None => Err(Error::input(format!(
                "unable to generate token for namespace {namespace_id} with provided identifiers. \
                 Please check documentation for required identifiers"
            ))),
        },
    }
}
