//! Client traits, one per REST area.
//!
//! Engines and resources depend on these traits only. [`crate::Connection`]
//! implements all of them over HTTP; tests substitute in-memory fakes.
//! Every call takes the operation [`Context`] so requests honor the
//! deadline and cancellation of the enclosing lifecycle operation.

use crate::error::Result;
use crate::models::JsonPatchOperation;
use crate::models::build::BuildDefinitionReference;
use crate::models::feature::{ContributedFeatureState, ContributedFeatureStateQuery, FeatureEnabledValue};
use crate::models::git::GitRef;
use crate::models::graph::{
    GraphDescriptorResult, GraphGroup, GraphMembership, GraphStorageKeyResult, GroupCreationContext,
};
use crate::models::identity::Identity;
use crate::models::policy::PolicyConfiguration;
use crate::models::project::{Operation, OperationReference, Process, TeamProject};
use crate::models::security::{
    AccessControlEntriesUpdate, AccessControlEntry, AccessControlList, SecurityNamespaceDescription,
};
use crate::models::wit::{QueryHierarchyItem, TreeStructureGroup, WorkItemClassificationNode};
use declarative::Context;
use uuid::Uuid;

/// Projects and processes.
pub trait CoreClient: Send + Sync {
    /// Get a project by id or name.
    fn get_project(&self, ctx: &Context, project: &str, include_capabilities: bool) -> Result<TeamProject>;

    fn list_processes(&self, ctx: &Context) -> Result<Vec<Process>>;

    fn queue_create_project(&self, ctx: &Context, project: &TeamProject) -> Result<OperationReference>;

    fn update_project(&self, ctx: &Context, project_id: Uuid, project: &TeamProject) -> Result<OperationReference>;

    fn queue_delete_project(&self, ctx: &Context, project_id: Uuid) -> Result<OperationReference>;
}

/// Long-running operations.
pub trait OperationsClient: Send + Sync {
    fn get_operation(&self, ctx: &Context, operation_id: Uuid) -> Result<Operation>;
}

/// Groups, memberships and descriptors.
pub trait GraphClient: Send + Sync {
    fn create_group(
        &self,
        ctx: &Context,
        creation: &GroupCreationContext,
        scope_descriptor: Option<&str>,
    ) -> Result<GraphGroup>;

    fn get_group(&self, ctx: &Context, descriptor: &str) -> Result<GraphGroup>;

    fn update_group(&self, ctx: &Context, descriptor: &str, patch: &[JsonPatchOperation]) -> Result<GraphGroup>;

    fn delete_group(&self, ctx: &Context, descriptor: &str) -> Result<()>;

    /// Resolve a storage key (e.g. a project id) to its subject descriptor.
    fn get_descriptor(&self, ctx: &Context, storage_key: Uuid) -> Result<GraphDescriptorResult>;

    fn get_storage_key(&self, ctx: &Context, subject_descriptor: &str) -> Result<GraphStorageKeyResult>;

    fn add_membership(&self, ctx: &Context, subject: &str, container: &str) -> Result<GraphMembership>;

    fn get_membership(&self, ctx: &Context, subject: &str, container: &str) -> Result<GraphMembership>;

    /// Succeeds when the membership exists; not-found otherwise.
    fn check_membership_existence(&self, ctx: &Context, subject: &str, container: &str) -> Result<()>;

    fn remove_membership(&self, ctx: &Context, subject: &str, container: &str) -> Result<()>;
}

/// Identities (subject to identity descriptor resolution).
pub trait IdentityClient: Send + Sync {
    fn read_identities_by_subject(&self, ctx: &Context, subject_descriptors: &[String]) -> Result<Vec<Identity>>;
}

/// Security namespaces and access control lists.
pub trait SecurityClient: Send + Sync {
    fn query_security_namespaces(&self, ctx: &Context, namespace_id: Uuid) -> Result<Vec<SecurityNamespaceDescription>>;

    /// ACLs of `token`, restricted to `descriptors` when not empty.
    fn query_access_control_lists(
        &self,
        ctx: &Context,
        namespace_id: Uuid,
        token: &str,
        descriptors: &[String],
        include_extended_info: bool,
    ) -> Result<Vec<AccessControlList>>;

    fn set_access_control_entries(
        &self,
        ctx: &Context,
        namespace_id: Uuid,
        update: &AccessControlEntriesUpdate,
    ) -> Result<Vec<AccessControlEntry>>;

    fn remove_access_control_entries(
        &self,
        ctx: &Context,
        namespace_id: Uuid,
        token: &str,
        descriptors: &[String],
    ) -> Result<bool>;
}

/// Policy configurations of a project.
pub trait PolicyClient: Send + Sync {
    fn create_policy_configuration(
        &self,
        ctx: &Context,
        project: &str,
        configuration: &PolicyConfiguration,
    ) -> Result<PolicyConfiguration>;

    fn get_policy_configuration(&self, ctx: &Context, project: &str, id: i64) -> Result<PolicyConfiguration>;

    fn update_policy_configuration(
        &self,
        ctx: &Context,
        project: &str,
        id: i64,
        configuration: &PolicyConfiguration,
    ) -> Result<PolicyConfiguration>;

    fn delete_policy_configuration(&self, ctx: &Context, project: &str, id: i64) -> Result<()>;
}

/// Git refs.
pub trait GitClient: Send + Sync {
    /// Refs of a repository whose name starts with `refs/<filter>`.
    fn get_refs(&self, ctx: &Context, repository_id: &str, filter: &str) -> Result<Vec<GitRef>>;
}

/// Build definitions.
pub trait BuildClient: Send + Sync {
    fn get_definition(&self, ctx: &Context, project: &str, definition_id: i64) -> Result<BuildDefinitionReference>;
}

/// Classification nodes and query folders.
pub trait WorkItemTrackingClient: Send + Sync {
    /// Node at `path` below the group root (empty path is the root).
    fn get_classification_node(
        &self,
        ctx: &Context,
        project: &str,
        group: TreeStructureGroup,
        path: &str,
        depth: u32,
    ) -> Result<WorkItemClassificationNode>;

    /// Query or folder by id or path.
    fn get_query(&self, ctx: &Context, project: &str, query: &str, depth: u32) -> Result<QueryHierarchyItem>;
}

/// Feature states scoped to a project.
pub trait FeatureManagementClient: Send + Sync {
    fn set_feature_state(
        &self,
        ctx: &Context,
        project_id: Uuid,
        feature_id: &str,
        state: FeatureEnabledValue,
    ) -> Result<ContributedFeatureState>;

    fn query_feature_states(
        &self,
        ctx: &Context,
        project_id: Uuid,
        feature_ids: &[String],
    ) -> Result<ContributedFeatureStateQuery>;
}
