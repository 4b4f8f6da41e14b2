//! In-memory Azure DevOps backend for unit tests.
//!
//! Every client trait is served from one [`FakeState`]. Calls are
//! recorded by method name so tests can assert on traffic, and a method
//! can be scripted to fail once with an HTTP status.

use azdo_api::models::JsonPatchOperation;
use azdo_api::models::build::BuildDefinitionReference;
use azdo_api::models::feature::{ContributedFeatureState, ContributedFeatureStateQuery, FeatureEnabledValue};
use azdo_api::models::git::GitRef;
use azdo_api::models::graph::{
    GraphDescriptorResult, GraphGroup, GraphMembership, GraphStorageKeyResult, GroupCreationContext,
};
use azdo_api::models::identity::Identity;
use azdo_api::models::policy::PolicyConfiguration;
use azdo_api::models::project::{Operation, OperationReference, OperationStatus, Process, TeamProject};
use azdo_api::models::security::{
    AccessControlEntriesUpdate, AccessControlEntry, AccessControlList, ActionDefinition, SecurityNamespaceDescription,
};
use azdo_api::models::wit::{QueryHierarchyItem, TreeStructureGroup, WorkItemClassificationNode};
use azdo_api::{
    BuildClient, CoreClient, Error, FeatureManagementClient, GitClient, GraphClient, IdentityClient, OperationsClient,
    PolicyClient, Result, SecurityClient, WorkItemTrackingClient,
};
use declarative::Context;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub fn action(name: &str, bit: i64) -> ActionDefinition {
    ActionDefinition {
        bit,
        name: name.to_string(),
        display_name: None,
        namespace_id: None,
    }
}

#[derive(Default)]
pub struct FakeState {
    pub namespaces: Vec<SecurityNamespaceDescription>,
    /// Identities by subject descriptor.
    pub identities: BTreeMap<String, Identity>,
    /// ACLs by namespace and token.
    pub acls: BTreeMap<(Uuid, String), AccessControlList>,
    pub ace_writes: Vec<(Uuid, AccessControlEntriesUpdate)>,
    pub projects: Vec<TeamProject>,
    pub processes: Vec<Process>,
    /// Statuses handed out by `get_operation`; the last one repeats.
    pub operation_statuses: VecDeque<OperationStatus>,
    pub groups: BTreeMap<String, GraphGroup>,
    pub descriptors: BTreeMap<Uuid, String>,
    /// Memberships as (member, container).
    pub memberships: BTreeSet<(String, String)>,
    pub policies: BTreeMap<i64, PolicyConfiguration>,
    pub refs: BTreeMap<String, Vec<GitRef>>,
    pub definitions: BTreeMap<i64, BuildDefinitionReference>,
    pub nodes: BTreeMap<(String, &'static str, String), WorkItemClassificationNode>,
    /// Query items by project and lookup key (path or id).
    pub queries: BTreeMap<(String, String), QueryHierarchyItem>,
    pub features: BTreeMap<(Uuid, String), FeatureEnabledValue>,
    next_id: i64,
}

#[derive(Default)]
pub struct FakeDevOps {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u16>>,
}

impl FakeDevOps {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
    }

    /// Make the next call to `method` fail with `status`.
    pub fn fail_once(&self, method: &str, status: u16) {
        self.failures.lock().unwrap().insert(method.to_string(), status);
    }

    fn record(&self, method: &str) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        match self.failures.lock().unwrap().remove(method) {
            Some(status) => Err(Error::http(status, format!("{method} failed"))),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state();
        state.next_id += 1;
        state.next_id
    }

    // ==================== Fixtures ====================

    pub fn add_namespace(&self, id: Uuid, name: &str, actions: Vec<ActionDefinition>) {
        self.state().namespaces.push(SecurityNamespaceDescription {
            namespace_id: id,
            name: name.to_string(),
            display_name: None,
            actions,
        });
    }

    pub fn add_identity(&self, subject: &str, descriptor: &str) {
        self.state().identities.insert(
            subject.to_string(),
            Identity {
                id: Some(Uuid::new_v4()),
                descriptor: Some(descriptor.to_string()),
                subject_descriptor: Some(subject.to_string()),
                provider_display_name: Some(subject.to_string()),
                is_active: Some(true),
            },
        );
    }

    pub fn set_ace(&self, namespace: Uuid, token: &str, descriptor: &str, allow: i64, deny: i64) {
        let mut state = self.state();
        let acl = state
            .acls
            .entry((namespace, token.to_string()))
            .or_insert_with(|| AccessControlList {
                token: token.to_string(),
                inherit_permissions: Some(true),
                ..AccessControlList::default()
            });
        acl.aces_dictionary.insert(
            descriptor.to_string(),
            AccessControlEntry {
                descriptor: descriptor.to_string(),
                allow,
                deny,
                extended_info: None,
            },
        );
    }

    pub fn ace(&self, namespace: Uuid, token: &str, descriptor: &str) -> Option<AccessControlEntry> {
        self.state()
            .acls
            .get(&(namespace, token.to_string()))?
            .aces_dictionary
            .get(descriptor)
            .cloned()
    }

    pub fn ace_writes(&self) -> Vec<(Uuid, AccessControlEntriesUpdate)> {
        self.state().ace_writes.clone()
    }

    pub fn add_project(&self, project: TeamProject) {
        self.state().projects.push(project);
    }

    pub fn add_process(&self, id: Uuid, name: &str, is_default: bool) {
        self.state().processes.push(Process {
            id,
            name: name.to_string(),
            is_default,
            description: None,
        });
    }

    pub fn script_operation(&self, statuses: &[OperationStatus]) {
        self.state().operation_statuses = statuses.iter().copied().collect();
    }

    pub fn add_group(&self, group: GraphGroup) {
        let descriptor = group.descriptor.clone().unwrap_or_default();
        let mut state = self.state();
        state.descriptors.insert(Uuid::new_v4(), descriptor.clone());
        state.groups.insert(descriptor, group);
    }

    pub fn add_descriptor(&self, storage_key: Uuid, descriptor: &str) {
        self.state().descriptors.insert(storage_key, descriptor.to_string());
    }

    pub fn add_membership(&self, member: &str, container: &str) {
        self.state()
            .memberships
            .insert((member.to_string(), container.to_string()));
    }

    pub fn has_membership(&self, member: &str, container: &str) -> bool {
        self.state()
            .memberships
            .contains(&(member.to_string(), container.to_string()))
    }

    pub fn policy(&self, id: i64) -> Option<PolicyConfiguration> {
        self.state().policies.get(&id).cloned()
    }

    pub fn add_ref(&self, repository: &str, name: &str) {
        self.state()
            .refs
            .entry(repository.to_string())
            .or_default()
            .push(GitRef {
                name: name.to_string(),
                object_id: Some("0000000000000000000000000000000000000000".to_string()),
            });
    }

    pub fn add_definition(&self, id: i64, path: &str) {
        self.state().definitions.insert(
            id,
            BuildDefinitionReference {
                id,
                name: Some(format!("definition-{id}")),
                path: Some(path.to_string()),
                revision: Some(1),
            },
        );
    }

    pub fn add_classification_node(
        &self,
        project: &str,
        group: TreeStructureGroup,
        path: &str,
        identifier: Uuid,
        has_children: bool,
    ) {
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        let id = self.next_id();
        self.state().nodes.insert(
            (project.to_string(), group.as_str(), path.to_string()),
            WorkItemClassificationNode {
                id,
                identifier: Some(identifier),
                name,
                has_children: Some(has_children),
                children: None,
                path: Some(path.to_string()),
            },
        );
    }

    /// Register a query folder reachable through `key` with the given children.
    pub fn add_query_folder(&self, project: &str, key: &str, name: &str, id: Uuid, children: &[(&str, Uuid)]) {
        let children: Vec<QueryHierarchyItem> = children
            .iter()
            .map(|(child, child_id)| QueryHierarchyItem {
                id: Some(*child_id),
                name: child.to_string(),
                path: None,
                is_folder: Some(true),
                has_children: None,
                children: None,
            })
            .collect();
        self.state().queries.insert(
            (project.to_string(), key.to_string()),
            QueryHierarchyItem {
                id: Some(id),
                name: name.to_string(),
                path: None,
                is_folder: Some(true),
                has_children: Some(!children.is_empty()),
                children: Some(children),
            },
        );
    }

    pub fn feature(&self, project: Uuid, feature_id: &str) -> Option<FeatureEnabledValue> {
        self.state()
            .features
            .get(&(project, feature_id.to_string()))
            .copied()
    }
}

fn find_project<'a>(projects: &'a [TeamProject], key: &str) -> Option<&'a TeamProject> {
    projects.iter().find(|p| {
        p.id.is_some_and(|id| id.to_string().eq_ignore_ascii_case(key)) || p.name.eq_ignore_ascii_case(key)
    })
}

fn operation() -> OperationReference {
    OperationReference {
        id: Uuid::new_v4(),
        status: Some(OperationStatus::Queued),
        url: None,
    }
}

impl CoreClient for FakeDevOps {
    fn get_project(&self, _ctx: &Context, project: &str, _include_capabilities: bool) -> Result<TeamProject> {
        self.record("get_project")?;
        find_project(&self.state().projects, project)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("project {project} not found")))
    }

    fn list_processes(&self, _ctx: &Context) -> Result<Vec<Process>> {
        self.record("list_processes")?;
        Ok(self.state().processes.clone())
    }

    fn queue_create_project(&self, _ctx: &Context, project: &TeamProject) -> Result<OperationReference> {
        self.record("queue_create_project")?;
        let mut created = project.clone();
        created.id = Some(Uuid::new_v4());
        created.state = Some("wellFormed".to_string());
        self.state().projects.push(created);
        Ok(operation())
    }

    fn update_project(&self, _ctx: &Context, project_id: Uuid, project: &TeamProject) -> Result<OperationReference> {
        self.record("update_project")?;
        let mut state = self.state();
        let existing = state
            .projects
            .iter_mut()
            .find(|p| p.id == Some(project_id))
            .ok_or_else(|| Error::not_found(format!("project {project_id} not found")))?;
        if !project.name.is_empty() {
            existing.name = project.name.clone();
        }
        if project.description.is_some() {
            existing.description = project.description.clone();
        }
        if project.visibility.is_some() {
            existing.visibility = project.visibility.clone();
        }
        Ok(operation())
    }

    fn queue_delete_project(&self, _ctx: &Context, project_id: Uuid) -> Result<OperationReference> {
        self.record("queue_delete_project")?;
        self.state().projects.retain(|p| p.id != Some(project_id));
        Ok(operation())
    }
}

impl OperationsClient for FakeDevOps {
    fn get_operation(&self, _ctx: &Context, operation_id: Uuid) -> Result<Operation> {
        self.record("get_operation")?;
        let mut state = self.state();
        let status = if state.operation_statuses.len() > 1 {
            state.operation_statuses.pop_front()
        } else {
            state.operation_statuses.front().copied()
        };
        Ok(Operation {
            id: operation_id,
            status: Some(status.unwrap_or(OperationStatus::Succeeded)),
            result_message: None,
        })
    }
}

impl GraphClient for FakeDevOps {
    fn create_group(
        &self,
        _ctx: &Context,
        creation: &GroupCreationContext,
        scope_descriptor: Option<&str>,
    ) -> Result<GraphGroup> {
        self.record("create_group")?;
        let descriptor = format!("vssgp.{}", Uuid::new_v4().simple());
        let domain = scope_descriptor.map(|scope| {
            let key = self
                .state()
                .descriptors
                .iter()
                .find(|(_, d)| *d == scope)
                .map_or_else(|| scope.to_string(), |(k, _)| k.to_string());
            format!("vstfs:///Classification/TeamProject/{key}")
        });
        let mut group = GraphGroup {
            descriptor: Some(descriptor.clone()),
            origin: Some("vsts".to_string()),
            subject_kind: Some("group".to_string()),
            domain,
            url: Some(format!("https://vssps.example/_apis/Graph/Groups/{descriptor}")),
            ..GraphGroup::default()
        };
        match creation {
            GroupCreationContext::Vsts {
                display_name,
                description,
            } => {
                group.display_name = Some(display_name.clone());
                group.description = description.clone();
                group.principal_name = Some(format!("[project]\\{display_name}"));
            }
            GroupCreationContext::OriginId { origin_id } => {
                group.origin = Some("aad".to_string());
                group.origin_id = Some(origin_id.clone());
                group.display_name = Some(origin_id.clone());
            }
            GroupCreationContext::MailAddress { mail_address } => {
                group.origin = Some("aad".to_string());
                group.mail_address = Some(mail_address.clone());
                group.display_name = Some(mail_address.clone());
            }
        }
        let mut state = self.state();
        state.descriptors.insert(Uuid::new_v4(), descriptor.clone());
        state.groups.insert(descriptor, group.clone());
        Ok(group)
    }

    fn get_group(&self, _ctx: &Context, descriptor: &str) -> Result<GraphGroup> {
        self.record("get_group")?;
        self.state()
            .groups
            .get(descriptor)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("group {descriptor} not found")))
    }

    fn update_group(&self, _ctx: &Context, descriptor: &str, patch: &[JsonPatchOperation]) -> Result<GraphGroup> {
        self.record("update_group")?;
        let mut state = self.state();
        let group = state
            .groups
            .get_mut(descriptor)
            .ok_or_else(|| Error::not_found(format!("group {descriptor} not found")))?;
        for op in patch {
            let value = op.value.as_ref().and_then(|v| v.as_str()).map(str::to_string);
            match op.path.as_str() {
                "/displayName" => group.display_name = value,
                "/description" => group.description = value,
                _ => {}
            }
        }
        Ok(group.clone())
    }

    fn delete_group(&self, _ctx: &Context, descriptor: &str) -> Result<()> {
        self.record("delete_group")?;
        self.state()
            .groups
            .remove(descriptor)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("group {descriptor} not found")))
    }

    fn get_descriptor(&self, _ctx: &Context, storage_key: Uuid) -> Result<GraphDescriptorResult> {
        self.record("get_descriptor")?;
        let value = self
            .state()
            .descriptors
            .get(&storage_key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no descriptor for {storage_key}")))?;
        Ok(GraphDescriptorResult { value: Some(value) })
    }

    fn get_storage_key(&self, _ctx: &Context, subject_descriptor: &str) -> Result<GraphStorageKeyResult> {
        self.record("get_storage_key")?;
        let key = self
            .state()
            .descriptors
            .iter()
            .find(|(_, d)| *d == subject_descriptor)
            .map(|(k, _)| *k);
        Ok(GraphStorageKeyResult { value: key })
    }

    fn add_membership(&self, _ctx: &Context, subject: &str, container: &str) -> Result<GraphMembership> {
        self.record("add_membership")?;
        self.state()
            .memberships
            .insert((subject.to_string(), container.to_string()));
        Ok(GraphMembership {
            container_descriptor: Some(container.to_string()),
            member_descriptor: Some(subject.to_string()),
        })
    }

    fn get_membership(&self, _ctx: &Context, subject: &str, container: &str) -> Result<GraphMembership> {
        self.record("get_membership")?;
        if self.has_membership(subject, container) {
            Ok(GraphMembership {
                container_descriptor: Some(container.to_string()),
                member_descriptor: Some(subject.to_string()),
            })
        } else {
            Err(Error::not_found(format!("membership {subject} in {container} not found")))
        }
    }

    fn check_membership_existence(&self, _ctx: &Context, subject: &str, container: &str) -> Result<()> {
        self.record("check_membership_existence")?;
        if self.has_membership(subject, container) {
            Ok(())
        } else {
            Err(Error::not_found(format!("membership {subject} in {container} not found")))
        }
    }

    fn remove_membership(&self, _ctx: &Context, subject: &str, container: &str) -> Result<()> {
        self.record("remove_membership")?;
        self.state()
            .memberships
            .remove(&(subject.to_string(), container.to_string()));
        Ok(())
    }
}

impl IdentityClient for FakeDevOps {
    fn read_identities_by_subject(&self, _ctx: &Context, subject_descriptors: &[String]) -> Result<Vec<Identity>> {
        self.record("read_identities_by_subject")?;
        let state = self.state();
        Ok(subject_descriptors
            .iter()
            .filter_map(|s| state.identities.get(s).cloned())
            .collect())
    }
}

impl SecurityClient for FakeDevOps {
    fn query_security_namespaces(&self, _ctx: &Context, namespace_id: Uuid) -> Result<Vec<SecurityNamespaceDescription>> {
        self.record("query_security_namespaces")?;
        Ok(self
            .state()
            .namespaces
            .iter()
            .filter(|ns| namespace_id.is_nil() || ns.namespace_id == namespace_id)
            .cloned()
            .collect())
    }

    fn query_access_control_lists(
        &self,
        _ctx: &Context,
        namespace_id: Uuid,
        token: &str,
        descriptors: &[String],
        _include_extended_info: bool,
    ) -> Result<Vec<AccessControlList>> {
        self.record("query_access_control_lists")?;
        let state = self.state();
        let Some(acl) = state.acls.get(&(namespace_id, token.to_string())) else {
            return Ok(Vec::new());
        };
        let mut acl = acl.clone();
        if !descriptors.is_empty() {
            acl.aces_dictionary.retain(|d, _| descriptors.contains(d));
        }
        Ok(vec![acl])
    }

    /// Merge ORs the incoming masks into the stored entry and never clears
    /// a bit back to not set; replace stores the entry as sent.
    fn set_access_control_entries(
        &self,
        _ctx: &Context,
        namespace_id: Uuid,
        update: &AccessControlEntriesUpdate,
    ) -> Result<Vec<AccessControlEntry>> {
        self.record("set_access_control_entries")?;
        let mut state = self.state();
        state.ace_writes.push((namespace_id, update.clone()));
        let acl = state
            .acls
            .entry((namespace_id, update.token.clone()))
            .or_insert_with(|| AccessControlList {
                token: update.token.clone(),
                inherit_permissions: Some(true),
                ..AccessControlList::default()
            });
        let mut written = Vec::new();
        for ace in &update.access_control_entries {
            let stored = acl
                .aces_dictionary
                .entry(ace.descriptor.clone())
                .or_insert_with(|| AccessControlEntry {
                    descriptor: ace.descriptor.clone(),
                    ..AccessControlEntry::default()
                });
            if update.merge {
                stored.allow = (stored.allow | ace.allow) & !ace.deny;
                stored.deny = (stored.deny | ace.deny) & !ace.allow;
            } else {
                stored.allow = ace.allow;
                stored.deny = ace.deny;
            }
            written.push(stored.clone());
        }
        Ok(written)
    }

    fn remove_access_control_entries(
        &self,
        _ctx: &Context,
        namespace_id: Uuid,
        token: &str,
        descriptors: &[String],
    ) -> Result<bool> {
        self.record("remove_access_control_entries")?;
        let mut state = self.state();
        let Some(acl) = state.acls.get_mut(&(namespace_id, token.to_string())) else {
            return Ok(false);
        };
        let before = acl.aces_dictionary.len();
        acl.aces_dictionary.retain(|d, _| !descriptors.contains(d));
        Ok(acl.aces_dictionary.len() < before)
    }
}

impl PolicyClient for FakeDevOps {
    fn create_policy_configuration(
        &self,
        _ctx: &Context,
        _project: &str,
        configuration: &PolicyConfiguration,
    ) -> Result<PolicyConfiguration> {
        self.record("create_policy_configuration")?;
        let id = self.next_id();
        let mut created = configuration.clone();
        created.id = Some(id);
        created.revision = Some(1);
        self.state().policies.insert(id, created.clone());
        Ok(created)
    }

    fn get_policy_configuration(&self, _ctx: &Context, _project: &str, id: i64) -> Result<PolicyConfiguration> {
        self.record("get_policy_configuration")?;
        self.policy(id)
            .ok_or_else(|| Error::not_found(format!("policy {id} not found")))
    }

    fn update_policy_configuration(
        &self,
        _ctx: &Context,
        _project: &str,
        id: i64,
        configuration: &PolicyConfiguration,
    ) -> Result<PolicyConfiguration> {
        self.record("update_policy_configuration")?;
        let mut state = self.state();
        let existing = state
            .policies
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("policy {id} not found")))?;
        let revision = existing.revision.unwrap_or_default() + 1;
        *existing = configuration.clone();
        existing.id = Some(id);
        existing.revision = Some(revision);
        Ok(existing.clone())
    }

    fn delete_policy_configuration(&self, _ctx: &Context, _project: &str, id: i64) -> Result<()> {
        self.record("delete_policy_configuration")?;
        self.state()
            .policies
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("policy {id} not found")))
    }
}

impl GitClient for FakeDevOps {
    fn get_refs(&self, _ctx: &Context, repository_id: &str, filter: &str) -> Result<Vec<GitRef>> {
        self.record("get_refs")?;
        let prefix = format!("refs/{filter}");
        Ok(self
            .state()
            .refs
            .get(repository_id)
            .map(|refs| refs.iter().filter(|r| r.name.starts_with(&prefix)).cloned().collect())
            .unwrap_or_default())
    }
}

impl BuildClient for FakeDevOps {
    fn get_definition(&self, _ctx: &Context, _project: &str, definition_id: i64) -> Result<BuildDefinitionReference> {
        self.record("get_definition")?;
        self.state()
            .definitions
            .get(&definition_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("definition {definition_id} not found")))
    }
}

impl WorkItemTrackingClient for FakeDevOps {
    fn get_classification_node(
        &self,
        _ctx: &Context,
        project: &str,
        group: TreeStructureGroup,
        path: &str,
        _depth: u32,
    ) -> Result<WorkItemClassificationNode> {
        self.record("get_classification_node")?;
        let key = (project.to_string(), group.as_str(), path.trim_matches('/').to_string());
        self.state()
            .nodes
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("classification node {path} not found")))
    }

    fn get_query(&self, _ctx: &Context, project: &str, query: &str, _depth: u32) -> Result<QueryHierarchyItem> {
        self.record("get_query")?;
        self.state()
            .queries
            .get(&(project.to_string(), query.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("query {query} not found")))
    }
}

impl FeatureManagementClient for FakeDevOps {
    fn set_feature_state(
        &self,
        _ctx: &Context,
        project_id: Uuid,
        feature_id: &str,
        state: FeatureEnabledValue,
    ) -> Result<ContributedFeatureState> {
        self.record("set_feature_state")?;
        self.state()
            .features
            .insert((project_id, feature_id.to_string()), state);
        Ok(ContributedFeatureState {
            feature_id: feature_id.to_string(),
            scope: None,
            state,
        })
    }

    fn query_feature_states(
        &self,
        _ctx: &Context,
        project_id: Uuid,
        feature_ids: &[String],
    ) -> Result<ContributedFeatureStateQuery> {
        self.record("query_feature_states")?;
        let state = self.state();
        let feature_states = feature_ids
            .iter()
            .map(|id| {
                let value = state
                    .features
                    .get(&(project_id, id.clone()))
                    .copied()
                    .unwrap_or(FeatureEnabledValue::Enabled);
                (
                    id.clone(),
                    ContributedFeatureState {
                        feature_id: id.clone(),
                        scope: None,
                        state: value,
                    },
                )
            })
            .collect();
        Ok(ContributedFeatureStateQuery {
            feature_ids: feature_ids.to_vec(),
            feature_states,
            scope_values: BTreeMap::from([("project".to_string(), project_id.to_string())]),
        })
    }
}
