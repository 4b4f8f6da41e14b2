//! `azuredevops_project`: a team project created through a queued operation.
//!
//! Create, update and delete all return an operation reference that is
//! polled to a terminal status. Project features (boards, repos, ...) are a
//! separate write against feature management after the project exists.

use crate::client::Clients;
use crate::converter::{CaseInsensitiveString, parse_uuid};
use azdo_api::models::feature::FeatureEnabledValue;
use azdo_api::models::project::{
    CAPABILITY_PROCESS_TEMPLATE, CAPABILITY_SOURCE_CONTROL_TYPE, CAPABILITY_TEMPLATE_ID, CAPABILITY_TEMPLATE_TYPE_ID,
    CAPABILITY_VERSION_CONTROL, OperationStatus, Process, TeamProject,
};
use azdo_api::{CoreClient, FeatureManagementClient, OperationsClient};
use declarative::{
    Attribute, AttributeType, BoxedResource, Context, Error, IdentityField, Refresh, Resource, ResourceTimeout,
    ResourceWrapper, Result, RetryOption, Schema, StateChangeConf, StateUpgrader, WriteOperation, WritePoll,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const RESOURCE_TYPE: &str = "azuredevops_project";

const VISIBILITIES: [&str; 2] = ["private", "public"];
const VERSION_CONTROLS: [&str; 2] = ["Git", "Tfvc"];

const OPERATION_PENDING: [&str; 3] = ["InProgress", "Queued", "NotSet"];
const OPERATION_TERMINAL: [&str; 3] = ["Failed", "Succeeded", "Cancelled"];

/// Feature attribute names and the feature-management ids they map to.
pub const FEATURE_IDS: [(&str, &str); 5] = [
    ("boards", "ms.vss-work.agile"),
    ("repos", "ms.vss-code.version-control"),
    ("pipelines", "ms.vss-build.pipelines"),
    ("test_plans", "ms.vss-test-web.test"),
    ("artifacts", "ms.azure-artifacts.feature"),
];

/// Poll cadence of project operations and of the features read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectTiming {
    pub operation_delay: Duration,
    pub operation_interval: Duration,
    pub operation_timeout: Duration,
    pub feature_interval: Duration,
}

impl Default for ProjectTiming {
    fn default() -> Self {
        Self {
            operation_delay: Duration::from_secs(5),
            operation_interval: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(5 * 60),
            feature_interval: Duration::from_secs(1),
        }
    }
}

/// Declared feature switches. `None` leaves a feature unmanaged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFeatures {
    pub boards: Option<bool>,
    pub repos: Option<bool>,
    pub pipelines: Option<bool>,
    pub test_plans: Option<bool>,
    pub artifacts: Option<bool>,
}

impl ProjectFeatures {
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "boards" => self.boards,
            "repos" => self.repos,
            "pipelines" => self.pipelines,
            "test_plans" => self.test_plans,
            "artifacts" => self.artifacts,
            _ => None,
        }
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<bool>> {
        match key {
            "boards" => Some(&mut self.boards),
            "repos" => Some(&mut self.repos),
            "pipelines" => Some(&mut self.pipelines),
            "test_plans" => Some(&mut self.test_plans),
            "artifacts" => Some(&mut self.artifacts),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, enabled: bool) {
        if let Some(slot) = self.slot(key) {
            *slot = Some(enabled);
        }
    }

    pub fn is_declared(&self) -> bool {
        FEATURE_IDS.iter().any(|(key, _)| self.get(key).is_some())
    }
}

fn private() -> String {
    "private".to_string()
}

fn git() -> String {
    "Git".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: CaseInsensitiveString,
    #[serde(default)]
    pub description: String,
    #[serde(default = "private")]
    pub visibility: String,
    #[serde(default = "git")]
    pub version_control: String,
    #[serde(default)]
    pub work_item_template: String,
    #[serde(default)]
    pub process_template_id: String,
    #[serde(default)]
    pub features: Option<ProjectFeatures>,
}

impl Default for ProjectModel {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: CaseInsensitiveString::default(),
            description: String::new(),
            visibility: private(),
            version_control: git(),
            work_item_template: String::new(),
            process_template_id: String::new(),
            features: None,
        }
    }
}

impl ProjectModel {
    fn declared_features(&self) -> Option<&ProjectFeatures> {
        self.features.as_ref().filter(|f| f.is_declared())
    }
}

/// Whether every feature the plan declares reads back with the planned value.
fn features_match(plan: &ProjectModel, read: &ProjectModel) -> bool {
    let Some(planned) = plan.declared_features() else {
        return true;
    };
    let read = read.features.clone().unwrap_or_default();
    FEATURE_IDS
        .iter()
        .all(|(key, _)| planned.get(key).is_none() || planned.get(key) == read.get(key))
}

/// Convert v0 `features = {boards = "enabled", repositories = "disabled", ...}`
/// into the v1 object of booleans.
fn upgrade_features_v0(mut state: Value) -> Result<Value> {
    const RENAMES: [(&str, &str); 5] = [
        ("boards", "boards"),
        ("repositories", "repos"),
        ("pipelines", "pipelines"),
        ("testplans", "test_plans"),
        ("artifacts", "artifacts"),
    ];

    let Some(object) = state.as_object_mut() else {
        return Err(Error::internal("project state is not an object"));
    };
    let upgraded = match object.remove("features") {
        Some(Value::Object(old)) if !old.is_empty() => {
            let mut features = Map::new();
            for (old_key, new_key) in RENAMES {
                let value = match old.get(old_key).and_then(Value::as_str) {
                    Some(v) if v.eq_ignore_ascii_case("enabled") => Value::Bool(true),
                    Some(v) if v.eq_ignore_ascii_case("disabled") => Value::Bool(false),
                    Some(other) => {
                        return Err(Error::internal(format!(
                            "unexpected value {other:?} for project feature {old_key}"
                        )));
                    }
                    None => Value::Null,
                };
                features.insert(new_key.to_string(), value);
            }
            Value::Object(features)
        }
        _ => Value::Null,
    };
    object.insert("features".to_string(), upgraded);
    Ok(state)
}

pub struct ProjectResource {
    core: Arc<dyn CoreClient>,
    operations: Arc<dyn OperationsClient>,
    features: Arc<dyn FeatureManagementClient>,
    timing: ProjectTiming,
}

impl ProjectResource {
    pub fn new(clients: &Clients) -> Self {
        Self {
            core: clients.core.clone(),
            operations: clients.operations.clone(),
            features: clients.features.clone(),
            timing: ProjectTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: ProjectTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn boxed(clients: &Clients) -> BoxedResource {
        ResourceWrapper::boxed(Self::new(clients))
    }

    /// Poll a queued operation until it terminates; anything but success fails.
    fn wait_for_operation(&self, ctx: &Context, operation_id: Uuid) -> Result<()> {
        let status = StateChangeConf::new(&OPERATION_PENDING, &OPERATION_TERMINAL)
            .delay(self.timing.operation_delay)
            .min_interval(self.timing.operation_interval)
            .timeout(self.timing.operation_timeout)
            .wait(ctx, || {
                let operation = self.operations.get_operation(ctx, operation_id)?;
                let status = operation.status.unwrap_or(OperationStatus::NotSet);
                Ok(Refresh::State(status, status.as_str().to_string()))
            })
            .map_err(|e| e.context(format!("waiting for project operation {operation_id}")))?;

        if status == OperationStatus::Succeeded {
            debug!("{RESOURCE_TYPE}: operation {operation_id} succeeded");
            Ok(())
        } else {
            Err(Error::OperationFailed {
                status: status.as_str().to_string(),
            })
        }
    }

    /// The process named `template`, or the organization default when empty.
    fn find_process(&self, ctx: &Context, template: &str) -> Result<Process> {
        let processes = self
            .core
            .list_processes(ctx)
            .map_err(|e| Error::from(e).context("listing process templates"))?;
        let found = if template.is_empty() {
            processes.into_iter().find(|p| p.is_default)
        } else {
            processes
                .into_iter()
                .find(|p| p.name.eq_ignore_ascii_case(template))
        };
        found.ok_or_else(|| Error::attribute("work_item_template", "process not found"))
    }

    fn apply_features(&self, ctx: &Context, project_id: &str, features: &ProjectFeatures) -> Result<()> {
        let project_id = parse_uuid("id", project_id)?;
        for (key, feature_id) in FEATURE_IDS {
            let Some(enabled) = features.get(key) else {
                continue;
            };
            let value = if enabled {
                FeatureEnabledValue::Enabled
            } else {
                FeatureEnabledValue::Disabled
            };
            self.features
                .set_feature_state(ctx, project_id, feature_id, value)
                .map_err(|e| Error::from(e).context(format!("setting feature {key} of project {project_id}")))?;
            debug!("{RESOURCE_TYPE}: feature {feature_id} of {project_id} set to {value:?}");
        }
        Ok(())
    }

    /// Current value of the features `declared` names; the others stay unset.
    fn read_features(&self, ctx: &Context, project_id: Uuid, declared: &ProjectFeatures) -> Result<ProjectFeatures> {
        let ids: Vec<String> = FEATURE_IDS.iter().map(|(_, id)| (*id).to_string()).collect();
        let query = self
            .features
            .query_feature_states(ctx, project_id, &ids)
            .map_err(|e| Error::from(e).context(format!("reading features of project {project_id}")))?;

        let mut features = ProjectFeatures::default();
        for (key, feature_id) in FEATURE_IDS {
            if declared.get(key).is_none() {
                continue;
            }
            if let Some(state) = query.feature_states.get(feature_id) {
                features.set(key, state.state == FeatureEnabledValue::Enabled);
            }
        }
        Ok(features)
    }
}

fn capabilities(version_control: &str, process_id: Uuid) -> BTreeMap<String, BTreeMap<String, String>> {
    BTreeMap::from([
        (
            CAPABILITY_VERSION_CONTROL.to_string(),
            BTreeMap::from([(CAPABILITY_SOURCE_CONTROL_TYPE.to_string(), version_control.to_string())]),
        ),
        (
            CAPABILITY_PROCESS_TEMPLATE.to_string(),
            BTreeMap::from([(CAPABILITY_TEMPLATE_TYPE_ID.to_string(), process_id.to_string())]),
        ),
    ])
}

impl Resource for ProjectResource {
    type Model = ProjectModel;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        let features = FEATURE_IDS
            .iter()
            .map(|(key, _)| ((*key).to_string(), Attribute::optional(AttributeType::Bool)))
            .collect();
        Schema::new()
            .version(1)
            .description("Manages a project within Azure DevOps.")
            .attribute("id", Attribute::computed(AttributeType::String))
            .attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .case_insensitive()
                    .description("The Project Name."),
            )
            .attribute(
                "description",
                Attribute::optional(AttributeType::String).default_value(""),
            )
            .attribute(
                "visibility",
                Attribute::optional(AttributeType::String)
                    .one_of(&VISIBILITIES)
                    .default_value("private"),
            )
            .attribute(
                "version_control",
                Attribute::optional(AttributeType::String)
                    .force_new()
                    .case_insensitive()
                    .one_of(&VERSION_CONTROLS)
                    .default_value("Git"),
            )
            .attribute(
                "work_item_template",
                Attribute::optional_computed(AttributeType::String)
                    .force_new()
                    .description("The work item template name. Defaults to the organization's default process."),
            )
            .attribute("process_template_id", Attribute::computed(AttributeType::String))
            .attribute(
                "features",
                Attribute::optional(AttributeType::Object(features))
                    .description("Enable or disable the Boards, Repos, Pipelines, Test Plans and Artifacts services."),
            )
    }

    fn identity_fields(&self) -> Vec<IdentityField> {
        vec![IdentityField::new("id", "id").described("Project id")]
    }

    fn timeouts(&self) -> ResourceTimeout {
        ResourceTimeout {
            create: Duration::from_secs(10 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(10 * 60),
        }
    }

    fn create(&self, ctx: &Context, plan: &Self::Model) -> Result<Option<Self::Model>> {
        let name = plan.name.as_str();
        match self.core.get_project(ctx, name, false) {
            Ok(existing) => {
                let id = existing.id.map(|id| id.to_string()).unwrap_or_else(|| name.to_string());
                return Err(Error::already_exists(RESOURCE_TYPE, id));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(Error::from(e).context(format!("checking for an existing project {name}"))),
        }

        let process = self.find_process(ctx, &plan.work_item_template)?;
        let project = TeamProject {
            name: name.to_string(),
            description: Some(plan.description.clone()),
            visibility: Some(plan.visibility.clone()),
            capabilities: Some(capabilities(&plan.version_control, process.id)),
            ..TeamProject::default()
        };
        let operation = self
            .core
            .queue_create_project(ctx, &project)
            .map_err(|e| Error::from(e).context(format!("queueing the creation of project {name}")))?;
        info!("{RESOURCE_TYPE}: queued creation of {name} as operation {}", operation.id);
        self.wait_for_operation(ctx, operation.id)
            .map_err(|e| e.context(format!("creating project {name}")))?;

        let created = self
            .core
            .get_project(ctx, name, false)
            .map_err(|e| Error::from(e).context(format!("looking up the new project {name}")))?;
        let id = created
            .id
            .ok_or_else(|| Error::internal(format!("project {name} has no id")))?;

        Ok(Some(ProjectModel {
            id: id.to_string(),
            work_item_template: process.name,
            process_template_id: process.id.to_string(),
            ..plan.clone()
        }))
    }

    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Self::Model> {
        let key = if state.id.is_empty() {
            state.name.as_str()
        } else {
            state.id.as_str()
        };
        let project = self
            .core
            .get_project(ctx, key, true)
            .map_err(|e| Error::from(e).context(format!("reading project {key}")))?;
        let id = project
            .id
            .ok_or_else(|| Error::internal(format!("project {key} has no id")))?;

        let process_template_id = project
            .capability(CAPABILITY_PROCESS_TEMPLATE, CAPABILITY_TEMPLATE_TYPE_ID)
            .or_else(|| project.capability(CAPABILITY_PROCESS_TEMPLATE, CAPABILITY_TEMPLATE_ID))
            .unwrap_or_default()
            .to_string();
        let processes = self
            .core
            .list_processes(ctx)
            .map_err(|e| Error::from(e).context("listing process templates"))?;
        let process = if process_template_id.is_empty() {
            processes.iter().find(|p| p.is_default)
        } else {
            let found = processes
                .iter()
                .find(|p| p.id.to_string().eq_ignore_ascii_case(&process_template_id));
            if found.is_none() {
                return Err(Error::internal(format!(
                    "Error looking up template by ID: process {process_template_id} not found"
                )));
            }
            found
        };
        let work_item_template = process.map_or_else(|| state.work_item_template.clone(), |p| p.name.clone());

        let features = match &state.features {
            Some(declared) => Some(self.read_features(ctx, id, declared)?),
            None => None,
        };

        Ok(ProjectModel {
            id: id.to_string(),
            name: CaseInsensitiveString::new(project.name.clone()),
            description: project.description.clone().unwrap_or_default(),
            visibility: project.visibility.clone().unwrap_or_else(private),
            version_control: project
                .capability(CAPABILITY_VERSION_CONTROL, CAPABILITY_SOURCE_CONTROL_TYPE)
                .map_or_else(|| state.version_control.clone(), ToString::to_string),
            work_item_template,
            process_template_id,
            features,
        })
    }

    fn update(&self, ctx: &Context, plan: &Self::Model, prior: &Self::Model) -> Result<Option<Self::Model>> {
        let id = parse_uuid("id", &prior.id)?;
        let mut changes = TeamProject::default();
        let mut changed = false;
        if plan.name != prior.name {
            changes.name = plan.name.to_string();
            changed = true;
        }
        if plan.description != prior.description {
            changes.description = Some(plan.description.clone());
            changed = true;
        }
        if plan.visibility != prior.visibility {
            changes.visibility = Some(plan.visibility.clone());
            changed = true;
        }

        if changed {
            let operation = self
                .core
                .update_project(ctx, id, &changes)
                .map_err(|e| Error::from(e).context(format!("updating project {id}")))?;
            self.wait_for_operation(ctx, operation.id)
                .map_err(|e| e.context(format!("updating project {id}")))?;
        } else {
            debug!("{RESOURCE_TYPE}: no project attribute of {id} changed");
        }

        let mut updated = plan.clone();
        updated.id.clone_from(&prior.id);
        updated.process_template_id.clone_from(&prior.process_template_id);
        if updated.work_item_template.is_empty() {
            updated.work_item_template.clone_from(&prior.work_item_template);
        }
        Ok(Some(updated))
    }

    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()> {
        let id = parse_uuid("id", &state.id)?;
        let operation = self
            .core
            .queue_delete_project(ctx, id)
            .map_err(|e| Error::from(e).context(format!("queueing the deletion of project {id}")))?;
        self.wait_for_operation(ctx, operation.id)
            .map_err(|e| e.context(format!("deleting project {id}")))
    }

    fn write_poll(&self, operation: WriteOperation) -> Option<WritePoll<Self::Model>> {
        match operation {
            WriteOperation::PostCreate | WriteOperation::PostUpdate => Some(
                WritePoll::new(RetryOption::simple(1, self.timing.feature_interval).attempts(10))
                    .check(features_match),
            ),
            WriteOperation::Create | WriteOperation::Update => None,
        }
    }

    fn should_post_create(&self, plan: &Self::Model) -> bool {
        plan.declared_features().is_some()
    }

    fn post_create(&self, ctx: &Context, plan: &Self::Model, state: &Self::Model) -> Result<()> {
        match plan.declared_features() {
            Some(features) => self.apply_features(ctx, &state.id, features),
            None => Ok(()),
        }
    }

    fn should_post_update(&self, plan: &Self::Model, prior: &Self::Model) -> bool {
        plan.declared_features().is_some() && plan.features != prior.features
    }

    fn post_update(&self, ctx: &Context, plan: &Self::Model, state: &Self::Model) -> Result<()> {
        self.post_create(ctx, plan, state)
    }

    fn upgraders(&self) -> Vec<StateUpgrader> {
        vec![StateUpgrader {
            prior_version: 0,
            upgrade: upgrade_features_v0,
        }]
    }
}
