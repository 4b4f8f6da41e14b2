//! Core area: projects, processes and long-running operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Capability keys of a project.
pub const CAPABILITY_VERSION_CONTROL: &str = "versioncontrol";
pub const CAPABILITY_SOURCE_CONTROL_TYPE: &str = "sourceControlType";
pub const CAPABILITY_PROCESS_TEMPLATE: &str = "processTemplate";
pub const CAPABILITY_TEMPLATE_TYPE_ID: &str = "templateTypeId";
pub const CAPABILITY_TEMPLATE_ID: &str = "templateId";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl TeamProject {
    /// Look up `capabilities[area][key]`.
    pub fn capability(&self, area: &str, key: &str) -> Option<&str> {
        self.capabilities
            .as_ref()?
            .get(area)?
            .get(key)
            .map(String::as_str)
    }
}

/// A process template (Agile, Basic, Scrum, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Status of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotSet,
    Queued,
    InProgress,
    Cancelled,
    Succeeded,
    Failed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSet => "NotSet",
            Self::Queued => "Queued",
            Self::InProgress => "InProgress",
            Self::Cancelled => "Cancelled",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a queued operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReference {
    pub id: Uuid,
    #[serde(default)]
    pub status: Option<OperationStatus>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    #[serde(default)]
    pub status: Option<OperationStatus>,
    #[serde(default)]
    pub result_message: Option<String>,
}
