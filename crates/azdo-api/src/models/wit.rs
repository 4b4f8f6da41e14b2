//! Work item tracking area: classification nodes and query folders.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tree structure group of a classification node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStructureGroup {
    Areas,
    Iterations,
}

impl TreeStructureGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Areas => "areas",
            Self::Iterations => "iterations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemClassificationNode {
    pub id: i64,
    #[serde(default)]
    pub identifier: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub has_children: Option<bool>,
    #[serde(default)]
    pub children: Option<Vec<WorkItemClassificationNode>>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHierarchyItem {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub is_folder: Option<bool>,
    #[serde(default)]
    pub has_children: Option<bool>,
    #[serde(default)]
    pub children: Option<Vec<QueryHierarchyItem>>,
}
