//! Build area.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinitionReference {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Folder path with `\` separators; `\` is the root.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub revision: Option<i64>,
}
