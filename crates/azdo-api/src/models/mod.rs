//! Wire models, one module per REST area.
//!
//! Field names follow the service's camelCase JSON; optional wire fields
//! are `Option` so partial payloads decode.

pub mod build;
pub mod feature;
pub mod git;
pub mod graph;
pub mod identity;
pub mod policy;
pub mod project;
pub mod security;
pub mod wit;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of list responses: `{"count": n, "value": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// JSON patch operation (RFC 6902).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Test,
}

impl JsonPatchOperation {
    /// `replace` operation setting `path` to `value`.
    pub fn replace(path: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.to_string(),
            value: Some(value.into()),
        }
    }
}
