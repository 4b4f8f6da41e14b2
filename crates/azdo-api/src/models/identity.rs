//! Identity area.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record; `descriptor` is the ACL-surface descriptor and
/// `subject_descriptor` the graph-surface one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub subject_descriptor: Option<String>,
    #[serde(default)]
    pub provider_display_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}
