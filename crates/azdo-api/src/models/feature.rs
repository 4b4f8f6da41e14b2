//! Feature management area.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureEnabledValue {
    Undefined,
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSettingScope {
    pub setting_scope: String,
    pub user_scoped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributedFeatureState {
    pub feature_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<FeatureSettingScope>,
    pub state: FeatureEnabledValue,
}

/// Body and response of a feature state query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributedFeatureStateQuery {
    #[serde(default)]
    pub feature_ids: Vec<String>,
    #[serde(default)]
    pub feature_states: BTreeMap<String, ContributedFeatureState>,
    #[serde(default)]
    pub scope_values: BTreeMap<String, String>,
}
