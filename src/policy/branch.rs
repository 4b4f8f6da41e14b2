//! Branch policy envelope: one `settings` block whose `scope` list selects
//! the repositories and refs the policy applies to.

use super::PolicyType;
use super::driver::Envelope;
use super::settings::PolicySettings;
use declarative::{Attribute, AttributeType, Error, Result, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const MATCH_TYPES: [&str; 3] = ["Exact", "Prefix", "DefaultBranch"];

fn exact() -> String {
    "Exact".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository_ref: String,
    #[serde(default = "exact")]
    pub match_type: String,
}

impl Default for BranchScope {
    fn default() -> Self {
        Self {
            repository_id: String::new(),
            repository_ref: String::new(),
            match_type: exact(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireScope {
    repository_id: Option<String>,
    ref_name: Option<String>,
    match_kind: Option<String>,
}

fn nullable(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl BranchScope {
    fn expand(&self) -> Result<WireScope> {
        let scope = WireScope {
            repository_id: nullable(&self.repository_id),
            ref_name: nullable(&self.repository_ref),
            match_kind: nullable(&self.match_type),
        };
        if self.match_type.eq_ignore_ascii_case("DefaultBranch")
            && (scope.repository_id.is_some() || scope.ref_name.is_some())
        {
            return Err(Error::policy_violation(
                "neither 'repository_id' nor 'repository_ref' can be set when 'match_type=DefaultBranch'",
            ));
        }
        Ok(scope)
    }

    fn flatten(scope: WireScope) -> Self {
        Self {
            repository_id: scope.repository_id.unwrap_or_default(),
            repository_ref: scope.ref_name.unwrap_or_default(),
            match_type: scope.match_kind.unwrap_or_default(),
        }
    }
}

/// The single `settings` block of a branch policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchSettings<S> {
    #[serde(default)]
    pub scope: Vec<BranchScope>,
    #[serde(flatten)]
    pub settings: S,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchPolicy<S> {
    #[serde(default)]
    pub settings: Vec<BranchSettings<S>>,
}

impl<S: PolicySettings> Envelope for BranchPolicy<S> {
    fn policy_type() -> PolicyType {
        S::POLICY_TYPE
    }

    fn schema(schema: Schema) -> Schema {
        let scope = BTreeMap::from([
            ("repository_id".to_string(), Attribute::optional(AttributeType::String)),
            ("repository_ref".to_string(), Attribute::optional(AttributeType::String)),
            (
                "match_type".to_string(),
                Attribute::optional(AttributeType::String)
                    .one_of(&MATCH_TYPES)
                    .case_insensitive()
                    .default_value("Exact"),
            ),
        ]);
        let mut fields: BTreeMap<String, Attribute> = S::attributes()
            .into_iter()
            .map(|(name, attribute)| (name.to_string(), attribute))
            .collect();
        fields.insert(
            "scope".to_string(),
            Attribute::required(AttributeType::List(Box::new(Attribute::optional(AttributeType::Object(
                scope,
            )))))
            .items(Some(1), None),
        );
        schema.attribute(
            "settings",
            Attribute::required(AttributeType::List(Box::new(Attribute::optional(AttributeType::Object(
                fields,
            )))))
            .items(Some(1), Some(1)),
        )
    }

    fn expand(&self) -> Result<Map<String, Value>> {
        let block = self
            .settings
            .first()
            .ok_or_else(|| Error::attribute("settings", "exactly one settings block is required"))?;
        let scope = block
            .scope
            .iter()
            .map(BranchScope::expand)
            .collect::<Result<Vec<_>>>()?;

        let mut wire = Map::new();
        let scope = serde_json::to_value(scope).map_err(|e| Error::internal(e.to_string()))?;
        wire.insert("scope".to_string(), scope);
        block.settings.expand(&mut wire)?;
        Ok(wire)
    }

    fn flatten(settings: &Map<String, Value>) -> Result<Self> {
        let scope: Vec<WireScope> = match settings.get("scope") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::internal(format!("Unable to unmarshal policy settings. Error: {e}")))?,
        };
        Ok(Self {
            settings: vec![BranchSettings {
                scope: scope.into_iter().map(BranchScope::flatten).collect(),
                settings: S::flatten(settings)?,
            }],
        })
    }
}
