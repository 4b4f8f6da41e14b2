//! Per-operation timeouts and the synthetic `timeouts` block.

use crate::context::Operation;
use crate::error::{Error, Result};
use crate::schema::{Attribute, AttributeType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Name of the block injected into every resource schema.
pub const TIMEOUTS_ATTRIBUTE: &str = "timeouts";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default timeout of each operation for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeout {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for ResourceTimeout {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

impl ResourceTimeout {
    /// Default for the given operation. Import shares the read timeout.
    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read | Operation::Import => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Schema of the `timeouts` block, documenting these defaults.
    pub fn block(&self) -> Attribute {
        let entry = |name: &str, default: Duration, verb: &str| {
            (
                name.to_string(),
                Attribute::optional(AttributeType::String).description(format!(
                    "(Defaults to {}) Used when {} the resource.",
                    describe(default),
                    verb
                )),
            )
        };
        let fields: BTreeMap<String, Attribute> = [
            entry("create", self.create, "creating"),
            entry("read", self.read, "retrieving"),
            entry("update", self.update, "updating"),
            entry("delete", self.delete, "deleting"),
        ]
        .into_iter()
        .collect();
        Attribute::optional(AttributeType::Object(fields))
    }
}

/// User-configured timeouts as stored in plan and state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

impl Timeouts {
    /// Extract the block from a plan or state object; absent or null means unset.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value.get(TIMEOUTS_ATTRIBUTE) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(block) => serde_json::from_value(block.clone()).map_err(|e| {
                Error::attribute(TIMEOUTS_ATTRIBUTE, format!("invalid timeouts block: {e}"))
            }),
        }
    }

    /// Effective timeout for `operation`, falling back to `defaults`.
    pub fn resolve(&self, operation: Operation, defaults: &ResourceTimeout) -> Result<Duration> {
        let configured = match operation {
            Operation::Create => self.create.as_deref(),
            Operation::Read | Operation::Import => self.read.as_deref(),
            Operation::Update => self.update.as_deref(),
            Operation::Delete => self.delete.as_deref(),
        };
        match configured {
            None => Ok(defaults.for_operation(operation)),
            Some(raw) => humantime::parse_duration(raw).map_err(|e| {
                Error::attribute(
                    TIMEOUTS_ATTRIBUTE,
                    format!("invalid duration {raw:?} for {operation} timeout: {e}"),
                )
            }),
        }
    }
}

fn describe(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs % 3600 == 0 && secs > 0 {
        plural(secs / 3600, "hour")
    } else if secs % 60 == 0 && secs > 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_five_minutes() {
        let defaults = ResourceTimeout::default();
        assert_eq!(defaults.create, Duration::from_secs(300));
        assert_eq!(defaults.read, Duration::from_secs(300));
        assert_eq!(defaults.for_operation(Operation::Import), defaults.read);
    }

    #[test]
    fn test_resolve_uses_configured_value() {
        let state = json!({"name": "p", "timeouts": {"create": "10m", "delete": "1h30m"}});
        let timeouts = Timeouts::from_value(&state).unwrap();
        let defaults = ResourceTimeout::default();
        assert_eq!(
            timeouts.resolve(Operation::Create, &defaults).unwrap(),
            Duration::from_secs(600)
        );
        assert_eq!(
            timeouts.resolve(Operation::Delete, &defaults).unwrap(),
            Duration::from_secs(5400)
        );
        assert_eq!(
            timeouts.resolve(Operation::Read, &defaults).unwrap(),
            defaults.read
        );
    }

    #[test]
    fn test_null_block_is_unset() {
        let timeouts = Timeouts::from_value(&json!({"timeouts": null})).unwrap();
        assert_eq!(timeouts, Timeouts::default());
    }

    #[test]
    fn test_invalid_duration_is_input_error() {
        let timeouts = Timeouts::from_value(&json!({"timeouts": {"read": "soon"}})).unwrap();
        let err = timeouts
            .resolve(Operation::Read, &ResourceTimeout::default())
            .unwrap_err();
        assert!(matches!(err, Error::Input { attribute: Some(_), .. }));
    }

    #[test]
    fn test_block_descriptions() {
        let block = ResourceTimeout {
            read: Duration::from_secs(120),
            ..ResourceTimeout::default()
        }
        .block();
        let AttributeType::Object(fields) = &block.kind else {
            panic!("Expected object block");
        };
        assert_eq!(
            fields["create"].description,
            "(Defaults to 5 minutes) Used when creating the resource."
        );
        assert_eq!(
            fields["read"].description,
            "(Defaults to 2 minutes) Used when retrieving the resource."
        );
    }
}
