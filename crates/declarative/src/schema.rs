//! Typed attribute schema
//!
//! Schemas are descriptive: the host runtime owns plan/state storage, but
//! the kernel uses the schema to inject the `timeouts` block, to publish
//! the identity schema and to run the static checks (required attributes,
//! allowed values, list bounds) before any remote call.

use crate::error::Error;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute value type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "element", rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Int,
    List(Box<Attribute>),
    Set(Box<Attribute>),
    Map(Box<AttributeType>),
    Object(BTreeMap<String, Attribute>),
}

/// One attribute of a resource schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub kind: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing the value requires replacing the resource.
    pub force_new: bool,
    pub sensitive: bool,
    /// Values compare case-insensitively when diffing.
    pub case_insensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Attribute {
    fn base(kind: AttributeType) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            case_insensitive: false,
            default: None,
            allowed_values: Vec::new(),
            min_items: None,
            max_items: None,
            description: String::new(),
        }
    }

    pub fn required(kind: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::base(kind)
        }
    }

    pub fn optional(kind: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::base(kind)
        }
    }

    pub fn computed(kind: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::base(kind)
        }
    }

    /// Optional attribute that the provider fills when unset.
    pub fn optional_computed(kind: AttributeType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::base(kind)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(ToString::to_string).collect();
        self
    }

    pub fn items(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn validate(&self, path: &str, value: Option<&Value>, errors: &mut Vec<Error>) {
        let value = match value {
            None | Some(Value::Null) => {
                if self.required {
                    errors.push(Error::attribute(
                        path,
                        format!("The argument \"{path}\" is required, but no definition was found."),
                    ));
                }
                return;
            }
            Some(value) => value,
        };

        match (&self.kind, value) {
            (AttributeType::String, Value::String(s)) => {
                if !self.allowed_values.is_empty() {
                    let allowed = self.allowed_values.iter().any(|a| {
                        if self.case_insensitive {
                            a.eq_ignore_ascii_case(s)
                        } else {
                            a == s
                        }
                    });
                    if !allowed {
                        errors.push(Error::attribute(
                            path,
                            format!(
                                "expected {path} to be one of [{}], got {s}",
                                self.allowed_values.join(" ")
                            ),
                        ));
                    }
                }
            }
            (AttributeType::List(element) | AttributeType::Set(element), Value::Array(items)) => {
                if let Some(min) = self.min_items
                    && items.len() < min
                {
                    errors.push(Error::attribute(
                        path,
                        format!("Attribute {path} requires {min} item minimum, but config has only {} declared.", items.len()),
                    ));
                }
                if let Some(max) = self.max_items
                    && items.len() > max
                {
                    errors.push(Error::attribute(
                        path,
                        format!("Attribute {path} supports {max} item maximum, but config has {} declared.", items.len()),
                    ));
                }
                for (index, item) in items.iter().enumerate() {
                    element.validate(&format!("{path}.{index}"), Some(item), errors);
                }
            }
            (AttributeType::Map(element), Value::Object(map)) if !self.allowed_values.is_empty() => {
                if **element == AttributeType::String {
                    for (key, item) in map {
                        Self {
                            kind: AttributeType::String,
                            ..self.clone()
                        }
                        .validate(&format!("{path}.{key}"), Some(item), errors);
                    }
                }
            }
            (AttributeType::Object(fields), Value::Object(map)) => {
                for (name, field) in fields {
                    field.validate(&format!("{path}.{name}"), map.get(name), errors);
                }
            }
            _ => {}
        }
    }
}

/// Schema of a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub version: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// Create an empty schema at version 0.
    pub fn new() -> Self {
        Self {
            version: 0,
            description: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Static checks of a planned object: required attributes, allowed
    /// values and list bounds. Computed-only attributes are skipped.
    pub fn validate(&self, plan: &Value) -> Vec<Error> {
        let mut errors = Vec::new();
        for (name, attribute) in &self.attributes {
            if attribute.computed && !attribute.optional && !attribute.required {
                continue;
            }
            attribute.validate(name, plan.get(name), &mut errors);
        }
        errors
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// One attribute of an identity schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityAttribute {
    pub name: String,
    pub required_for_import: bool,
    pub description: String,
}

/// Identity schema: the attributes that together identify a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySchema {
    pub attributes: Vec<IdentityAttribute>,
}
