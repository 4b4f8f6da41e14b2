//! Security-namespace ACL engine.
//!
//! - [`namespace`]: well-known namespaces and the cached action catalog
//! - [`permission`]: principal permissions read, write and removal
//! - [`tokens`]: ACL token construction per resource family

pub mod namespace;
pub mod permission;
pub mod tokens;

pub use namespace::{ActionCatalog, NamespaceCatalog, SecurityNamespace};
pub use permission::{AclEngine, apply_permission};

use declarative::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// State of one action for one principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionType {
    Allow,
    Deny,
    NotSet,
}

impl PermissionType {
    pub const VALUES: [&'static str; 3] = ["allow", "deny", "notset"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::NotSet => "notset",
        }
    }

    /// Observed state of `bit` in an ACE: allow wins over deny.
    pub const fn from_bits(allow: i64, deny: i64, bit: i64) -> Self {
        if allow & bit != 0 {
            Self::Allow
        } else if deny & bit != 0 {
            Self::Deny
        } else {
            Self::NotSet
        }
    }
}

impl FromStr for PermissionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            "notset" => Ok(Self::NotSet),
            _ => Err(Error::attribute(
                "permissions",
                format!("Invalid permission action [{s}]"),
            )),
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PermissionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PermissionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Permissions of one principal, by action name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalPermission {
    pub subject_descriptor: String,
    pub permissions: BTreeMap<String, PermissionType>,
}

/// A permission write for one principal.
///
/// With `replace` false the service merges the entry into the existing
/// one and never clears an allow or deny back to not set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPrincipalPermission {
    pub replace: bool,
    pub principal_permission: PrincipalPermission,
}
