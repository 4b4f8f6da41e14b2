//! Field helpers shared by resources and engines.
//!
//! Git branch names appear in ACL tokens as UTF-16 code units in
//! little-endian hex ("main" is `6d00610069006e00`).

use declarative::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Encode `s` as little-endian UTF-16 code units, two lowercase hex digits per byte.
pub fn encode_utf16_hex(s: &str) -> String {
    let bytes: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
    hex::encode(bytes)
}

/// Inverse of [`encode_utf16_hex`].
pub fn decode_utf16_hex(encoded: &str) -> Result<String> {
    let bytes = hex::decode(encoded)
        .map_err(|e| Error::input(format!("invalid UTF-16 hex string {encoded:?}: {e}")))?;
    if !bytes.len().is_multiple_of(2) {
        return Err(Error::input(format!(
            "invalid UTF-16 hex string {encoded:?}: odd number of bytes"
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| Error::input(format!("invalid UTF-16 hex string {encoded:?}: {e}")))
}

/// Parse a UUID attribute, reporting the attribute name on failure.
pub fn parse_uuid(attribute: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|e| Error::attribute(attribute, format!("expected {attribute} to be a valid UUID, got {value}: {e}")))
}

/// `None` for an empty string.
pub fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The string, or an empty one for `None`.
pub fn or_empty(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// A string compared case-insensitively.
///
/// The stored value keeps the case the service reports; only equality
/// ignores it, so a read that differs in case does not produce a diff.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseInsensitiveString(String);

impl CaseInsensitiveString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for CaseInsensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }
}

impl PartialEq<str> for CaseInsensitiveString {
    fn eq(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }
}

impl From<&str> for CaseInsensitiveString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CaseInsensitiveString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CaseInsensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
