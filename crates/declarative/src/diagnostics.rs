//! Diagnostics returned to the host runtime.

use crate::error::{Error, ErrorCategory};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Markers the kernel acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    General,
    /// The remote object is gone; the kernel drops it from state.
    ResourceNotFound,
    /// Create found an existing object; `import_id` is the suggested import id.
    ImportAsExists { import_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
            kind: DiagnosticKind::General,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    /// Convert an error into a diagnostic under the given summary.
    ///
    /// Context wrappers become the summary when `summary` is empty; without
    /// one the error category describes the failure.
    pub fn from_error(summary: &str, err: &Error) -> Self {
        let (summary, detail) = match err {
            Error::Context { summary: inner, source } if summary.is_empty() => {
                (inner.clone(), source.to_string())
            }
            other if summary.is_empty() => {
                (other.category().description().to_string(), other.to_string())
            }
            other => (summary.to_string(), other.to_string()),
        };

        let mut diagnostic = Self::error(summary, detail);
        diagnostic.kind = match err.root() {
            Error::AlreadyExists { import_id, .. } => DiagnosticKind::ImportAsExists {
                import_id: import_id.clone(),
            },
            _ if err.category() == ErrorCategory::NotFound => DiagnosticKind::ResourceNotFound,
            _ => DiagnosticKind::General,
        };
        if let Error::Input {
            attribute: Some(attribute),
            ..
        } = err.root()
        {
            diagnostic.attribute = Some(attribute.clone());
        }
        diagnostic
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_resource_not_found(&self) -> bool {
        self.kind == DiagnosticKind::ResourceNotFound
    }
}

/// Ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append an error under a summary.
    pub fn add_error(&mut self, summary: &str, err: &Error) {
        self.push(Diagnostic::from_error(summary, err));
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn contains_not_found(&self) -> bool {
        self.0.iter().any(Diagnostic::is_resource_not_found)
    }

    /// Remove every resource-not-found marker.
    pub fn remove_not_found(&mut self) {
        self.0.retain(|d| !d.is_resource_not_found());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_marker() {
        let err = Error::not_found("gone").context("Get the group");
        let diag = Diagnostic::from_error("", &err);
        assert_eq!(diag.summary, "Get the group");
        assert_eq!(diag.detail, "gone");
        assert!(diag.is_resource_not_found());
    }

    #[test]
    fn test_import_as_exists_marker() {
        let err = Error::already_exists("azuredevops_group_membership", "g/m");
        let diag = Diagnostic::from_error("Create the resource", &err);
        assert_eq!(
            diag.kind,
            DiagnosticKind::ImportAsExists {
                import_id: "g/m".to_string()
            }
        );
    }

    #[test]
    fn test_attribute_scope_preserved() {
        let err = Error::attribute("settings.0.scope", "bad scope");
        let diag = Diagnostic::from_error("Invalid configuration", &err);
        assert_eq!(diag.attribute.as_deref(), Some("settings.0.scope"));
    }

    #[test]
    fn test_remove_not_found_keeps_other_diagnostics() {
        let mut diags = Diagnostics::new();
        diags.add_error("Read", &Error::not_found("gone"));
        diags.push(Diagnostic::warning("Heads up", "something"));
        assert!(diags.contains_not_found());
        assert!(diags.has_error());

        diags.remove_not_found();
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_error());
    }
}
