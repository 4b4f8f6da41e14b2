//! Error types for resource lifecycle operations.
//!
//! Errors are categorized so the kernel can decide, per resource, whether a
//! failed read inside a post-write poll is worth another attempt, and whether
//! a failed read means the resource is gone and must be dropped from state.

use std::fmt;
use std::time::Duration;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid configuration or a referenced entity that does not exist.
    Input,
    /// The remote object is gone (HTTP 404 or an explicit deleted flag).
    NotFound,
    /// The remote object already exists or was concurrently modified.
    Conflict,
    /// Server-side 5xx or network failure.
    Transient,
    /// A long-running remote operation ended in a non-success state.
    OperationFailed,
    /// A cross-field constraint was violated before any remote call.
    PolicyViolation,
    /// An invariant did not hold.
    Internal,
    /// The operation deadline expired.
    Timeout,
    /// The host cancelled the operation.
    Cancelled,
}

impl ErrorCategory {
    /// Whether errors of this category may go away on their own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Whether this category ends the operation regardless of classifiers.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal | Self::Timeout | Self::Cancelled)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Input => "Invalid configuration",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource conflict",
            Self::Transient => "Transient service failure",
            Self::OperationFailed => "Remote operation failed",
            Self::PolicyViolation => "Constraint violation",
            Self::Internal => "Internal error",
            Self::Timeout => "Operation timed out",
            Self::Cancelled => "Operation cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors raised by resources, engines and the kernel itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration is invalid.
    #[error("{message}")]
    Input {
        /// Error message.
        message: String,
        /// Attribute the message refers to, if any.
        attribute: Option<String>,
    },

    /// The remote object does not exist.
    #[error("{message}")]
    NotFound {
        /// Error message.
        message: String,
    },

    /// The object to be created already exists and should be imported.
    #[error("{resource_type} already exists - to be managed via Terraform this resource needs to be imported into the State: {import_id}")]
    AlreadyExists {
        /// Resource type of the existing object.
        resource_type: String,
        /// Import identifier the user can pass to the import command.
        import_id: String,
    },

    /// The service rejected the write because of a conflicting object.
    #[error("{message}")]
    Conflict {
        /// Error message.
        message: String,
    },

    /// A transient failure (5xx, network).
    #[error("{message}")]
    Transient {
        /// Error message.
        message: String,
    },

    /// A long-running operation reached a non-success terminal state.
    #[error("operation terminated at status: {status:?}")]
    OperationFailed {
        /// Terminal status reported by the service.
        status: String,
    },

    /// A cross-field constraint was violated.
    #[error("{message}")]
    PolicyViolation {
        /// Error message.
        message: String,
    },

    /// An invariant did not hold.
    #[error("{message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// The service returned an error that has no dedicated category.
    #[error("{message}")]
    Remote {
        /// HTTP status code if available.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The operation deadline expired.
    #[error("timeout while waiting for {waiting_for} (timeout: {}){}", format_timeout(.timeout), format_last_error(.last_error))]
    Timeout {
        /// What the poller was waiting for.
        waiting_for: String,
        /// The timeout that expired.
        timeout: Duration,
        /// Last retryable error observed before the deadline.
        last_error: Option<Box<Error>>,
    },

    /// The host cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Another error with an operation summary attached.
    #[error("{summary}: {source}")]
    Context {
        /// Short description of the failed step.
        summary: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            attribute: None,
        }
    }

    /// Create an input error scoped to an attribute.
    pub fn attribute(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            attribute: Some(attribute.into()),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an "already exists, import it" error.
    pub fn already_exists(resource_type: impl Into<String>, import_id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource_type: resource_type.into(),
            import_id: import_id.into(),
        }
    }

    /// Create a constraint violation.
    pub fn policy_violation(message: impl Into<String>) -> Self {
        Self::PolicyViolation {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach an operation summary, e.g. "Get the group".
    pub fn context(self, summary: impl Into<String>) -> Self {
        Self::Context {
            summary: summary.into(),
            source: Box::new(self),
        }
    }

    /// Get the error category, looking through attached context.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input { .. } => ErrorCategory::Input,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } | Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Transient { .. } => ErrorCategory::Transient,
            Self::OperationFailed { .. } => ErrorCategory::OperationFailed,
            Self::PolicyViolation { .. } => ErrorCategory::PolicyViolation,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::Remote { status, .. } => match status {
                Some(404) => ErrorCategory::NotFound,
                Some(409) => ErrorCategory::Conflict,
                Some(code) if *code >= 500 => ErrorCategory::Transient,
                _ => ErrorCategory::Input,
            },
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Context { source, .. } => source.category(),
        }
    }

    /// Whether the remote object is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// The innermost error, skipping context wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

fn format_timeout(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

fn format_last_error(last_error: &Option<Box<Error>>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

/// Extension for attaching an operation summary to a `Result`.
pub trait ResultExt<T> {
    /// Wrap the error with a summary describing the failed step.
    fn context(self, summary: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, summary: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(summary))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("decoding state: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Input.is_retryable());
        assert!(!ErrorCategory::Internal.is_retryable());
    }

    #[test]
    fn test_error_category_fatal() {
        assert!(ErrorCategory::Internal.is_fatal());
        assert!(ErrorCategory::Timeout.is_fatal());
        assert!(ErrorCategory::Cancelled.is_fatal());
        assert!(!ErrorCategory::NotFound.is_fatal());
    }

    #[test]
    fn test_remote_status_classification() {
        let err = Error::Remote {
            status: Some(404),
            message: "gone".to_string(),
        };
        assert!(err.is_not_found());

        let err = Error::Remote {
            status: Some(503),
            message: "busy".to_string(),
        };
        assert!(err.is_retryable());

        let err = Error::Remote {
            status: Some(409),
            message: "exists".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_context_keeps_category() {
        let err = Error::not_found("group gone").context("Get the group");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Get the group: group gone");
        assert!(matches!(err.root(), Error::NotFound { .. }));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), Error> = Err(Error::input("bad"));
        let err = result.context("Expand settings").unwrap_err();
        assert_eq!(err.to_string(), "Expand settings: bad");
    }

    #[test]
    fn test_already_exists_display() {
        let err = Error::already_exists("azuredevops_project", "abc");
        let display = err.to_string();
        assert!(display.contains("azuredevops_project"));
        assert!(display.contains("abc"));
    }

    #[test]
    fn test_operation_failed_display() {
        let err = Error::OperationFailed {
            status: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation terminated at status: \"failed\"");
    }

    #[test]
    fn test_timeout_display_includes_last_error() {
        let err = Error::Timeout {
            waiting_for: "state to become 'success'".to_string(),
            timeout: Duration::from_secs(60),
            last_error: Some(Box::new(Error::not_found("missing"))),
        };
        let display = err.to_string();
        assert!(display.contains("1m"));
        assert!(display.ends_with(": missing"));
    }
}
