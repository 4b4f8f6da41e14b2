//! Error types for Azure DevOps REST calls.
//!
//! Errors are categorized so callers can tell a missing object (404) from a
//! conflicting one (409) or a transient service failure, and so the
//! lifecycle kernel can map them onto its own error kinds.

use std::fmt;
use std::time::Duration;

/// Result type alias for REST calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of REST errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network failure or 5xx answer (transient, retryable).
    Network,
    /// The addressed object does not exist (HTTP 404).
    NotFound,
    /// The object already exists or was modified concurrently (HTTP 409).
    Conflict,
    /// Credentials missing, expired or lacking permissions (HTTP 401/403).
    Unauthorized,
    /// The service rejected the request (other 4xx).
    BadRequest,
    /// The response body could not be decoded.
    Format,
    /// The request was abandoned (deadline or cancellation).
    Aborted,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Service unavailable",
            Self::NotFound => "Object not found",
            Self::Conflict => "Object already exists",
            Self::Unauthorized => "Not authorized",
            Self::BadRequest => "Request rejected",
            Self::Format => "Unexpected response",
            Self::Aborted => "Request aborted",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity to the organization and try again",
            Self::NotFound => "Verify the identifiers in the configuration",
            Self::Conflict => "Import the existing object instead of creating it",
            Self::Unauthorized => "Check the personal access token or service principal scopes",
            Self::BadRequest => "Check the error details returned by the service",
            Self::Format => "The service returned a payload this client does not understand",
            Self::Aborted => "Increase the operation timeout or retry",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to Azure DevOps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service answered with an error status.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message from the service error payload, or the status line.
        message: String,
        /// Service exception type, e.g. `GraphSubjectNotFoundException`.
        type_key: Option<String>,
    },

    /// The request did not produce a response.
    #[error("request failed: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The response body was not what the client expected.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// No usable credential.
    #[error("credential error: {message}")]
    Credential {
        /// Error message.
        message: String,
    },

    /// An argument could not be sent, e.g. an empty route value.
    #[error("invalid argument {name}: {message}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Error message.
        message: String,
    },

    /// The operation deadline passed before the request was sent.
    #[error("deadline exceeded before {request}")]
    DeadlineExceeded {
        /// Request that was not sent.
        request: String,
    },

    /// The host cancelled the operation.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Create an HTTP error with the given status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            type_key: None,
        }
    }

    /// Create an HTTP 404 error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(404, message)
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Build an error from a failed response and its body.
    ///
    /// Azure DevOps answers errors with `{"message": ..., "typeKey": ...}`;
    /// other bodies are kept verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct WrappedException {
            message: Option<String>,
            type_key: Option<String>,
        }

        match serde_json::from_str::<WrappedException>(body) {
            Ok(WrappedException {
                message: Some(message),
                type_key,
            }) => Self::Http {
                status,
                message,
                type_key,
            },
            _ if body.trim().is_empty() => Self::http(status, format!("HTTP {status}")),
            _ => Self::http(status, format!("HTTP {status}: {}", body.trim())),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status, .. } => match status {
                404 => ErrorCategory::NotFound,
                409 => ErrorCategory::Conflict,
                401 | 403 => ErrorCategory::Unauthorized,
                code if *code >= 500 => ErrorCategory::Network,
                _ => ErrorCategory::BadRequest,
            },
            Self::Transport { .. } => ErrorCategory::Network,
            Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::Credential { .. } => ErrorCategory::Unauthorized,
            Self::InvalidArgument { .. } => ErrorCategory::BadRequest,
            Self::DeadlineExceeded { .. } | Self::Cancelled => ErrorCategory::Aborted,
        }
    }

    /// Whether the service reported that the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// HTTP status code, if the service answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(code, format!("HTTP {code}")),
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<Error> for declarative::Error {
    fn from(err: Error) -> Self {
        match err.category() {
            ErrorCategory::NotFound => Self::not_found(err.to_string()),
            ErrorCategory::Conflict => Self::Conflict {
                message: err.to_string(),
            },
            ErrorCategory::Network => Self::Transient {
                message: err.to_string(),
            },
            ErrorCategory::Format => Self::internal(err.to_string()),
            ErrorCategory::Aborted => match err {
                Error::Cancelled => Self::Cancelled,
                other => Self::Timeout {
                    waiting_for: other.to_string(),
                    timeout: Duration::ZERO,
                    last_error: None,
                },
            },
            ErrorCategory::Unauthorized | ErrorCategory::BadRequest => Self::Remote {
                status: err.status(),
                message: err.to_string(),
            },
        }
    }
}
