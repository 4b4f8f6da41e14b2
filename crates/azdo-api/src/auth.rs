//! Credentials and the `Authorization` header.
//!
//! A personal access token is sent as HTTP Basic with an empty user name.
//! Azure AD tokens are obtained from a [`TokenSource`] supplied by the
//! embedding host and sent as Bearer tokens.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::sync::Arc;

/// Azure DevOps resource scope for Azure AD token requests.
pub const AZURE_DEVOPS_SCOPE: &str = "499b84ac-1321-427f-aa17-267ca6975798/.default";

/// Source of Azure AD access tokens.
pub trait TokenSource: Send + Sync {
    /// Return a valid access token for `scope`.
    fn token(&self, scope: &str) -> Result<String>;
}

/// A fixed token, e.g. one handed over by a pipeline.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self, _scope: &str) -> Result<String> {
        if self.0.is_empty() {
            return Err(Error::Credential {
                message: "empty access token".to_string(),
            });
        }
        Ok(self.0.clone())
    }
}

/// Credential used to authorize requests.
#[derive(Clone)]
pub enum Credential {
    PersonalAccessToken(String),
    Aad(Arc<dyn TokenSource>),
}

impl Credential {
    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> Result<String> {
        match self {
            Self::PersonalAccessToken(pat) => {
                let encoded = STANDARD.encode(format!(":{pat}"));
                Ok(format!("Basic {encoded}"))
            }
            Self::Aad(source) => Ok(format!("Bearer {}", source.token(AZURE_DEVOPS_SCOPE)?)),
        }
    }

    /// Short label for logs; never includes the secret.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PersonalAccessToken(_) => "personal access token",
            Self::Aad(_) => "Azure AD token",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.kind())
    }
}
