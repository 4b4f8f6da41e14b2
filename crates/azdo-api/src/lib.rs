//! Blocking client for the Azure DevOps REST areas the provider manages.
//!
//! Engines and resources program against the traits in [`clients`];
//! [`Connection`] implements every one of them over HTTP.
//!
//! # Example
//!
//! ```no_run
//! use azdo_api::{Connection, CoreClient, Credential};
//! use declarative::Context;
//! use std::time::Duration;
//!
//! let conn = Connection::new(
//!     "https://dev.azure.com/contoso",
//!     Credential::PersonalAccessToken("token".to_string()),
//!     "example/0.1",
//! )?;
//! let ctx = Context::background(Duration::from_secs(30));
//! let project = conn.get_project(&ctx, "Fabrikam", true)?;
//! println!("{}", project.name);
//! # Ok::<(), azdo_api::Error>(())
//! ```

pub mod auth;
pub mod clients;
pub mod error;
pub mod http;
pub mod models;
mod rest;

pub use auth::{Credential, StaticToken, TokenSource};
pub use clients::{
    BuildClient, CoreClient, FeatureManagementClient, GitClient, GraphClient, IdentityClient, OperationsClient,
    PolicyClient, SecurityClient, WorkItemTrackingClient,
};
pub use error::{Error, ErrorCategory, Result};
pub use http::Connection;
