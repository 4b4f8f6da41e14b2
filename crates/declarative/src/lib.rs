//! # Declarative
//!
//! Lifecycle kernel for managed remote resources.
//!
//! A provider implements one [`Resource`] per kind of remote object with
//! typed plan and state models. The kernel wraps each resource in a
//! [`ResourceWrapper`] that the host runtime drives through JSON values:
//!
//! - resolves per-operation timeouts from the `timeouts` block
//! - validates the plan against the [`Schema`] before any remote call
//! - seeds state from the plan when a write returns nothing
//! - reads the object back after every write, optionally polling until the
//!   read matches the plan (eventual consistency)
//! - drops a resource from state when a read reports it gone
//! - imports by id or identity object and upgrades old state versions
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Context, IdentityField, Resource, ResourceWrapper, Result, Schema};
//!
//! struct Note;
//!
//! impl Resource for Note {
//!     type Model = NoteModel;
//!
//!     fn resource_type(&self) -> &'static str { "note" }
//!     fn schema(&self) -> Schema { Schema::new() }
//!     fn identity_fields(&self) -> Vec<IdentityField> { vec![IdentityField::new("id", "id")] }
//!
//!     fn create(&self, ctx: &Context, plan: &NoteModel) -> Result<Option<NoteModel>> { ... }
//!     fn read(&self, ctx: &Context, state: &NoteModel) -> Result<NoteModel> { ... }
//!     fn update(&self, ctx: &Context, plan: &NoteModel, prior: &NoteModel) -> Result<Option<NoteModel>> { ... }
//!     fn delete(&self, ctx: &Context, state: &NoteModel) -> Result<()> { ... }
//! }
//!
//! let resource = ResourceWrapper::boxed(Note);
//! ```
//!
//! ## Polling
//!
//! [`StateChangeConf`] waits for a long-running operation to reach a target
//! state; [`retry`] runs an attempt until it succeeds a number of times in a
//! row. Both observe the [`Context`] deadline and cancellation.

pub mod context;
pub mod data_source;
pub mod diagnostics;
pub mod error;
pub mod poll;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod timeouts;
pub mod wrapper;

// Re-export main types at crate root
pub use context::{CancellationToken, Context, Operation};
pub use data_source::{BoxedDataSource, DataSource, DataSourceWrapper, ManagedDataSource};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{Error, ErrorCategory, Result, ResultExt};
pub use poll::{Refresh, RetryError, RetryOption, StateChangeConf, retry};
pub use provider::Provider;
pub use resource::{DeletePoll, IdentityField, Resource, StateUpgrader, WriteOperation, WritePoll};
pub use schema::{Attribute, AttributeType, IdentityAttribute, IdentitySchema, Schema};
pub use timeouts::{ResourceTimeout, TIMEOUTS_ATTRIBUTE, Timeouts};
pub use wrapper::{
    BoxedResource, CreateRequest, DeleteRequest, ImportRequest, ManagedResource, ReadRequest,
    ResourceWrapper, Response, UpdateRequest,
};
