//! Resource trait for managed remote objects
//!
//! A Resource maps one kind of remote object onto a typed model. The kernel
//! ([`crate::ResourceWrapper`]) owns everything that is common to all kinds:
//! timeouts, plan validation, seeding state from the plan, the post-write
//! read-back poll, identity bookkeeping, import and state upgrades.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::poll::RetryOption;
use crate::schema::Schema;
use crate::timeouts::ResourceTimeout;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// Write step after which the kernel reads the object back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Create,
    PostCreate,
    Update,
    PostUpdate,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "Create",
            Self::PostCreate => "PostCreate",
            Self::Update => "Update",
            Self::PostUpdate => "PostUpdate",
        };
        write!(f, "{name}")
    }
}

/// Read-back poll after a write.
///
/// Without a poll the kernel reads once. With one, it reads until `check`
/// accepts the read `streak` times in a row; read errors accepted by
/// `retryable` are retried, any other error ends the poll.
pub struct WritePoll<M> {
    pub option: RetryOption,
    /// `check(plan, read)`: whether the read reflects the plan.
    pub check: Option<fn(&M, &M) -> bool>,
    pub retryable: fn(&Error) -> bool,
}

impl<M> WritePoll<M> {
    pub fn new(option: RetryOption) -> Self {
        Self {
            option,
            check: None,
            retryable: |_| false,
        }
    }

    pub fn check(mut self, check: fn(&M, &M) -> bool) -> Self {
        self.check = Some(check);
        self
    }

    pub fn retry_when(mut self, retryable: fn(&Error) -> bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Read-back poll after a delete.
///
/// Each read outcome is classified: `terminal` ends the poll successfully,
/// `retryable` tries again, anything else fails the delete.
pub struct DeletePoll<M> {
    pub option: RetryOption,
    pub terminal: fn(&Result<M>) -> bool,
    pub retryable: fn(&Result<M>) -> bool,
}

impl<M> DeletePoll<M> {
    /// Poll until reads report not-found; a successful read means the
    /// object is still visible and is retried.
    pub fn until_gone(option: RetryOption) -> Self {
        Self {
            option,
            terminal: |read| matches!(read, Err(e) if e.is_not_found()),
            retryable: Result::is_ok,
        }
    }
}

/// Migration of stored state from `prior_version` to the next version.
#[derive(Clone, Copy)]
pub struct StateUpgrader {
    pub prior_version: i64,
    pub upgrade: fn(Value) -> Result<Value>,
}

impl fmt::Debug for StateUpgrader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateUpgrader")
            .field("prior_version", &self.prior_version)
            .finish_non_exhaustive()
    }
}

/// One identity attribute and the state attribute it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityField {
    /// Name in the identity object.
    pub name: &'static str,
    /// Name of the state attribute holding the value.
    pub state_attribute: &'static str,
    pub description: &'static str,
}

impl IdentityField {
    pub const fn new(name: &'static str, state_attribute: &'static str) -> Self {
        Self {
            name,
            state_attribute,
            description: "",
        }
    }

    pub const fn described(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// Core trait for managed resources
///
/// Write operations may return `None` to let the kernel seed state from the
/// plan; the post-write poll then replaces it with what the service reports.
/// `read` reports a vanished object with a not-found error, which the kernel
/// turns into dropping the resource from state.
pub trait Resource: Send + Sync {
    /// Typed plan and state.
    type Model: Serialize + DeserializeOwned + Clone + fmt::Debug + Send;

    /// Resource type name, e.g. `azuredevops_project`.
    fn resource_type(&self) -> &'static str;

    /// Attribute schema, without the `timeouts` block.
    fn schema(&self) -> Schema;

    /// Identity attributes, in import-id order.
    fn identity_fields(&self) -> Vec<IdentityField>;

    /// Split an import id into one value per identity field.
    ///
    /// A single field takes the whole id; otherwise the id must have one
    /// `/`-separated segment per field.
    fn parse_import_id(&self, id: &str) -> Result<Vec<String>> {
        let fields = self.identity_fields();
        if fields.len() == 1 {
            return Ok(vec![id.to_string()]);
        }
        let parts: Vec<&str> = id.split('/').collect();
        if parts.len() != fields.len() || parts.iter().any(|p| p.is_empty()) {
            let expected: Vec<_> = fields.iter().map(|f| format!("<{}>", f.name)).collect();
            return Err(Error::input(format!(
                "invalid import id {id:?}, expected {}",
                expected.join("/")
            )));
        }
        Ok(parts.into_iter().map(ToString::to_string).collect())
    }

    /// Default timeout per operation.
    fn timeouts(&self) -> ResourceTimeout {
        ResourceTimeout::default()
    }

    fn create(&self, ctx: &Context, plan: &Self::Model) -> Result<Option<Self::Model>>;

    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Self::Model>;

    fn update(
        &self,
        ctx: &Context,
        plan: &Self::Model,
        prior: &Self::Model,
    ) -> Result<Option<Self::Model>>;

    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()>;

    /// Complete the state built from an import id before the first read.
    fn resolve_import(&self, _ctx: &Context, state: Map<String, Value>) -> Result<Map<String, Value>> {
        Ok(state)
    }

    /// Read-back poll after the given write step.
    fn write_poll(&self, _operation: WriteOperation) -> Option<WritePoll<Self::Model>> {
        None
    }

    fn should_post_create(&self, _plan: &Self::Model) -> bool {
        false
    }

    /// Second write step after create, e.g. settings the create call ignores.
    fn post_create(&self, _ctx: &Context, _plan: &Self::Model, _state: &Self::Model) -> Result<()> {
        Ok(())
    }

    fn should_post_update(&self, _plan: &Self::Model, _prior: &Self::Model) -> bool {
        false
    }

    fn post_update(&self, _ctx: &Context, _plan: &Self::Model, _state: &Self::Model) -> Result<()> {
        Ok(())
    }

    fn delete_poll(&self) -> Option<DeletePoll<Self::Model>> {
        None
    }

    /// Upgraders from every prior schema version.
    fn upgraders(&self) -> Vec<StateUpgrader> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Model {
        id: String,
    }

    struct Membership;

    impl Resource for Membership {
        type Model = Model;

        fn resource_type(&self) -> &'static str {
            "membership"
        }

        fn schema(&self) -> Schema {
            Schema::new().attribute("id", Attribute::computed(AttributeType::String))
        }

        fn identity_fields(&self) -> Vec<IdentityField> {
            vec![
                IdentityField::new("group_id", "group_id"),
                IdentityField::new("member_id", "member_id"),
            ]
        }

        fn create(&self, _: &Context, _: &Model) -> Result<Option<Model>> {
            Ok(None)
        }

        fn read(&self, _: &Context, state: &Model) -> Result<Model> {
            Ok(state.clone())
        }

        fn update(&self, _: &Context, _: &Model, _: &Model) -> Result<Option<Model>> {
            Ok(None)
        }

        fn delete(&self, _: &Context, _: &Model) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_parse_import_id_splits_segments() {
        let parts = Membership.parse_import_id("g1/m1").unwrap();
        assert_eq!(parts, vec!["g1", "m1"]);
    }

    #[test]
    fn test_parse_import_id_rejects_wrong_arity() {
        let err = Membership.parse_import_id("g1").unwrap_err();
        assert!(err.to_string().contains("<group_id>/<member_id>"));
        assert!(Membership.parse_import_id("g1/").is_err());
    }

    #[test]
    fn test_until_gone_classifiers() {
        let poll: DeletePoll<Model> = DeletePoll::until_gone(RetryOption::default());
        let gone: Result<Model> = Err(Error::not_found("gone"));
        let present: Result<Model> = Ok(Model::default());
        let failed: Result<Model> = Err(Error::input("bad"));
        assert!((poll.terminal)(&gone));
        assert!((poll.retryable)(&present));
        assert!(!(poll.terminal)(&failed) && !(poll.retryable)(&failed));
    }

    #[test]
    fn test_write_operation_display() {
        assert_eq!(WriteOperation::PostCreate.to_string(), "PostCreate");
    }
}
