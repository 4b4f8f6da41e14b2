//! Lifecycle kernel shared by every resource
//!
//! [`ResourceWrapper`] adapts a typed [`Resource`] to the object-safe
//! [`ManagedResource`] interface the host runtime drives with JSON values.
//! Per operation it resolves the timeout, validates the plan, calls the
//! resource, reads the object back and reports failures as diagnostics.

use crate::context::{CancellationToken, Context, Operation};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::poll::{RetryError, RetryOption, retry};
use crate::resource::{Resource, WriteOperation};
use crate::schema::{IdentityAttribute, IdentitySchema, Schema};
use crate::timeouts::{TIMEOUTS_ATTRIBUTE, Timeouts};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub plan: Value,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub state: Value,
    pub identity: Option<Value>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub plan: Value,
    pub prior_state: Value,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub state: Value,
    pub cancel: CancellationToken,
}

/// Import by id string or by identity object.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub id: Option<String>,
    pub identity: Option<Value>,
    pub cancel: CancellationToken,
}

/// Outcome of a lifecycle operation. `state: None` removes the resource.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    pub diagnostics: Diagnostics,
}

impl Response {
    fn failed(state: Option<Value>, summary: &str, err: &Error) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error(summary, err);
        Self {
            state,
            identity: None,
            diagnostics,
        }
    }
}

/// Object-safe resource interface driven by the host.
pub trait ManagedResource: Send + Sync {
    fn resource_type(&self) -> &'static str;
    /// Schema including the `timeouts` block.
    fn schema(&self) -> Schema;
    fn identity_schema(&self) -> IdentitySchema;
    fn create(&self, request: CreateRequest) -> Response;
    fn read(&self, request: ReadRequest) -> Response;
    fn update(&self, request: UpdateRequest) -> Response;
    fn delete(&self, request: DeleteRequest) -> Response;
    fn import_state(&self, request: ImportRequest) -> Response;
    /// Migrate raw state stored at `version` to the current schema version.
    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn ManagedResource>;

/// Kernel around one typed resource.
pub struct ResourceWrapper<R> {
    inner: R,
}

impl<R: Resource + 'static> ResourceWrapper<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn boxed(inner: R) -> BoxedResource {
        Box::new(Self::new(inner))
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn context(&self, operation: Operation, source: &Value, cancel: CancellationToken) -> Result<Context> {
        let timeout = Timeouts::from_value(source)?.resolve(operation, &self.inner.timeouts())?;
        Ok(Context::new(self.inner.resource_type(), operation, timeout, cancel))
    }

    fn validate(&self, plan: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for err in self.inner.schema().validate(plan) {
            diagnostics.add_error("Invalid configuration", &err);
        }
        diagnostics
    }

    /// Encode a model, carrying the `timeouts` block over from `source`.
    fn encode(&self, model: &R::Model, source: &Value) -> Result<Value> {
        let mut value = serde_json::to_value(model)?;
        if let (Value::Object(map), Some(timeouts)) = (&mut value, source.get(TIMEOUTS_ATTRIBUTE)) {
            map.insert(TIMEOUTS_ATTRIBUTE.to_string(), timeouts.clone());
        }
        Ok(value)
    }

    fn identity(&self, state: &Value) -> Value {
        let identity: Map<String, Value> = self
            .inner
            .identity_fields()
            .into_iter()
            .map(|field| {
                let value = state.get(field.state_attribute).cloned().unwrap_or(Value::Null);
                (field.name.to_string(), value)
            })
            .collect();
        Value::Object(identity)
    }

    /// Read the object back after `operation` until the configured poll is
    /// satisfied; without a poll this is a single read.
    fn poll_after(
        &self,
        ctx: &Context,
        operation: WriteOperation,
        plan: &R::Model,
        state: &R::Model,
    ) -> Result<R::Model> {
        let poll = self.inner.write_poll(operation);
        let (option, check, retryable) = match &poll {
            Some(poll) => (poll.option.clone(), poll.check, poll.retryable),
            None => (RetryOption::until_deadline(), None, never_retry as fn(&Error) -> bool),
        };
        log::debug!(
            "{}: Start to poll the resource (after {}, streak {})",
            self.inner.resource_type(),
            operation,
            option.streak
        );

        let mut latest = None;
        retry(ctx, &option, || match self.inner.read(ctx, state) {
            Ok(read) => {
                let matches = check.is_none_or(|check| check(plan, &read));
                latest = Some(read);
                if matches {
                    Ok(())
                } else {
                    Err(RetryError::Retryable(Error::internal(
                        "the read value does not match the planned value",
                    )))
                }
            }
            Err(err) if !err.category().is_fatal() && retryable(&err) => Err(RetryError::Retryable(err)),
            Err(err) => Err(RetryError::NonRetryable(err)),
        })
        .map_err(|e| e.context(format!("Polling failed (after {operation})")))?;

        latest.ok_or_else(|| Error::internal(format!("no read completed after {operation}")))
    }

    fn poll_delete(&self, ctx: &Context, state: &R::Model) -> Result<()> {
        let Some(poll) = self.inner.delete_poll() else {
            return Ok(());
        };
        retry(ctx, &poll.option, || {
            let read = self.inner.read(ctx, state);
            if (poll.terminal)(&read) {
                return Ok(());
            }
            if (poll.retryable)(&read) {
                let err = match read {
                    Err(err) => err,
                    Ok(_) => Error::internal("the resource is still visible"),
                };
                return Err(RetryError::Retryable(err));
            }
            Err(RetryError::NonRetryable(match read {
                Err(err) => err,
                Ok(_) => Error::internal("the resource still exists after delete"),
            }))
        })
        .map_err(|e| e.context("Post delete poll"))
    }

    fn post_write(
        &self,
        ctx: &Context,
        operation: WriteOperation,
        plan: &R::Model,
        state: &R::Model,
    ) -> Result<R::Model> {
        match operation {
            WriteOperation::PostCreate => self.inner.post_create(ctx, plan, state)?,
            WriteOperation::PostUpdate => self.inner.post_update(ctx, plan, state)?,
            _ => {}
        }
        self.poll_after(ctx, operation, plan, state)
    }

    fn respond(&self, model: &R::Model, source: &Value, diagnostics: Diagnostics) -> Response {
        match self.encode(model, source) {
            Ok(state) => Response {
                identity: Some(self.identity(&state)),
                state: Some(state),
                diagnostics,
            },
            Err(err) => {
                let mut response = Response::failed(None, "Encoding state", &err);
                response.diagnostics.extend(diagnostics);
                response
            }
        }
    }
}

fn never_retry(_: &Error) -> bool {
    false
}

fn decode<M: DeserializeOwned>(value: &Value, what: &str) -> Result<M> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::internal(format!("decoding {what}: {e}")))
}

impl<R: Resource + 'static> ManagedResource for ResourceWrapper<R> {
    fn resource_type(&self) -> &'static str {
        self.inner.resource_type()
    }

    fn schema(&self) -> Schema {
        self.inner
            .schema()
            .attribute(TIMEOUTS_ATTRIBUTE, self.inner.timeouts().block())
    }

    fn identity_schema(&self) -> IdentitySchema {
        IdentitySchema {
            attributes: self
                .inner
                .identity_fields()
                .into_iter()
                .map(|field| IdentityAttribute {
                    name: field.name.to_string(),
                    required_for_import: true,
                    description: field.description.to_string(),
                })
                .collect(),
        }
    }

    fn create(&self, request: CreateRequest) -> Response {
        let ctx = match self.context(Operation::Create, &request.plan, request.cancel) {
            Ok(ctx) => ctx,
            Err(err) => return Response::failed(None, "Invalid timeouts", &err),
        };
        let diagnostics = self.validate(&request.plan);
        if diagnostics.has_error() {
            return Response {
                diagnostics,
                ..Response::default()
            };
        }
        let plan: R::Model = match decode(&request.plan, "plan") {
            Ok(plan) => plan,
            Err(err) => return Response::failed(None, "", &err),
        };

        log::info!("{}: Start to create the resource", self.inner.resource_type());
        let created = match self.inner.create(&ctx, &plan) {
            Ok(created) => created,
            Err(err) => return Response::failed(None, "", &err),
        };
        let seeded = created.unwrap_or_else(|| plan.clone());

        let state = match self.poll_after(&ctx, WriteOperation::Create, &plan, &seeded) {
            Ok(state) => state,
            Err(err) => {
                let mut response = self.respond(&seeded, &request.plan, Diagnostics::new());
                response.diagnostics.add_error("", &err);
                return response;
            }
        };

        if self.inner.should_post_create(&plan) {
            log::debug!("{}: running post-create step", self.inner.resource_type());
            match self.post_write(&ctx, WriteOperation::PostCreate, &plan, &state) {
                Ok(after) => return self.respond(&after, &request.plan, diagnostics),
                Err(err) => {
                    let mut response = self.respond(&state, &request.plan, Diagnostics::new());
                    response.diagnostics.add_error("", &err);
                    return response;
                }
            }
        }
        log::info!("{}: Finish to create the resource", self.inner.resource_type());
        self.respond(&state, &request.plan, diagnostics)
    }

    fn read(&self, request: ReadRequest) -> Response {
        let ctx = match self.context(Operation::Read, &request.state, request.cancel) {
            Ok(ctx) => ctx,
            Err(err) => return Response::failed(Some(request.state), "Invalid timeouts", &err),
        };
        let state: R::Model = match decode(&request.state, "state") {
            Ok(state) => state,
            Err(err) => return Response::failed(Some(request.state), "", &err),
        };

        match self.inner.read(&ctx, &state) {
            Ok(read) => self.respond(&read, &request.state, Diagnostics::new()),
            Err(err) if err.is_not_found() => {
                log::warn!(
                    "{} no longer exists, removing it from state: {}",
                    self.inner.resource_type(),
                    err
                );
                Response {
                    state: None,
                    identity: request.identity.or_else(|| Some(self.identity(&request.state))),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(err) => Response::failed(Some(request.state), "", &err),
        }
    }

    fn update(&self, request: UpdateRequest) -> Response {
        let prior_value = request.prior_state;
        let ctx = match self.context(Operation::Update, &request.plan, request.cancel) {
            Ok(ctx) => ctx,
            Err(err) => return Response::failed(Some(prior_value), "Invalid timeouts", &err),
        };
        let diagnostics = self.validate(&request.plan);
        if diagnostics.has_error() {
            return Response {
                state: Some(prior_value),
                identity: None,
                diagnostics,
            };
        }
        let decoded = decode::<R::Model>(&request.plan, "plan")
            .and_then(|plan| Ok((plan, decode::<R::Model>(&prior_value, "prior state")?)));
        let (plan, prior) = match decoded {
            Ok(pair) => pair,
            Err(err) => return Response::failed(Some(prior_value), "", &err),
        };

        log::info!("{}: Start to update the resource", self.inner.resource_type());
        let updated = match self.inner.update(&ctx, &plan, &prior) {
            Ok(updated) => updated,
            Err(err) => return Response::failed(Some(prior_value), "", &err),
        };
        let seeded = updated.unwrap_or_else(|| plan.clone());

        let state = match self.poll_after(&ctx, WriteOperation::Update, &plan, &seeded) {
            Ok(state) => state,
            Err(err) => {
                let mut response = self.respond(&seeded, &request.plan, Diagnostics::new());
                response.diagnostics.add_error("", &err);
                return response;
            }
        };

        if self.inner.should_post_update(&plan, &prior) {
            log::debug!("{}: running post-update step", self.inner.resource_type());
            match self.post_write(&ctx, WriteOperation::PostUpdate, &plan, &state) {
                Ok(after) => return self.respond(&after, &request.plan, diagnostics),
                Err(err) => {
                    let mut response = self.respond(&state, &request.plan, Diagnostics::new());
                    response.diagnostics.add_error("", &err);
                    return response;
                }
            }
        }
        log::info!("{}: Finish to update the resource", self.inner.resource_type());
        self.respond(&state, &request.plan, diagnostics)
    }

    fn delete(&self, request: DeleteRequest) -> Response {
        let ctx = match self.context(Operation::Delete, &request.state, request.cancel) {
            Ok(ctx) => ctx,
            Err(err) => return Response::failed(Some(request.state), "Invalid timeouts", &err),
        };
        let state: R::Model = match decode(&request.state, "state") {
            Ok(state) => state,
            Err(err) => return Response::failed(Some(request.state), "", &err),
        };

        log::info!("{}: Start to delete the resource", self.inner.resource_type());
        if let Err(err) = self.inner.delete(&ctx, &state) {
            return Response::failed(Some(request.state), "", &err);
        }
        if let Err(err) = self.poll_delete(&ctx, &state) {
            return Response::failed(Some(request.state), "", &err);
        }
        log::info!("{}: Finish to delete the resource", self.inner.resource_type());
        Response::default()
    }

    fn import_state(&self, request: ImportRequest) -> Response {
        let ctx = match self.context(Operation::Import, &Value::Null, request.cancel) {
            Ok(ctx) => ctx,
            Err(err) => return Response::failed(None, "", &err),
        };
        let fields = self.inner.identity_fields();

        let values = match (&request.id, &request.identity) {
            (Some(id), _) => self.inner.parse_import_id(id),
            (None, Some(identity)) => fields
                .iter()
                .map(|field| match identity.get(field.name) {
                    Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                    _ => Err(Error::attribute(
                        field.name,
                        format!("identity attribute {:?} is required for import", field.name),
                    )),
                })
                .collect(),
            (None, None) => Err(Error::input("either an import id or an identity is required")),
        };
        let values = match values {
            Ok(values) => values,
            Err(err) => return Response::failed(None, "Invalid import identifier", &err),
        };

        let state: Map<String, Value> = fields
            .iter()
            .zip(values)
            .map(|(field, value)| (field.state_attribute.to_string(), Value::String(value)))
            .collect();
        match self.inner.resolve_import(&ctx, state) {
            Ok(state) => {
                let state = Value::Object(state);
                Response {
                    identity: Some(self.identity(&state)),
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(err) => Response::failed(None, "", &err),
        }
    }

    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value> {
        let current = self.inner.schema().version;
        if version > current {
            return Err(Error::internal(format!(
                "state version {version} is newer than schema version {current}"
            )));
        }
        let upgraders = self.inner.upgraders();
        (version..current).try_fold(state, |state, from| {
            let upgrader = upgraders
                .iter()
                .find(|u| u.prior_version == from)
                .ok_or_else(|| Error::internal(format!("no state upgrader from version {from}")))?;
            log::debug!(
                "{}: upgrading state from version {from}",
                self.inner.resource_type()
            );
            (upgrader.upgrade)(state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::poll::RetryOption;
    use crate::resource::{DeletePoll, IdentityField, StateUpgrader, WritePoll};
    use crate::schema::{Attribute, AttributeType};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Group {
        id: String,
        name: String,
        description: String,
    }

    /// In-memory remote whose reads lag behind writes by `lag` reads.
    #[derive(Default)]
    struct Remote {
        object: Option<Group>,
        lag: u32,
        reads: u32,
        deletes_visible_for: u32,
    }

    #[derive(Default)]
    struct FakeGroup {
        remote: Mutex<Remote>,
        post_create: bool,
        existing: bool,
    }

    impl Resource for FakeGroup {
        type Model = Group;

        fn resource_type(&self) -> &'static str {
            "fake_group"
        }

        fn schema(&self) -> Schema {
            Schema::new()
                .version(1)
                .attribute("name", Attribute::required(AttributeType::String))
                .attribute("description", Attribute::optional(AttributeType::String))
                .attribute("id", Attribute::computed(AttributeType::String))
        }

        fn identity_fields(&self) -> Vec<IdentityField> {
            vec![IdentityField::new("id", "id")]
        }

        fn create(&self, _: &Context, plan: &Group) -> Result<Option<Group>> {
            if self.existing {
                return Err(Error::already_exists("fake_group", "g-1"));
            }
            let mut remote = self.remote.lock().unwrap();
            let created = Group {
                id: "g-1".to_string(),
                ..plan.clone()
            };
            remote.object = Some(created.clone());
            Ok(Some(created))
        }

        fn read(&self, _: &Context, _: &Group) -> Result<Group> {
            let mut remote = self.remote.lock().unwrap();
            remote.reads += 1;
            if remote.deletes_visible_for > 0 {
                remote.deletes_visible_for -= 1;
                return Ok(Group::default());
            }
            if remote.lag > 0 {
                remote.lag -= 1;
                return Err(Error::not_found("not visible yet"));
            }
            remote.object.clone().ok_or_else(|| Error::not_found("group not found"))
        }

        fn update(&self, _: &Context, plan: &Group, _: &Group) -> Result<Option<Group>> {
            self.remote.lock().unwrap().object = Some(plan.clone());
            Ok(None)
        }

        fn delete(&self, _: &Context, _: &Group) -> Result<()> {
            self.remote.lock().unwrap().object = None;
            Ok(())
        }

        fn write_poll(&self, operation: WriteOperation) -> Option<WritePoll<Group>> {
            match operation {
                WriteOperation::Create => Some(
                    WritePoll::new(RetryOption::simple(1, Duration::from_millis(1)))
                        .retry_when(Error::is_not_found),
                ),
                WriteOperation::PostCreate => Some(
                    WritePoll::new(RetryOption::simple(2, Duration::from_millis(1)))
                        .check(|plan, read| plan.description == read.description),
                ),
                _ => None,
            }
        }

        fn should_post_create(&self, _: &Group) -> bool {
            self.post_create
        }

        fn post_create(&self, _: &Context, plan: &Group, _: &Group) -> Result<()> {
            let mut remote = self.remote.lock().unwrap();
            if let Some(object) = remote.object.as_mut() {
                object.description.clone_from(&plan.description);
            }
            Ok(())
        }

        fn delete_poll(&self) -> Option<DeletePoll<Group>> {
            Some(DeletePoll::until_gone(RetryOption::simple(
                1,
                Duration::from_millis(1),
            )))
        }

        fn upgraders(&self) -> Vec<StateUpgrader> {
            vec![StateUpgrader {
                prior_version: 0,
                upgrade: |mut state| {
                    if let Some(map) = state.as_object_mut()
                        && let Some(title) = map.remove("title")
                    {
                        map.insert("name".to_string(), title);
                    }
                    Ok(state)
                },
            }]
        }
    }

    fn wrap(resource: FakeGroup) -> ResourceWrapper<FakeGroup> {
        ResourceWrapper::new(resource)
    }

    #[test]
    fn test_schema_includes_timeouts_block() {
        let schema = wrap(FakeGroup::default()).schema();
        assert!(schema.get(TIMEOUTS_ATTRIBUTE).is_some());
        assert!(schema.get("name").is_some());
    }

    #[test]
    fn test_create_polls_until_visible_and_keeps_timeouts() {
        let resource = FakeGroup::default();
        resource.remote.lock().unwrap().lag = 2;
        let wrapper = wrap(resource);

        let response = wrapper.create(CreateRequest {
            plan: json!({"name": "devs", "timeouts": {"create": "1m"}}),
            ..CreateRequest::default()
        });

        assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["id"], "g-1");
        assert_eq!(state["timeouts"]["create"], "1m");
        assert_eq!(response.identity.unwrap(), json!({"id": "g-1"}));
        assert_eq!(wrapper.inner().remote.lock().unwrap().reads, 3);
    }

    #[test]
    fn test_create_rejects_invalid_plan_before_any_call() {
        let wrapper = wrap(FakeGroup::default());
        let response = wrapper.create(CreateRequest {
            plan: json!({"description": "no name"}),
            ..CreateRequest::default()
        });
        assert!(response.diagnostics.has_error());
        assert!(response.state.is_none());
        assert!(wrapper.inner().remote.lock().unwrap().object.is_none());
    }

    #[test]
    fn test_create_existing_object_suggests_import() {
        let wrapper = wrap(FakeGroup {
            existing: true,
            ..FakeGroup::default()
        });
        let response = wrapper.create(CreateRequest {
            plan: json!({"name": "devs"}),
            ..CreateRequest::default()
        });
        let diag = response.diagnostics.iter().next().unwrap();
        assert_eq!(
            diag.kind,
            DiagnosticKind::ImportAsExists {
                import_id: "g-1".to_string()
            }
        );
    }

    #[test]
    fn test_create_runs_post_create_and_its_poll() {
        let wrapper = wrap(FakeGroup {
            post_create: true,
            ..FakeGroup::default()
        });
        let response = wrapper.create(CreateRequest {
            plan: json!({"name": "devs", "description": "team"}),
            ..CreateRequest::default()
        });
        assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
        assert_eq!(response.state.unwrap()["description"], "team");
        // one read after create, two consecutive matches after post-create
        assert_eq!(wrapper.inner().remote.lock().unwrap().reads, 3);
    }

    #[test]
    fn test_read_not_found_drops_state() {
        let wrapper = wrap(FakeGroup::default());
        let response = wrapper.read(ReadRequest {
            state: json!({"id": "g-9", "name": "gone"}),
            ..ReadRequest::default()
        });
        assert!(response.state.is_none());
        assert!(response.diagnostics.is_empty());
        assert_eq!(response.identity.unwrap(), json!({"id": "g-9"}));
    }

    #[test]
    fn test_update_seeds_state_from_plan() {
        let wrapper = wrap(FakeGroup::default());
        let created = wrapper.create(CreateRequest {
            plan: json!({"name": "devs"}),
            ..CreateRequest::default()
        });
        let prior = created.state.unwrap();

        let response = wrapper.update(UpdateRequest {
            plan: json!({"id": "g-1", "name": "developers"}),
            prior_state: prior,
            ..UpdateRequest::default()
        });
        assert!(!response.diagnostics.has_error());
        assert_eq!(response.state.unwrap()["name"], "developers");
    }

    #[test]
    fn test_delete_waits_until_gone() {
        let resource = FakeGroup::default();
        resource.remote.lock().unwrap().deletes_visible_for = 2;
        let wrapper = wrap(resource);

        let response = wrapper.delete(DeleteRequest {
            state: json!({"id": "g-1", "name": "devs"}),
            ..DeleteRequest::default()
        });
        assert!(response.state.is_none());
        assert!(!response.diagnostics.has_error());
        assert_eq!(wrapper.inner().remote.lock().unwrap().reads, 3);
    }

    #[test]
    fn test_delete_poll_timeout_is_reported() {
        let resource = FakeGroup::default();
        resource.remote.lock().unwrap().deletes_visible_for = u32::MAX;
        let wrapper = wrap(resource);

        let response = wrapper.delete(DeleteRequest {
            state: json!({"id": "g-1", "name": "devs", "timeouts": {"delete": "50ms"}}),
            ..DeleteRequest::default()
        });
        assert!(response.state.is_some());
        let diag = response.diagnostics.iter().next().unwrap();
        assert_eq!(diag.summary, "Post delete poll");
    }

    #[test]
    fn test_import_by_id_and_identity() {
        let wrapper = wrap(FakeGroup::default());
        let by_id = wrapper.import_state(ImportRequest {
            id: Some("g-1".to_string()),
            ..ImportRequest::default()
        });
        assert_eq!(by_id.state.unwrap(), json!({"id": "g-1"}));

        let by_identity = wrapper.import_state(ImportRequest {
            identity: Some(json!({"id": "g-2"})),
            ..ImportRequest::default()
        });
        assert_eq!(by_identity.state.unwrap(), json!({"id": "g-2"}));

        let missing = wrapper.import_state(ImportRequest::default());
        assert!(missing.diagnostics.has_error());
    }

    #[test]
    fn test_upgrade_state_chains_upgraders() {
        let wrapper = wrap(FakeGroup::default());
        let upgraded = wrapper
            .upgrade_state(0, json!({"id": "g-1", "title": "devs"}))
            .unwrap();
        assert_eq!(upgraded, json!({"id": "g-1", "name": "devs"}));

        let current = wrapper.upgrade_state(1, json!({"id": "g-1"})).unwrap();
        assert_eq!(current, json!({"id": "g-1"}));

        assert!(wrapper.upgrade_state(2, json!({})).is_err());
    }
}
