//! Generic lifecycle of one principal's permissions on one ACL token.
//!
//! The target `T` owns the attributes that address the secured object and
//! turns them into a namespace id and token; everything else (principal,
//! permission map, replace flag, read-back and removal) lives here.

use crate::client::Clients;
use crate::security::{AclEngine, PermissionType, PrincipalPermission, SetPrincipalPermission};
use declarative::{
    Attribute, AttributeType, BoxedResource, Context, Error, IdentityField, Resource, ResourceTimeout,
    ResourceWrapper, Result, RetryOption, Schema, WriteOperation, WritePoll,
};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;
use uuid::Uuid;

/// How a permission resource addresses the object it secures.
pub trait PermissionTarget:
    Serialize + DeserializeOwned + Clone + Default + Debug + PartialEq + Send + Sync + 'static
{
    const RESOURCE_TYPE: &'static str;
    const DESCRIPTION: &'static str;

    /// Add the attributes of the target.
    fn schema(schema: Schema) -> Schema;

    fn namespace_id(&self) -> Result<Uuid>;

    fn token(&self, ctx: &Context, clients: &Clients) -> Result<String>;

    /// Recover the target from a token, for import. `None` when the token
    /// cannot be mapped back without lookups.
    fn from_token(_token: &str) -> Option<Self> {
        None
    }
}

fn replace_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionState<T> {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub target: T,
    #[serde(default)]
    pub principal: String,
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionType>,
    #[serde(default = "replace_default")]
    pub replace: bool,
}

impl<T: Default> Default for PermissionState<T> {
    fn default() -> Self {
        Self {
            id: String::new(),
            target: T::default(),
            principal: String::new(),
            permissions: BTreeMap::new(),
            replace: true,
        }
    }
}

fn state_id(token: &str, principal: &str) -> String {
    format!("{token}/{principal}")
}

/// Whether the read reflects every declared action.
///
/// A merge write cannot clear an action back to not set, so `notset`
/// entries only count when the write replaced the entry.
fn permissions_converged<T>(plan: &PermissionState<T>, read: &PermissionState<T>) -> bool {
    plan.permissions.iter().all(|(action, wanted)| {
        (!plan.replace && *wanted == PermissionType::NotSet) || read.permissions.get(action) == Some(wanted)
    })
}

/// Restrict observed permissions to the declared actions, keeping the
/// declared spelling of each action name.
fn declared_only(
    declared: &BTreeMap<String, PermissionType>,
    observed: &BTreeMap<String, PermissionType>,
) -> BTreeMap<String, PermissionType> {
    declared
        .keys()
        .filter_map(|action| {
            observed
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(action))
                .map(|(_, value)| (action.clone(), *value))
        })
        .collect()
}

pub struct PermissionResource<T> {
    clients: Clients,
    poll_interval: Duration,
    poll_timeout: Duration,
    target: PhantomData<fn() -> T>,
}

impl<T: PermissionTarget> PermissionResource<T> {
    pub fn new(clients: &Clients) -> Self {
        Self {
            clients: clients.clone(),
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(60 * 60),
            target: PhantomData,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn boxed(clients: &Clients) -> BoxedResource {
        ResourceWrapper::boxed(Self::new(clients))
    }

    fn engine(&self, target: &T) -> Result<AclEngine> {
        Ok(AclEngine::new(&self.clients, target.namespace_id()?))
    }

    fn write(
        &self,
        ctx: &Context,
        state: &PermissionState<T>,
        permissions: BTreeMap<String, PermissionType>,
        replace: bool,
    ) -> Result<String> {
        let token = state.target.token(ctx, &self.clients)?;
        let entry = SetPrincipalPermission {
            replace,
            principal_permission: PrincipalPermission {
                subject_descriptor: state.principal.clone(),
                permissions,
            },
        };
        self.engine(&state.target)?
            .set_principal_permissions(ctx, &token, &[entry])
            .map_err(|e| e.context(format!("setting permissions of {} on {token}", state.principal)))?;
        debug!("{}: wrote permissions of {} on {token}", T::RESOURCE_TYPE, state.principal);
        Ok(token)
    }
}

impl<T: PermissionTarget> Resource for PermissionResource<T> {
    type Model = PermissionState<T>;

    fn resource_type(&self) -> &'static str {
        T::RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        let schema = Schema::new()
            .description(T::DESCRIPTION)
            .attribute("id", Attribute::computed(AttributeType::String))
            .attribute(
                "principal",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .description("The principal to assign the permissions."),
            )
            .attribute(
                "permissions",
                Attribute::required(AttributeType::Map(Box::new(AttributeType::String)))
                    .one_of(&PermissionType::VALUES)
                    .case_insensitive()
                    .description("the permissions to assign"),
            )
            .attribute(
                "replace",
                Attribute::optional(AttributeType::Bool)
                    .default_value(true)
                    .description("Replace (true) or merge (false) the permissions."),
            );
        T::schema(schema)
    }

    fn identity_fields(&self) -> Vec<IdentityField> {
        vec![IdentityField::new("id", "id").described("<token>/<principal descriptor>")]
    }

    fn timeouts(&self) -> ResourceTimeout {
        ResourceTimeout {
            create: Duration::from_secs(10 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(10 * 60),
        }
    }

    fn create(&self, ctx: &Context, plan: &Self::Model) -> Result<Option<Self::Model>> {
        let token = self.write(ctx, plan, plan.permissions.clone(), plan.replace)?;
        Ok(Some(PermissionState {
            id: state_id(&token, &plan.principal),
            ..plan.clone()
        }))
    }

    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Self::Model> {
        let token = state.target.token(ctx, &self.clients)?;
        let principals = self
            .engine(&state.target)?
            .get_principal_permissions(ctx, &token, std::slice::from_ref(&state.principal))
            .map_err(|e| e.context(format!("reading permissions of {} on {token}", state.principal)))?;

        let observed = match principals {
            Some(principals) => principals
                .into_iter()
                .find(|p| p.subject_descriptor == state.principal)
                .map(|p| p.permissions)
                .unwrap_or_default(),
            None => {
                debug!("{}: no ACL on {token}", T::RESOURCE_TYPE);
                BTreeMap::new()
            }
        };

        Ok(PermissionState {
            id: state_id(&token, &state.principal),
            permissions: declared_only(&state.permissions, &observed),
            ..state.clone()
        })
    }

    fn update(&self, ctx: &Context, plan: &Self::Model, _prior: &Self::Model) -> Result<Option<Self::Model>> {
        self.create(ctx, plan)
    }

    /// Reset every declared action to not set.
    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()> {
        let cleared = state
            .permissions
            .keys()
            .map(|action| (action.clone(), PermissionType::NotSet))
            .collect();
        self.write(ctx, state, cleared, true).map(|_| ())
    }

    fn write_poll(&self, operation: WriteOperation) -> Option<WritePoll<Self::Model>> {
        match operation {
            WriteOperation::Create | WriteOperation::Update => Some(
                WritePoll::new(RetryOption::simple(1, self.poll_interval).timeout(self.poll_timeout))
                    .check(permissions_converged),
            ),
            _ => None,
        }
    }

    /// Split `<token>/<principal>` and recover the target from the token.
    fn resolve_import(&self, _ctx: &Context, mut state: Map<String, Value>) -> Result<Map<String, Value>> {
        let id = state
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let (token, principal) = id
            .rsplit_once('/')
            .filter(|(token, principal)| !token.is_empty() && !principal.is_empty())
            .ok_or_else(|| Error::input(format!("invalid id format, expect=\"<token>/<principal>\", got {id:?}")))?;
        let target = T::from_token(token).ok_or_else(|| {
            Error::input(format!("{} cannot be imported from token {token}", T::RESOURCE_TYPE))
        })?;
        let Value::Object(fields) = serde_json::to_value(target)? else {
            return Err(Error::internal("permission target is not an object"));
        };
        state.extend(fields);
        state.insert("principal".to_string(), Value::String(principal.to_string()));
        Ok(state)
    }
}
