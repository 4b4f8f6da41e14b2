//! `azuredevops_group`: an Azure DevOps group, either created in the
//! organization (or a project scope) or linked to an existing AAD group.

use crate::client::Clients;
use crate::converter::{non_empty, or_empty, parse_uuid};
use azdo_api::GraphClient;
use azdo_api::models::JsonPatchOperation;
use azdo_api::models::graph::{GraphGroup, GroupCreationContext};
use declarative::{
    Attribute, AttributeType, BoxedResource, Context, Error, IdentityField, Resource, ResourceWrapper, Result,
    RetryOption, Schema, WriteOperation, WritePoll,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const RESOURCE_TYPE: &str = "azuredevops_group";

const PROJECT_DOMAIN_PREFIX: &str = "vstfs:///Classification/TeamProject/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupModel {
    pub id: String,
    pub scope: String,
    pub origin_id: String,
    pub mail: String,
    pub display_name: String,
    pub description: String,
    pub url: String,
    pub origin: String,
    pub subject_kind: String,
    pub domain: String,
    pub principal_name: String,
    pub descriptor: String,
    pub storage_key: String,
}

/// Project id encoded in a group domain, if the domain is a project scope.
pub fn domain_project_id(domain: &str) -> Option<String> {
    let last = domain.strip_prefix(PROJECT_DOMAIN_PREFIX)?.rsplit('/').next()?;
    Uuid::parse_str(last).ok().map(|id| id.to_string())
}

fn names_converged(plan: &GroupModel, read: &GroupModel) -> bool {
    (plan.display_name.is_empty() || plan.display_name == read.display_name) && plan.description == read.description
}

pub struct GroupResource {
    graph: Arc<dyn GraphClient>,
    poll_interval: Duration,
}

impl GroupResource {
    pub fn new(clients: &Clients) -> Self {
        Self {
            graph: clients.graph.clone(),
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn boxed(clients: &Clients) -> BoxedResource {
        ResourceWrapper::boxed(Self::new(clients))
    }

    fn creation_context(plan: &GroupModel) -> Result<GroupCreationContext> {
        if !plan.origin_id.is_empty() {
            for (attribute, value) in [("mail", &plan.mail), ("display_name", &plan.display_name)] {
                if !value.is_empty() {
                    return Err(Error::attribute(
                        attribute,
                        format!("Unable to create group with invalid parameters: {attribute}"),
                    ));
                }
            }
            return Ok(GroupCreationContext::OriginId {
                origin_id: plan.origin_id.clone(),
            });
        }
        if !plan.mail.is_empty() {
            if !plan.display_name.is_empty() {
                return Err(Error::attribute(
                    "display_name",
                    "Unable to create group with invalid parameters: display_name",
                ));
            }
            return Ok(GroupCreationContext::MailAddress {
                mail_address: plan.mail.clone(),
            });
        }
        if !plan.display_name.is_empty() {
            return Ok(GroupCreationContext::Vsts {
                display_name: plan.display_name.clone(),
                description: non_empty(&plan.description),
            });
        }
        Err(Error::input(
            "one of origin_id, mail or display_name is required to create a group",
        ))
    }

    fn scope_descriptor(&self, ctx: &Context, scope: &str) -> Result<Option<String>> {
        if scope.is_empty() {
            return Ok(None);
        }
        let storage_key = parse_uuid("scope", scope)?;
        let descriptor = self
            .graph
            .get_descriptor(ctx, storage_key)
            .map_err(|e| Error::from(e).context(format!("resolving the descriptor of scope {scope}")))?;
        descriptor
            .value
            .map(Some)
            .ok_or_else(|| Error::internal(format!("scope {scope} has no descriptor")))
    }

    fn flatten(&self, ctx: &Context, group: GraphGroup, state: &GroupModel) -> Result<GroupModel> {
        let descriptor = group
            .descriptor
            .ok_or_else(|| Error::internal(format!("group {} was returned without a descriptor", state.id)))?;
        let storage_key = self
            .graph
            .get_storage_key(ctx, &descriptor)
            .map_err(|e| Error::from(e).context(format!("reading the storage key of group {descriptor}")))?
            .value
            .map(|key| key.to_string())
            .unwrap_or_default();
        let domain = group.domain.unwrap_or_default();
        Ok(GroupModel {
            id: descriptor.clone(),
            scope: domain_project_id(&domain).unwrap_or_else(|| state.scope.clone()),
            origin_id: or_empty(group.origin_id.as_deref()),
            mail: or_empty(group.mail_address.as_deref()),
            display_name: or_empty(group.display_name.as_deref()),
            description: or_empty(group.description.as_deref()),
            url: or_empty(group.url.as_deref()),
            origin: or_empty(group.origin.as_deref()),
            subject_kind: or_empty(group.subject_kind.as_deref()),
            domain,
            principal_name: or_empty(group.principal_name.as_deref()),
            descriptor,
            storage_key,
        })
    }
}

impl Resource for GroupResource {
    type Model = GroupModel;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .description("Manages a group within Azure DevOps.")
            .attribute("id", Attribute::computed(AttributeType::String))
            .attribute(
                "scope",
                Attribute::optional_computed(AttributeType::String)
                    .force_new()
                    .description("The scope (project id) in which the group is created."),
            )
            .attribute(
                "origin_id",
                Attribute::optional_computed(AttributeType::String)
                    .force_new()
                    .description("The OriginID as a reference to a group from an external AD or AAD backed provider."),
            )
            .attribute(
                "mail",
                Attribute::optional_computed(AttributeType::String)
                    .force_new()
                    .description("The mail address as a reference to an existing group from an external AD or AAD backed provider."),
            )
            .attribute("display_name", Attribute::optional_computed(AttributeType::String))
            .attribute("description", Attribute::optional(AttributeType::String))
            .attribute("url", Attribute::computed(AttributeType::String))
            .attribute("origin", Attribute::computed(AttributeType::String))
            .attribute("subject_kind", Attribute::computed(AttributeType::String))
            .attribute("domain", Attribute::computed(AttributeType::String))
            .attribute("principal_name", Attribute::computed(AttributeType::String))
            .attribute("descriptor", Attribute::computed(AttributeType::String))
            .attribute("storage_key", Attribute::computed(AttributeType::String))
    }

    fn identity_fields(&self) -> Vec<IdentityField> {
        vec![IdentityField::new("id", "id").described("Group descriptor")]
    }

    fn create(&self, ctx: &Context, plan: &Self::Model) -> Result<Option<Self::Model>> {
        let creation = Self::creation_context(plan)?;
        if !plan.scope.is_empty() && !matches!(creation, GroupCreationContext::Vsts { .. }) {
            return Err(Error::attribute(
                "scope",
                "Unable to create group with invalid parameters: scope",
            ));
        }
        let scope = self.scope_descriptor(ctx, &plan.scope)?;
        let group = self
            .graph
            .create_group(ctx, &creation, scope.as_deref())
            .map_err(|e| Error::from(e).context("creating group in Azure DevOps"))?;
        let descriptor = group
            .descriptor
            .ok_or_else(|| Error::internal("DevOps REST API returned group object without descriptor"))?;
        debug!("{RESOURCE_TYPE}: created group {descriptor}");

        Ok(Some(GroupModel {
            id: descriptor.clone(),
            descriptor,
            ..plan.clone()
        }))
    }

    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Self::Model> {
        let group = self
            .graph
            .get_group(ctx, &state.id)
            .map_err(|e| Error::from(e).context(format!("reading group {}", state.id)))?;
        if group.is_deleted == Some(true) {
            return Err(Error::not_found(format!("group {} is deleted", state.id)));
        }
        self.flatten(ctx, group, state)
    }

    fn update(&self, ctx: &Context, plan: &Self::Model, prior: &Self::Model) -> Result<Option<Self::Model>> {
        let mut patch = Vec::new();
        if !plan.display_name.is_empty() && plan.display_name != prior.display_name {
            patch.push(JsonPatchOperation::replace("/displayName", plan.display_name.clone()));
        }
        if plan.description != prior.description {
            patch.push(JsonPatchOperation::replace("/description", plan.description.clone()));
        }
        if patch.is_empty() {
            return Ok(Some(prior.clone()));
        }
        self.graph
            .update_group(ctx, &prior.id, &patch)
            .map_err(|e| Error::from(e).context(format!("updating group {}", prior.id)))?;
        debug!("{RESOURCE_TYPE}: patched {} attribute(s) of {}", patch.len(), prior.id);

        Ok(Some(GroupModel {
            display_name: if plan.display_name.is_empty() {
                prior.display_name.clone()
            } else {
                plan.display_name.clone()
            },
            description: plan.description.clone(),
            ..prior.clone()
        }))
    }

    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()> {
        self.graph
            .delete_group(ctx, &state.id)
            .map_err(|e| Error::from(e).context(format!("deleting group {}", state.id)))
    }

    fn write_poll(&self, operation: WriteOperation) -> Option<WritePoll<Self::Model>> {
        match operation {
            WriteOperation::Update => {
                Some(WritePoll::new(RetryOption::simple(5, self.poll_interval)).check(names_converged))
            }
            _ => None,
        }
    }
}
