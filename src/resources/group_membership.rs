//! `azuredevops_group_membership`: one member descriptor inside one group.
//!
//! Every attribute forces replacement, so there is no update path. Graph
//! membership writes become visible with a delay; create and delete both
//! read back until the change is observed consistently.

use crate::client::Clients;
use azdo_api::GraphClient;
use declarative::{
    Attribute, AttributeType, BoxedResource, Context, DeletePoll, Error, IdentityField, Resource, ResourceWrapper,
    Result, RetryOption, Schema, WriteOperation, WritePoll,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const RESOURCE_TYPE: &str = "azuredevops_group_membership";

const CONSISTENT_READS: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipModel {
    pub id: String,
    pub group_id: String,
    pub member_id: String,
}

impl MembershipModel {
    fn import_id(&self) -> String {
        format!("{}/{}", self.group_id, self.member_id)
    }
}

pub struct GroupMembershipResource {
    graph: Arc<dyn GraphClient>,
    poll_interval: Duration,
}

impl GroupMembershipResource {
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
}

impl Resource for GroupMembershipResource {
    type Model = MembershipModel;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .description("Manages the membership of one subject in a group.")
            .attribute("id", Attribute::computed(AttributeType::String))
            .attribute(
                "group_id",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .description("The descriptor of the group."),
            )
            .attribute(
                "member_id",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .description("The descriptor of the user or group to add."),
            )
    }

    fn identity_fields(&self) -> Vec<IdentityField> {
        vec![
            IdentityField::new("group_id", "group_id").described("Group descriptor"),
            IdentityField::new("member_id", "member_id").described("Member descriptor"),
        ]
    }

    fn parse_import_id(&self, id: &str) -> Result<Vec<String>> {
        match id.split_once('/') {
            Some((group, member)) if !group.is_empty() && !member.is_empty() && !member.contains('/') => {
                Ok(vec![group.to_string(), member.to_string()])
            }
            _ => Err(Error::input(format!(
                "invalid id format, expect=\"<group_id>/<member_id>\", got {id:?}"
            ))),
        }
    }

    fn create(&self, ctx: &Context, plan: &Self::Model) -> Result<Option<Self::Model>> {
        match self
            .graph
            .check_membership_existence(ctx, &plan.member_id, &plan.group_id)
        {
            Ok(()) => return Err(Error::already_exists(RESOURCE_TYPE, plan.import_id())),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(Error::from(e).context(format!(
                    "checking membership of {} in {}",
                    plan.member_id, plan.group_id
                )));
            }
        }
        self.graph
            .add_membership(ctx, &plan.member_id, &plan.group_id)
            .map_err(|e| {
                Error::from(e).context(format!("adding {} to group {}", plan.member_id, plan.group_id))
            })?;
        debug!("{RESOURCE_TYPE}: added {} to {}", plan.member_id, plan.group_id);
        Ok(Some(MembershipModel {
            id: plan.import_id(),
            ..plan.clone()
        }))
    }

    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Self::Model> {
        let membership = self
            .graph
            .get_membership(ctx, &state.member_id, &state.group_id)
            .map_err(|e| {
                Error::from(e).context(format!(
                    "reading membership of {} in {}",
                    state.member_id, state.group_id
                ))
            })?;
        let model = MembershipModel {
            id: String::new(),
            group_id: membership
                .container_descriptor
                .unwrap_or_else(|| state.group_id.clone()),
            member_id: membership
                .member_descriptor
                .unwrap_or_else(|| state.member_id.clone()),
        };
        Ok(MembershipModel {
            id: model.import_id(),
            ..model
        })
    }

    fn update(&self, _ctx: &Context, _plan: &Self::Model, _prior: &Self::Model) -> Result<Option<Self::Model>> {
        Err(Error::internal("group memberships cannot be updated in place"))
    }

    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()> {
        self.graph
            .remove_membership(ctx, &state.member_id, &state.group_id)
            .map_err(|e| {
                Error::from(e).context(format!(
                    "removing {} from group {}",
                    state.member_id, state.group_id
                ))
            })
    }

    fn write_poll(&self, operation: WriteOperation) -> Option<WritePoll<Self::Model>> {
        match operation {
            WriteOperation::Create => Some(
                WritePoll::new(RetryOption::simple(CONSISTENT_READS, self.poll_interval))
                    .retry_when(Error::is_not_found),
            ),
            _ => None,
        }
    }

    fn delete_poll(&self) -> Option<DeletePoll<Self::Model>> {
        Some(DeletePoll::until_gone(RetryOption::simple(
            CONSISTENT_READS,
            self.poll_interval,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDevOps;
    use declarative::{CreateRequest, DeleteRequest, DiagnosticKind, ImportRequest, ManagedResource};
    use serde_json::json;

    fn setup() -> (Arc<FakeDevOps>, ResourceWrapper<GroupMembershipResource>) {
        let fake = FakeDevOps::new();
        let resource = GroupMembershipResource::new(&Clients::from_backend(fake.clone()))
            .with_poll_interval(Duration::from_millis(1));
        (fake, ResourceWrapper::new(resource))
    }

    #[test]
    fn test_create_adds_and_reads_back_consistently() {
        let (fake, wrapper) = setup();
        let response = wrapper.create(CreateRequest {
            plan: json!({"group_id": "vssgp.g", "member_id": "aad.m"}),
            ..CreateRequest::default()
        });

        assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
        assert!(fake.has_membership("aad.m", "vssgp.g"));
        assert_eq!(fake.calls("get_membership"), 10);
        assert_eq!(response.state.unwrap()["id"], "vssgp.g/aad.m");
    }

    #[test]
    fn test_existing_membership_suggests_import() {
        let (fake, wrapper) = setup();
        fake.add_membership("aad.m", "vssgp.g");
        let response = wrapper.create(CreateRequest {
            plan: json!({"group_id": "vssgp.g", "member_id": "aad.m"}),
            ..CreateRequest::default()
        });

        let diagnostic = response.diagnostics.iter().next().unwrap();
        assert_eq!(
            diagnostic.kind,
            DiagnosticKind::ImportAsExists {
                import_id: "vssgp.g/aad.m".to_string()
            }
        );
        assert_eq!(fake.calls("add_membership"), 0);
    }

    #[test]
    fn test_delete_waits_until_gone() {
        let (fake, wrapper) = setup();
        fake.add_membership("aad.m", "vssgp.g");
        let response = wrapper.delete(DeleteRequest {
            state: json!({"id": "vssgp.g/aad.m", "group_id": "vssgp.g", "member_id": "aad.m"}),
            ..DeleteRequest::default()
        });

        assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
        assert!(!fake.has_membership("aad.m", "vssgp.g"));
        assert_eq!(fake.calls("get_membership"), 10);
    }

    #[test]
    fn test_import_id_format() {
        let (_, wrapper) = setup();
        let response = wrapper.import_state(ImportRequest {
            id: Some("vssgp.g/aad.m".to_string()),
            ..ImportRequest::default()
        });
        let state = response.state.unwrap();
        assert_eq!(state["group_id"], "vssgp.g");
        assert_eq!(state["member_id"], "aad.m");

        for bad in ["vssgp.g", "vssgp.g/", "a/b/c"] {
            let response = wrapper.import_state(ImportRequest {
                id: Some(bad.to_string()),
                ..ImportRequest::default()
            });
            assert!(response.state.is_none());
            let diagnostic = response.diagnostics.iter().next().unwrap();
            assert!(
                diagnostic.detail.contains("expect=\"<group_id>/<member_id>\""),
                "{diagnostic:?}"
            );
        }
    }
}
