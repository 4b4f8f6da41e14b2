//! Project, group and group membership resources.

pub mod group;
pub mod group_membership;
pub mod project;

use crate::client::Clients;
use declarative::BoxedResource;

pub fn resources(clients: &Clients) -> Vec<BoxedResource> {
    vec![
        project::ProjectResource::boxed(clients),
        group::GroupResource::boxed(clients),
        group_membership::GroupMembershipResource::boxed(clients),
    ]
}
