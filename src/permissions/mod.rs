//! Permission resources: one principal's permissions on one ACL token.
//!
//! Every resource is a [`PermissionResource`] over a [`PermissionTarget`]
//! that addresses the secured object.

pub mod driver;
pub mod targets;

pub use driver::{PermissionResource, PermissionState, PermissionTarget};

use crate::client::Clients;
use declarative::BoxedResource;
use targets::{
    AreaTarget, BuildDefinitionTarget, BuildFolderTarget, GitTarget, IterationTarget, LibraryTarget, ProcessTarget,
    ProjectTarget, SecureFileTarget, SecurityTarget, ServiceEndpointTarget, VariableGroupTarget, WorkItemQueryTarget,
};

pub fn resources(clients: &Clients) -> Vec<BoxedResource> {
    vec![
        PermissionResource::<ProjectTarget>::boxed(clients),
        PermissionResource::<GitTarget>::boxed(clients),
        PermissionResource::<BuildDefinitionTarget>::boxed(clients),
        PermissionResource::<BuildFolderTarget>::boxed(clients),
        PermissionResource::<AreaTarget>::boxed(clients),
        PermissionResource::<IterationTarget>::boxed(clients),
        PermissionResource::<WorkItemQueryTarget>::boxed(clients),
        PermissionResource::<LibraryTarget>::boxed(clients),
        PermissionResource::<VariableGroupTarget>::boxed(clients),
        PermissionResource::<SecureFileTarget>::boxed(clients),
        PermissionResource::<ServiceEndpointTarget>::boxed(clients),
        PermissionResource::<ProcessTarget>::boxed(clients),
        PermissionResource::<SecurityTarget>::boxed(clients),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDevOps;
    use std::collections::HashSet;

    #[test]
    fn test_resource_types_are_unique() {
        let resources = resources(&Clients::from_backend(FakeDevOps::new()));
        let types: HashSet<&str> = resources.iter().map(|r| r.resource_type()).collect();
        assert_eq!(types.len(), resources.len());
        assert!(types.contains("azuredevops_iteration_permissions"));
        assert!(types.contains("azuredevops_area_permissions"));
    }

    #[test]
    fn test_every_schema_carries_principal_and_replace() {
        for resource in resources(&Clients::from_backend(FakeDevOps::new())) {
            let schema = resource.schema();
            let principal = schema.get("principal").unwrap();
            assert!(principal.required && principal.force_new, "{}", resource.resource_type());
            assert_eq!(schema.get("replace").unwrap().default, Some(serde_json::json!(true)));
            assert!(schema.get("timeouts").is_some());
        }
    }
}
