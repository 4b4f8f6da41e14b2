//! Client bundle shared by every resource operation.
//!
//! Built once when the provider is configured. The namespace catalog is
//! the only state that changes afterwards: it fills lazily as namespaces
//! are first used.

use crate::security::NamespaceCatalog;
use azdo_api::{
    BuildClient, Connection, CoreClient, FeatureManagementClient, GitClient, GraphClient, IdentityClient,
    OperationsClient, PolicyClient, SecurityClient, WorkItemTrackingClient,
};
use std::sync::Arc;

/// A backend serving every REST area.
pub trait Backend:
    CoreClient
    + OperationsClient
    + GraphClient
    + IdentityClient
    + SecurityClient
    + PolicyClient
    + GitClient
    + BuildClient
    + WorkItemTrackingClient
    + FeatureManagementClient
{
}

impl<T> Backend for T where
    T: CoreClient
        + OperationsClient
        + GraphClient
        + IdentityClient
        + SecurityClient
        + PolicyClient
        + GitClient
        + BuildClient
        + WorkItemTrackingClient
        + FeatureManagementClient
{
}

#[derive(Clone)]
pub struct Clients {
    pub core: Arc<dyn CoreClient>,
    pub operations: Arc<dyn OperationsClient>,
    pub graph: Arc<dyn GraphClient>,
    pub identity: Arc<dyn IdentityClient>,
    pub security: Arc<dyn SecurityClient>,
    pub policy: Arc<dyn PolicyClient>,
    pub git: Arc<dyn GitClient>,
    pub build: Arc<dyn BuildClient>,
    pub work_items: Arc<dyn WorkItemTrackingClient>,
    pub features: Arc<dyn FeatureManagementClient>,
    pub namespaces: Arc<NamespaceCatalog>,
}

impl Clients {
    pub fn from_connection(connection: Connection) -> Self {
        Self::from_backend(Arc::new(connection))
    }

    /// Bundle in which every area is served by `backend`.
    pub fn from_backend<B: Backend + 'static>(backend: Arc<B>) -> Self {
        Self {
            core: backend.clone(),
            operations: backend.clone(),
            graph: backend.clone(),
            identity: backend.clone(),
            security: backend.clone(),
            policy: backend.clone(),
            git: backend.clone(),
            build: backend.clone(),
            work_items: backend.clone(),
            features: backend.clone(),
            namespaces: Arc::new(NamespaceCatalog::new(backend)),
        }
    }
}
