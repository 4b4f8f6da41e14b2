//! Provider trait: configuration plus the resource and data source registry.

use crate::data_source::BoxedDataSource;
use crate::diagnostics::Diagnostics;
use crate::schema::Schema;
use crate::wrapper::BoxedResource;
use serde_json::Value;

pub trait Provider {
    /// Provider type name, e.g. `azuredevops`.
    fn type_name(&self) -> &'static str;

    fn version(&self) -> &str;

    /// Schema of the provider configuration block.
    fn schema(&self) -> Schema;

    /// Apply provider configuration; must succeed before any resource call.
    fn configure(&mut self, config: &Value) -> Diagnostics;

    fn resources(&self) -> Vec<BoxedResource>;

    fn data_sources(&self) -> Vec<BoxedDataSource>;

    /// Look up a resource by type name.
    fn resource(&self, resource_type: &str) -> Option<BoxedResource> {
        self.resources()
            .into_iter()
            .find(|r| r.resource_type() == resource_type)
    }

    fn data_source(&self, data_source_type: &str) -> Option<BoxedDataSource> {
        self.data_sources()
            .into_iter()
            .find(|d| d.data_source_type() == data_source_type)
    }
}
