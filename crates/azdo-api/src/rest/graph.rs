use crate::clients::GraphClient;
use crate::error::Result;
use crate::http::{API_VERSION_PREVIEW, Connection, Host, Method, segment};
use crate::models::JsonPatchOperation;
use crate::models::graph::{
    GraphDescriptorResult, GraphGroup, GraphMembership, GraphStorageKeyResult, GroupCreationContext,
};
use declarative::Context;
use serde_json::Value;
use uuid::Uuid;

fn membership_path(subject: &str, container: &str) -> String {
    format!("_apis/graph/memberships/{}/{}", segment(subject), segment(container))
}

impl GraphClient for Connection {
    fn create_group(
        &self,
        ctx: &Context,
        creation: &GroupCreationContext,
        scope_descriptor: Option<&str>,
    ) -> Result<GraphGroup> {
        let query: Vec<(&str, &str)> = scope_descriptor
            .map(|scope| vec![("scopeDescriptor", scope)])
            .unwrap_or_default();
        self.send(
            ctx,
            Method::Post,
            Host::Vssps,
            "_apis/graph/groups",
            &query,
            API_VERSION_PREVIEW,
            creation,
        )
    }

    fn get_group(&self, ctx: &Context, descriptor: &str) -> Result<GraphGroup> {
        let path = format!("_apis/graph/groups/{}", segment(descriptor));
        self.get(ctx, Host::Vssps, &path, &[], API_VERSION_PREVIEW)
    }

    fn update_group(&self, ctx: &Context, descriptor: &str, patch: &[JsonPatchOperation]) -> Result<GraphGroup> {
        let path = format!("_apis/graph/groups/{}", segment(descriptor));
        self.send(
            ctx,
            Method::JsonPatch,
            Host::Vssps,
            &path,
            &[],
            API_VERSION_PREVIEW,
            &patch,
        )
    }

    fn delete_group(&self, ctx: &Context, descriptor: &str) -> Result<()> {
        let path = format!("_apis/graph/groups/{}", segment(descriptor));
        self.delete(ctx, Host::Vssps, &path, &[], API_VERSION_PREVIEW)?;
        Ok(())
    }

    fn get_descriptor(&self, ctx: &Context, storage_key: Uuid) -> Result<GraphDescriptorResult> {
        let path = format!("_apis/graph/descriptors/{storage_key}");
        self.get(ctx, Host::Vssps, &path, &[], API_VERSION_PREVIEW)
    }

    fn get_storage_key(&self, ctx: &Context, subject_descriptor: &str) -> Result<GraphStorageKeyResult> {
        let path = format!("_apis/graph/storagekeys/{}", segment(subject_descriptor));
        self.get(ctx, Host::Vssps, &path, &[], API_VERSION_PREVIEW)
    }

    fn add_membership(&self, ctx: &Context, subject: &str, container: &str) -> Result<GraphMembership> {
        self.send(
            ctx,
            Method::Put,
            Host::Vssps,
            &membership_path(subject, container),
            &[],
            API_VERSION_PREVIEW,
            &Value::Null,
        )
    }

    fn get_membership(&self, ctx: &Context, subject: &str, container: &str) -> Result<GraphMembership> {
        self.get(
            ctx,
            Host::Vssps,
            &membership_path(subject, container),
            &[],
            API_VERSION_PREVIEW,
        )
    }

    fn check_membership_existence(&self, ctx: &Context, subject: &str, container: &str) -> Result<()> {
        self.head(ctx, Host::Vssps, &membership_path(subject, container), API_VERSION_PREVIEW)
    }

    fn remove_membership(&self, ctx: &Context, subject: &str, container: &str) -> Result<()> {
        self.delete(
            ctx,
            Host::Vssps,
            &membership_path(subject, container),
            &[],
            API_VERSION_PREVIEW,
        )?;
        Ok(())
    }
}
