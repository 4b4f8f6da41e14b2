use crate::clients::BuildClient;
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host, segment};
use crate::models::build::BuildDefinitionReference;
use declarative::Context;

impl BuildClient for Connection {
    fn get_definition(&self, ctx: &Context, project: &str, definition_id: i64) -> Result<BuildDefinitionReference> {
        let path = format!("{}/_apis/build/definitions/{definition_id}", segment(project));
        self.get(ctx, Host::Organization, &path, &[], API_VERSION)
    }
}
