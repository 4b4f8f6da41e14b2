use crate::clients::PolicyClient;
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host, Method, segment};
use crate::models::policy::PolicyConfiguration;
use declarative::Context;

fn configurations_path(project: &str) -> String {
    format!("{}/_apis/policy/configurations", segment(project))
}

impl PolicyClient for Connection {
    fn create_policy_configuration(
        &self,
        ctx: &Context,
        project: &str,
        configuration: &PolicyConfiguration,
    ) -> Result<PolicyConfiguration> {
        self.send(
            ctx,
            Method::Post,
            Host::Organization,
            &configurations_path(project),
            &[],
            API_VERSION,
            configuration,
        )
    }

    fn get_policy_configuration(&self, ctx: &Context, project: &str, id: i64) -> Result<PolicyConfiguration> {
        let path = format!("{}/{id}", configurations_path(project));
        self.get(ctx, Host::Organization, &path, &[], API_VERSION)
    }

    fn update_policy_configuration(
        &self,
        ctx: &Context,
        project: &str,
        id: i64,
        configuration: &PolicyConfiguration,
    ) -> Result<PolicyConfiguration> {
        let path = format!("{}/{id}", configurations_path(project));
        self.send(
            ctx,
            Method::Put,
            Host::Organization,
            &path,
            &[],
            API_VERSION,
            configuration,
        )
    }

    fn delete_policy_configuration(&self, ctx: &Context, project: &str, id: i64) -> Result<()> {
        let path = format!("{}/{id}", configurations_path(project));
        self.delete(ctx, Host::Organization, &path, &[], API_VERSION)?;
        Ok(())
    }
}
