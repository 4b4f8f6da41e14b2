use crate::clients::{CoreClient, OperationsClient};
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host, Method, segment};
use crate::models::ListResponse;
use crate::models::project::{Operation, OperationReference, Process, TeamProject};
use declarative::Context;
use uuid::Uuid;

impl CoreClient for Connection {
    fn get_project(&self, ctx: &Context, project: &str, include_capabilities: bool) -> Result<TeamProject> {
        let path = format!("_apis/projects/{}", segment(project));
        let include = if include_capabilities { "true" } else { "false" };
        self.get(
            ctx,
            Host::Organization,
            &path,
            &[("includeCapabilities", include)],
            API_VERSION,
        )
    }

    fn list_processes(&self, ctx: &Context) -> Result<Vec<Process>> {
        let list: ListResponse<Process> =
            self.get(ctx, Host::Organization, "_apis/process/processes", &[], API_VERSION)?;
        Ok(list.value)
    }

    fn queue_create_project(&self, ctx: &Context, project: &TeamProject) -> Result<OperationReference> {
        self.send(
            ctx,
            Method::Post,
            Host::Organization,
            "_apis/projects",
            &[],
            API_VERSION,
            project,
        )
    }

    fn update_project(&self, ctx: &Context, project_id: Uuid, project: &TeamProject) -> Result<OperationReference> {
        let path = format!("_apis/projects/{project_id}");
        self.send(ctx, Method::Patch, Host::Organization, &path, &[], API_VERSION, project)
    }

    fn queue_delete_project(&self, ctx: &Context, project_id: Uuid) -> Result<OperationReference> {
        let path = format!("_apis/projects/{project_id}");
        self.delete_json(ctx, Host::Organization, &path, &[], API_VERSION)
    }
}

impl OperationsClient for Connection {
    fn get_operation(&self, ctx: &Context, operation_id: Uuid) -> Result<Operation> {
        let path = format!("_apis/operations/{operation_id}");
        self.get(ctx, Host::Organization, &path, &[], API_VERSION)
    }
}
