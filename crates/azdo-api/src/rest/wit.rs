use crate::clients::WorkItemTrackingClient;
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host, path_segments, segment};
use crate::models::wit::{QueryHierarchyItem, TreeStructureGroup, WorkItemClassificationNode};
use declarative::Context;

impl WorkItemTrackingClient for Connection {
    fn get_classification_node(
        &self,
        ctx: &Context,
        project: &str,
        group: TreeStructureGroup,
        path: &str,
        depth: u32,
    ) -> Result<WorkItemClassificationNode> {
        let mut route = format!(
            "{}/_apis/wit/classificationnodes/{}",
            segment(project),
            group.as_str()
        );
        let rest = path_segments(path);
        if !rest.is_empty() {
            route.push('/');
            route.push_str(&rest);
        }
        let depth = depth.to_string();
        self.get(ctx, Host::Organization, &route, &[("$depth", depth.as_str())], API_VERSION)
    }

    fn get_query(&self, ctx: &Context, project: &str, query: &str, depth: u32) -> Result<QueryHierarchyItem> {
        let route = format!("{}/_apis/wit/queries/{}", segment(project), path_segments(query));
        let depth = depth.to_string();
        self.get(ctx, Host::Organization, &route, &[("$depth", depth.as_str())], API_VERSION)
    }
}
