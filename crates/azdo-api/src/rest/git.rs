use crate::clients::GitClient;
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host, segment};
use crate::models::ListResponse;
use crate::models::git::GitRef;
use declarative::Context;

impl GitClient for Connection {
    fn get_refs(&self, ctx: &Context, repository_id: &str, filter: &str) -> Result<Vec<GitRef>> {
        let path = format!("_apis/git/repositories/{}/refs", segment(repository_id));
        let list: ListResponse<GitRef> =
            self.get(ctx, Host::Organization, &path, &[("filter", filter)], API_VERSION)?;
        Ok(list.value)
    }
}
