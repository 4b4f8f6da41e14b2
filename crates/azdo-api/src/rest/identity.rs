use crate::clients::IdentityClient;
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host};
use crate::models::ListResponse;
use crate::models::identity::Identity;
use declarative::Context;

impl IdentityClient for Connection {
    fn read_identities_by_subject(&self, ctx: &Context, subject_descriptors: &[String]) -> Result<Vec<Identity>> {
        if subject_descriptors.is_empty() {
            return Ok(Vec::new());
        }
        let joined = subject_descriptors.join(",");
        let list: ListResponse<Identity> = self.get(
            ctx,
            Host::Vssps,
            "_apis/identities",
            &[("subjectDescriptors", joined.as_str())],
            API_VERSION,
        )?;
        Ok(list.value)
    }
}
