use crate::clients::SecurityClient;
use crate::error::Result;
use crate::http::{API_VERSION, Connection, Host, Method};
use crate::models::ListResponse;
use crate::models::security::{
    AccessControlEntriesUpdate, AccessControlEntry, AccessControlList, SecurityNamespaceDescription,
};
use declarative::Context;
use uuid::Uuid;

impl SecurityClient for Connection {
    fn query_security_namespaces(&self, ctx: &Context, namespace_id: Uuid) -> Result<Vec<SecurityNamespaceDescription>> {
        let path = format!("_apis/securitynamespaces/{namespace_id}");
        let list: ListResponse<SecurityNamespaceDescription> =
            self.get(ctx, Host::Organization, &path, &[], API_VERSION)?;
        Ok(list.value)
    }

    fn query_access_control_lists(
        &self,
        ctx: &Context,
        namespace_id: Uuid,
        token: &str,
        descriptors: &[String],
        include_extended_info: bool,
    ) -> Result<Vec<AccessControlList>> {
        let path = format!("_apis/accesscontrollists/{namespace_id}");
        let joined = descriptors.join(",");
        let mut query = vec![
            ("token", token),
            (
                "includeExtendedInfo",
                if include_extended_info { "true" } else { "false" },
            ),
        ];
        if !joined.is_empty() {
            query.push(("descriptors", joined.as_str()));
        }
        let list: ListResponse<AccessControlList> =
            self.get(ctx, Host::Organization, &path, &query, API_VERSION)?;
        Ok(list.value)
    }

    fn set_access_control_entries(
        &self,
        ctx: &Context,
        namespace_id: Uuid,
        update: &AccessControlEntriesUpdate,
    ) -> Result<Vec<AccessControlEntry>> {
        let path = format!("_apis/accesscontrolentries/{namespace_id}");
        let list: ListResponse<AccessControlEntry> = self.send(
            ctx,
            Method::Post,
            Host::Organization,
            &path,
            &[],
            API_VERSION,
            update,
        )?;
        Ok(list.value)
    }

    fn remove_access_control_entries(
        &self,
        ctx: &Context,
        namespace_id: Uuid,
        token: &str,
        descriptors: &[String],
    ) -> Result<bool> {
        let path = format!("_apis/accesscontrolentries/{namespace_id}");
        let joined = descriptors.join(",");
        self.delete_json(
            ctx,
            Host::Organization,
            &path,
            &[("token", token), ("descriptors", joined.as_str())],
            API_VERSION,
        )
    }
}
