use crate::clients::FeatureManagementClient;
use crate::error::Result;
use crate::http::{API_VERSION_PREVIEW, Connection, Host, Method, segment};
use crate::models::feature::{
    ContributedFeatureState, ContributedFeatureStateQuery, FeatureEnabledValue, FeatureSettingScope,
};
use declarative::Context;
use std::collections::BTreeMap;
use uuid::Uuid;

impl FeatureManagementClient for Connection {
    fn set_feature_state(
        &self,
        ctx: &Context,
        project_id: Uuid,
        feature_id: &str,
        state: FeatureEnabledValue,
    ) -> Result<ContributedFeatureState> {
        let path = format!(
            "_apis/FeatureManagement/FeatureStates/host/project/{project_id}/{}",
            segment(feature_id)
        );
        let body = ContributedFeatureState {
            feature_id: feature_id.to_string(),
            scope: Some(FeatureSettingScope {
                setting_scope: "project".to_string(),
                user_scoped: false,
            }),
            state,
        };
        self.send(
            ctx,
            Method::Patch,
            Host::Organization,
            &path,
            &[],
            API_VERSION_PREVIEW,
            &body,
        )
    }

    fn query_feature_states(
        &self,
        ctx: &Context,
        project_id: Uuid,
        feature_ids: &[String],
    ) -> Result<ContributedFeatureStateQuery> {
        let path = format!("_apis/FeatureManagement/FeatureStatesQuery/host/project/{project_id}");
        let body = ContributedFeatureStateQuery {
            feature_ids: feature_ids.to_vec(),
            feature_states: BTreeMap::new(),
            scope_values: BTreeMap::from([("project".to_string(), project_id.to_string())]),
        };
        self.send(
            ctx,
            Method::Post,
            Host::Organization,
            &path,
            &[],
            API_VERSION_PREVIEW,
            &body,
        )
    }
}
