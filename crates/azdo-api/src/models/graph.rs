//! Graph area: groups, memberships, descriptors.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphGroup {
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub origin_id: Option<String>,
    #[serde(default)]
    pub subject_kind: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub mail_address: Option<String>,
    #[serde(default)]
    pub principal_name: Option<String>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

/// Body of a group creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GroupCreationContext {
    /// A group that is not backed by an external provider.
    #[serde(rename_all = "camelCase")]
    Vsts {
        display_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A reference to an existing AAD group by object id.
    #[serde(rename_all = "camelCase")]
    OriginId { origin_id: String },
    /// A reference to an existing AAD group by mail address.
    #[serde(rename_all = "camelCase")]
    MailAddress { mail_address: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMembership {
    #[serde(default)]
    pub container_descriptor: Option<String>,
    #[serde(default)]
    pub member_descriptor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphDescriptorResult {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphStorageKeyResult {
    #[serde(default)]
    pub value: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creation_context_shapes() {
        let vsts = GroupCreationContext::Vsts {
            display_name: "Readers".to_string(),
            description: None,
        };
        assert_eq!(serde_json::to_value(vsts).unwrap(), json!({"displayName": "Readers"}));

        let mail = GroupCreationContext::MailAddress {
            mail_address: "team@contoso.com".to_string(),
        };
        assert_eq!(
            serde_json::to_value(mail).unwrap(),
            json!({"mailAddress": "team@contoso.com"})
        );
    }
}
