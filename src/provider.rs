//! The `azuredevops` provider: configuration and the resource registry.

use crate::client::Clients;
use crate::config::{self, EnvLookup, ProviderConfig};
use crate::{data_sources, permissions, policy, resources};
use azdo_api::http::{CLOUD_SHELL_USER_AGENT_ENV, user_agent};
use azdo_api::{Connection, Credential, TokenSource};
use declarative::{BoxedDataSource, BoxedResource, Diagnostics, Error, Provider, Result, Schema};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

pub const PROVIDER_TYPE: &str = "azuredevops";

/// Placeholder organization used before `configure`.
const UNCONFIGURED_URL: &str = "https://dev.azure.com/unconfigured";

/// Token source of an unconfigured provider; every request fails.
struct Unconfigured;

impl TokenSource for Unconfigured {
    fn token(&self, _scope: &str) -> azdo_api::Result<String> {
        Err(azdo_api::Error::Credential {
            message: "the provider has not been configured".to_string(),
        })
    }
}

pub struct AzureDevOpsProvider {
    version: String,
    token_source: Option<Arc<dyn TokenSource>>,
    env: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
    clients: Option<Clients>,
}

impl AzureDevOpsProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            token_source: None,
            env: Box::new(config::process_env),
            clients: None,
        }
    }

    /// Azure AD token source used when no personal access token is configured.
    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Use prebuilt clients instead of connecting.
    pub fn with_clients(mut self, clients: Clients) -> Self {
        self.clients = Some(clients);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.clients.is_some()
    }

    fn env(&self) -> EnvLookup<'_> {
        &*self.env
    }

    fn connect(&self, config: &Value) -> Result<Clients> {
        let block: ProviderConfig = match config {
            Value::Null => ProviderConfig::default(),
            value => serde_json::from_value(value.clone())
                .map_err(|e| Error::input(format!("invalid provider configuration: {e}")))?,
        };
        let block = block.resolve(self.env());
        block.validate()?;
        let credential = block.credential(self.token_source.clone())?;
        let agent = user_agent(&self.version, self.env()(CLOUD_SHELL_USER_AGENT_ENV).as_deref());
        let connection = Connection::new(block.org_service_url(), credential.clone(), agent)
            .map_err(|e| Error::from(e).context("connecting to Azure DevOps"))?;
        info!(
            "Configured {PROVIDER_TYPE} provider for {} with {}",
            connection.organization_url(),
            credential.kind()
        );
        Ok(Clients::from_connection(connection))
    }

    /// Clients for registry construction; unconfigured clients fail every call.
    fn clients(&self) -> Clients {
        self.clients.clone().unwrap_or_else(|| {
            let credential = Credential::Aad(Arc::new(Unconfigured));
            Clients::from_connection(Connection::with_api_base(
                UNCONFIGURED_URL,
                UNCONFIGURED_URL,
                credential,
                user_agent(&self.version, None),
            ))
        })
    }
}

impl Provider for AzureDevOpsProvider {
    fn type_name(&self) -> &'static str {
        PROVIDER_TYPE
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        config::schema()
    }

    fn configure(&mut self, config: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        match self.connect(config) {
            Ok(clients) => self.clients = Some(clients),
            Err(err) => {
                debug!("provider configuration failed: {err}");
                diagnostics.add_error("Invalid provider configuration", &err);
            }
        }
        diagnostics
    }

    fn resources(&self) -> Vec<BoxedResource> {
        let clients = self.clients();
        let mut all = resources::resources(&clients);
        all.extend(permissions::resources(&clients));
        all.extend(policy::resources(&clients));
        all
    }

    fn data_sources(&self) -> Vec<BoxedDataSource> {
        data_sources::data_sources(&self.clients())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDevOps;
    use declarative::{CreateRequest, ReadRequest};
    use serde_json::json;
    use std::collections::HashSet;

    fn hermetic() -> AzureDevOpsProvider {
        AzureDevOpsProvider::new("1.0.0").with_env(|_| None)
    }

    #[test]
    fn test_registry_names_are_unique() {
        let provider = hermetic();
        let resources = provider.resources();
        let names: HashSet<&str> = resources.iter().map(|r| r.resource_type()).collect();
        assert_eq!(names.len(), resources.len());
        for expected in [
            "azuredevops_project",
            "azuredevops_group",
            "azuredevops_group_membership",
            "azuredevops_git_permissions",
            "azuredevops_security_permissions",
            "azuredevops_branch_policy_build_validation",
        ] {
            assert!(names.contains(expected), "{expected} missing");
        }
        assert!(provider.resource("azuredevops_project").is_some());
        assert!(provider.data_source("azuredevops_security_namespace_token").is_some());
    }

    #[test]
    fn test_configure_with_pat() {
        let mut provider = hermetic();
        let diagnostics = provider.configure(&json!({
            "org_service_url": "https://dev.azure.com/contoso",
            "personal_access_token": "pat"
        }));
        assert!(!diagnostics.has_error(), "{diagnostics:?}");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_configure_reads_environment() {
        let mut provider = AzureDevOpsProvider::new("1.0.0").with_env(|name| match name {
            "AZDO_ORG_SERVICE_URL" => Some("https://dev.azure.com/contoso".to_string()),
            "AZDO_PERSONAL_ACCESS_TOKEN" => Some("pat".to_string()),
            _ => None,
        });
        assert!(!provider.configure(&Value::Null).has_error());
    }

    #[test]
    fn test_configure_reports_missing_url_and_credential() {
        let mut provider = hermetic();
        let diagnostics = provider.configure(&json!({"personal_access_token": "pat"}));
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.summary, "Invalid provider configuration");
        assert!(diagnostic.detail.contains("org_service_url"), "{diagnostic:?}");
        assert!(!provider.is_configured());

        let diagnostics = provider.configure(&json!({"org_service_url": "https://dev.azure.com/contoso"}));
        let diagnostic = diagnostics.iter().next().unwrap();
        assert!(diagnostic.detail.contains("token source"), "{diagnostic:?}");
    }

    #[test]
    fn test_unconfigured_resources_fail_without_network() {
        let provider = hermetic();
        let membership = provider.resource("azuredevops_group_membership").unwrap();
        let response = membership.create(CreateRequest {
            plan: json!({"group_id": "vssgp.g", "member_id": "aad.m"}),
            ..CreateRequest::default()
        });
        let diagnostic = response.diagnostics.iter().next().unwrap();
        assert!(
            format!("{} {}", diagnostic.summary, diagnostic.detail).contains("has not been configured"),
            "{diagnostic:?}"
        );
    }

    #[test]
    fn test_prebuilt_clients_are_used() {
        let fake = FakeDevOps::new();
        fake.add_membership("aad.m", "vssgp.g");
        let provider = hermetic().with_clients(Clients::from_backend(fake.clone()));
        let membership = provider.resource("azuredevops_group_membership").unwrap();
        let response = membership.read(ReadRequest {
            state: json!({"group_id": "vssgp.g", "member_id": "aad.m"}),
            ..ReadRequest::default()
        });
        assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
        assert_eq!(response.state.unwrap()["id"], "vssgp.g/aad.m");
        assert_eq!(fake.calls("get_membership"), 1);
    }
}
