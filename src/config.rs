//! Provider configuration block.
//!
//! Every attribute may also come from the environment; explicit values win.
//! A personal access token selects PAT authentication, otherwise the
//! remaining attributes describe an Azure AD credential chain.

use anyhow::Context as _;
use azdo_api::{Credential, TokenSource};
use declarative::{Attribute, AttributeType, Error, Result, Schema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Most auxiliary tenants a token may be requested for.
const MAX_AUXILIARY_TENANTS: usize = 3;

/// Environment lookup, injectable so tests never read the process environment.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup into the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub org_service_url: Option<String>,
    pub personal_access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_id_file_path: Option<String>,
    pub tenant_id: Option<String>,
    pub auxiliary_tenant_ids: Option<Vec<String>>,
    pub client_secret: Option<String>,
    pub client_secret_file_path: Option<String>,
    pub client_certificate: Option<String>,
    pub client_certificate_path: Option<String>,
    pub client_certificate_password: Option<String>,
    pub oidc_token: Option<String>,
    pub oidc_token_file_path: Option<String>,
    pub oidc_request_token: Option<String>,
    pub oidc_request_url: Option<String>,
    pub oidc_azure_service_connection_id: Option<String>,
    pub use_oidc: Option<bool>,
    pub use_cli: Option<bool>,
    pub use_msi: Option<bool>,
}

fn first_env(env: EnvLookup<'_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env(name).filter(|value| !value.is_empty()))
}

fn fill(slot: &mut Option<String>, env: EnvLookup<'_>, names: &[&str]) {
    if slot.as_deref().is_none_or(str::is_empty) {
        *slot = first_env(env, names);
    }
}

fn fill_bool(slot: &mut Option<bool>, env: EnvLookup<'_>, name: &str) {
    if slot.is_none() {
        *slot = env(name).map(|value| value.eq_ignore_ascii_case("true"));
    }
}

fn is_set(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

impl ProviderConfig {
    /// Fill unset attributes from the environment.
    pub fn resolve(mut self, env: EnvLookup<'_>) -> Self {
        fill(&mut self.org_service_url, env, &["AZDO_ORG_SERVICE_URL"]);
        fill(&mut self.personal_access_token, env, &["AZDO_PERSONAL_ACCESS_TOKEN"]);
        fill(&mut self.client_id, env, &["ARM_CLIENT_ID", "AZURE_CLIENT_ID"]);
        fill(&mut self.client_id_file_path, env, &["ARM_CLIENT_ID_FILE_PATH"]);
        fill(&mut self.tenant_id, env, &["ARM_TENANT_ID"]);
        fill(&mut self.client_secret, env, &["ARM_CLIENT_SECRET"]);
        fill(&mut self.client_secret_file_path, env, &["ARM_CLIENT_SECRET_FILE_PATH"]);
        fill(&mut self.client_certificate, env, &["ARM_CLIENT_CERTIFICATE"]);
        fill(&mut self.client_certificate_path, env, &["ARM_CLIENT_CERTIFICATE_PATH"]);
        fill(&mut self.client_certificate_password, env, &["ARM_CLIENT_CERTIFICATE_PASSWORD"]);
        fill(&mut self.oidc_token, env, &["ARM_OIDC_TOKEN"]);
        fill(
            &mut self.oidc_token_file_path,
            env,
            &["ARM_OIDC_TOKEN_FILE_PATH", "AZURE_FEDERATED_TOKEN_FILE"],
        );
        fill(
            &mut self.oidc_request_token,
            env,
            &["ARM_OIDC_REQUEST_TOKEN", "ACTIONS_ID_TOKEN_REQUEST_TOKEN", "SYSTEM_ACCESSTOKEN"],
        );
        fill(
            &mut self.oidc_request_url,
            env,
            &["ARM_OIDC_REQUEST_URL", "ACTIONS_ID_TOKEN_REQUEST_URL", "SYSTEM_OIDCREQUESTURI"],
        );
        fill(
            &mut self.oidc_azure_service_connection_id,
            env,
            &[
                "ARM_ADO_PIPELINE_SERVICE_CONNECTION_ID",
                "ARM_OIDC_AZURE_SERVICE_CONNECTION_ID",
                "AZURESUBSCRIPTION_SERVICE_CONNECTION_ID",
            ],
        );
        if self.auxiliary_tenant_ids.as_ref().is_none_or(Vec::is_empty) {
            self.auxiliary_tenant_ids = first_env(env, &["ARM_AUXILIARY_TENANT_IDS"]).map(|ids| {
                ids.split(';')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            });
        }
        fill_bool(&mut self.use_oidc, env, "ARM_USE_OIDC");
        fill_bool(&mut self.use_cli, env, "ARM_USE_CLI");
        fill_bool(&mut self.use_msi, env, "ARM_USE_MSI");
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.org_service_url.as_deref().unwrap_or_default();
        if url.is_empty() {
            return Err(Error::attribute(
                "org_service_url",
                "the url of the Azure DevOps instance is required (org_service_url or AZDO_ORG_SERVICE_URL)",
            ));
        }
        if !url.starts_with("https://") {
            return Err(Error::attribute(
                "org_service_url",
                format!("expected org_service_url to be an https:// URL, got {url}"),
            ));
        }
        if let Some(ids) = &self.auxiliary_tenant_ids
            && ids.len() > MAX_AUXILIARY_TENANTS
        {
            return Err(Error::attribute(
                "auxiliary_tenant_ids",
                format!("at most {MAX_AUXILIARY_TENANTS} auxiliary tenants are supported, got {}", ids.len()),
            ));
        }
        for (left, right) in [
            ("client_secret", "client_secret_file_path"),
            ("oidc_token", "oidc_token_file_path"),
            ("client_certificate", "client_certificate_path"),
        ] {
            if is_set(self.field(left)) && is_set(self.field(right)) {
                return Err(Error::attribute(left, format!("\"{left}\" conflicts with \"{right}\"")));
            }
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Option<&String> {
        match name {
            "client_secret" => self.client_secret.as_ref(),
            "client_secret_file_path" => self.client_secret_file_path.as_ref(),
            "oidc_token" => self.oidc_token.as_ref(),
            "oidc_token_file_path" => self.oidc_token_file_path.as_ref(),
            "client_certificate" => self.client_certificate.as_ref(),
            "client_certificate_path" => self.client_certificate_path.as_ref(),
            _ => None,
        }
    }

    pub fn org_service_url(&self) -> &str {
        self.org_service_url.as_deref().unwrap_or_default()
    }

    /// Azure AD sources to try, in order. Empty when a PAT is configured.
    pub fn aad_chain(&self) -> AadCredentialChain {
        if is_set(self.personal_access_token.as_ref()) {
            return AadCredentialChain::default();
        }
        let mut sources = Vec::new();
        if is_set(self.client_certificate.as_ref()) || is_set(self.client_certificate_path.as_ref()) {
            sources.push(AadSource::ClientCertificate);
        }
        if is_set(self.client_secret.as_ref()) || is_set(self.client_secret_file_path.as_ref()) {
            sources.push(AadSource::ClientSecret);
        }
        if self.use_oidc.unwrap_or(false) {
            sources.push(AadSource::Oidc);
        }
        if self.use_msi.unwrap_or(false) {
            sources.push(AadSource::ManagedIdentity);
        }
        if self.use_cli.unwrap_or(true) {
            sources.push(AadSource::AzureCli);
        }
        AadCredentialChain {
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            sources,
        }
    }

    /// Select the request credential.
    ///
    /// Azure AD tokens come from `token_source`, which the embedding host
    /// builds from [`Self::aad_chain`].
    pub fn credential(&self, token_source: Option<Arc<dyn TokenSource>>) -> Result<Credential> {
        if let Some(pat) = self.personal_access_token.as_ref().filter(|pat| !pat.is_empty()) {
            return Ok(Credential::PersonalAccessToken(pat.clone()));
        }
        let chain = self.aad_chain();
        if chain.sources.is_empty() {
            return Err(Error::input(
                "no credential configured: set personal_access_token or enable an Azure AD credential",
            ));
        }
        token_source.map(Credential::Aad).ok_or_else(|| {
            Error::input(format!(
                "Azure AD authentication with {chain} requires a token source from the host"
            ))
        })
    }

    /// Load a provider block from a TOML or JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            serde_json::from_str(&content).with_context(|| format!("Invalid provider config {}", path.display()))
        } else {
            toml::from_str(&content).with_context(|| format!("Invalid provider config {}", path.display()))
        }
    }
}

/// Default provider config file, `~/.config/azdo-provider/provider.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("azdo-provider").join("provider.toml"))
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn redacted(value: Option<&String>) -> &'static str {
    if is_set(value) { "<redacted>" } else { "<unset>" }
}

fn shown(value: Option<&String>) -> &str {
    value.map_or("<unset>", String::as_str)
}

/// Summary for humans and logs; secrets are never printed.
impl fmt::Display for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "org_service_url: {}", shown(self.org_service_url.as_ref()))?;
        writeln!(f, "personal_access_token: {}", redacted(self.personal_access_token.as_ref()))?;
        writeln!(f, "client_id: {}", shown(self.client_id.as_ref()))?;
        writeln!(f, "tenant_id: {}", shown(self.tenant_id.as_ref()))?;
        if let Some(ids) = &self.auxiliary_tenant_ids {
            writeln!(f, "auxiliary_tenant_ids: {}", ids.join(";"))?;
        }
        writeln!(f, "client_secret: {}", redacted(self.client_secret.as_ref()))?;
        writeln!(f, "client_certificate: {}", redacted(self.client_certificate.as_ref()))?;
        writeln!(
            f,
            "client_certificate_password: {}",
            redacted(self.client_certificate_password.as_ref())
        )?;
        writeln!(f, "oidc_token: {}", redacted(self.oidc_token.as_ref()))?;
        writeln!(f, "oidc_request_token: {}", redacted(self.oidc_request_token.as_ref()))?;
        write!(
            f,
            "use_oidc: {}, use_msi: {}, use_cli: {}",
            self.use_oidc.unwrap_or(false),
            self.use_msi.unwrap_or(false),
            self.use_cli.unwrap_or(true)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AadSource {
    ClientCertificate,
    ClientSecret,
    Oidc,
    ManagedIdentity,
    AzureCli,
}

impl AadSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientCertificate => "client certificate",
            Self::ClientSecret => "client secret",
            Self::Oidc => "OIDC",
            Self::ManagedIdentity => "managed identity",
            Self::AzureCli => "Azure CLI",
        }
    }
}

/// Ordered Azure AD credential sources for one tenant and client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AadCredentialChain {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub sources: Vec<AadSource>,
}

impl fmt::Display for AadCredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|s| s.as_str()).collect();
        write!(f, "[{}]", sources.join(", "))
    }
}

/// Schema of the provider block.
pub fn schema() -> Schema {
    let string = || Attribute::optional(AttributeType::String);
    let secret = || Attribute::optional(AttributeType::String).sensitive();
    let flag = || Attribute::optional(AttributeType::Bool);
    Schema::new()
        .description("Azure DevOps organization and credentials.")
        .attribute(
            "org_service_url",
            string().description("The url of the Azure DevOps instance which should be used."),
        )
        .attribute(
            "personal_access_token",
            secret().description("The personal access token which should be used."),
        )
        .attribute("client_id", string())
        .attribute("client_id_file_path", string())
        .attribute("tenant_id", string())
        .attribute(
            "auxiliary_tenant_ids",
            Attribute::optional(AttributeType::List(Box::new(Attribute::optional(AttributeType::String))))
                .items(None, Some(MAX_AUXILIARY_TENANTS)),
        )
        .attribute("client_secret", secret())
        .attribute("client_secret_file_path", string())
        .attribute("client_certificate", secret())
        .attribute("client_certificate_path", string())
        .attribute("client_certificate_password", secret())
        .attribute("oidc_token", secret())
        .attribute("oidc_token_file_path", string())
        .attribute("oidc_request_token", secret())
        .attribute("oidc_request_url", string())
        .attribute("oidc_azure_service_connection_id", string())
        .attribute("use_oidc", flag().default_value(false))
        .attribute("use_cli", flag().default_value(true))
        .attribute("use_msi", flag().default_value(false))
}
