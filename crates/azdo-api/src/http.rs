//! Blocking HTTP connection to an Azure DevOps organization.
//!
//! One [`Connection`] serves every client trait. Requests are bounded by
//! the time left in the operation [`Context`] and refused once it is
//! cancelled or expired.

use crate::auth::Credential;
use crate::error::{Error, Result};
use declarative::Context;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use ureq::http::Response;
use ureq::{Body, RequestBuilder};

/// Default REST API version.
pub const API_VERSION: &str = "7.1";

/// API version of preview-only routes (graph, security).
pub const API_VERSION_PREVIEW: &str = "7.1-preview.1";

const USER_AGENT_PRODUCT: &str = "terraform-provider-azuredevops";

/// Environment variable carrying the cloud-shell identifier.
pub const CLOUD_SHELL_USER_AGENT_ENV: &str = "AZURE_HTTP_USER_AGENT";

/// Service host a route lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Host {
    /// `https://dev.azure.com/<org>`
    Organization,
    /// `https://vssps.dev.azure.com/<org>` (graph, identities)
    Vssps,
}

/// Connection to one organization.
pub struct Connection {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    organization_url: String,
    vssps_url: String,
    credential: Credential,
    user_agent: String,
}

impl Connection {
    /// Create a connection to `organization_url` (e.g. `https://dev.azure.com/contoso`).
    pub fn new(organization_url: &str, credential: Credential, user_agent: impl Into<String>) -> Result<Self> {
        let organization_url = normalize_url(organization_url)?;
        let vssps_url = vssps_url(&organization_url);
        Ok(Self::with_api_base(organization_url, vssps_url, credential, user_agent))
    }

    /// Create a connection with explicit hosts (for testing).
    #[must_use]
    pub fn with_api_base(
        organization_url: impl Into<String>,
        vssps_url: impl Into<String>,
        credential: Credential,
        user_agent: impl Into<String>,
    ) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            organization_url: organization_url.into(),
            vssps_url: vssps_url.into(),
            credential,
            user_agent: user_agent.into(),
        }
    }

    /// Organization URL without trailing slash.
    #[must_use]
    pub fn organization_url(&self) -> &str {
        &self.organization_url
    }

    /// Identity service URL.
    #[must_use]
    pub fn vssps_url(&self) -> &str {
        &self.vssps_url
    }

    fn url(&self, host: Host, path: &str) -> String {
        let base = match host {
            Host::Organization => &self.organization_url,
            Host::Vssps => &self.vssps_url,
        };
        format!("{base}/{path}")
    }

    /// Apply headers, query, api-version and the context deadline.
    fn prepare<B>(
        &self,
        ctx: &Context,
        builder: RequestBuilder<B>,
        url: &str,
        query: &[(&str, &str)],
        api_version: &str,
    ) -> Result<RequestBuilder<B>> {
        if ctx.cancellation().is_cancelled() {
            return Err(Error::Cancelled);
        }
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded {
                request: url.to_string(),
            });
        }
        let mut builder = builder
            .header("Authorization", self.credential.authorization()?)
            .header("Accept", "application/json")
            .header("User-Agent", &self.user_agent)
            .query("api-version", api_version);
        for (key, value) in query {
            builder = builder.query(*key, *value);
        }
        Ok(builder.config().timeout_global(Some(ctx.remaining())).build())
    }

    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        host: Host,
        path: &str,
        query: &[(&str, &str)],
        api_version: &str,
    ) -> Result<T> {
        let url = self.url(host, path);
        log::debug!("GET {url}");
        let request = self.prepare(ctx, self.agent.get(&url), &url, query, api_version)?;
        let mut response = check(request.call()?)?;
        Ok(response.body_mut().read_json()?)
    }

    /// `HEAD`; succeeds on 2xx, maps 404 to a not-found error.
    pub(crate) fn head(&self, ctx: &Context, host: Host, path: &str, api_version: &str) -> Result<()> {
        let url = self.url(host, path);
        log::debug!("HEAD {url}");
        let request = self.prepare(ctx, self.agent.head(&url), &url, &[], api_version)?;
        check(request.call()?)?;
        Ok(())
    }

    pub(crate) fn delete(
        &self,
        ctx: &Context,
        host: Host,
        path: &str,
        query: &[(&str, &str)],
        api_version: &str,
    ) -> Result<Response<Body>> {
        let url = self.url(host, path);
        log::debug!("DELETE {url}");
        let request = self.prepare(ctx, self.agent.delete(&url), &url, query, api_version)?;
        check(request.call()?)
    }

    pub(crate) fn delete_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        host: Host,
        path: &str,
        query: &[(&str, &str)],
        api_version: &str,
    ) -> Result<T> {
        let mut response = self.delete(ctx, host, path, query, api_version)?;
        Ok(response.body_mut().read_json()?)
    }

    /// Send a JSON body with `method` (`POST`, `PUT` or `PATCH`).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        method: Method,
        host: Host,
        path: &str,
        query: &[(&str, &str)],
        api_version: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(host, path);
        log::debug!("{} {url}", method.as_str());
        let builder = match method {
            Method::Post => self.agent.post(&url),
            Method::Put => self.agent.put(&url),
            Method::Patch | Method::JsonPatch => self.agent.patch(&url),
        };
        let request = self.prepare(ctx, builder, &url, query, api_version)?;
        let response = if method == Method::JsonPatch {
            let payload = serde_json::to_vec(body)?;
            request
                .header("Content-Type", "application/json-patch+json")
                .send(&payload[..])?
        } else {
            request.send_json(body)?
        };
        let mut response = check(response)?;
        Ok(response.body_mut().read_json()?)
    }
}

/// Methods that carry a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Post,
    Put,
    Patch,
    /// `PATCH` with an RFC 6902 document.
    JsonPatch,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch | Self::JsonPatch => "PATCH",
        }
    }
}

/// Turn an error status into an [`Error`] carrying the service message.
fn check(mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    let err = Error::from_response(status, &body);
    log::debug!("request failed with HTTP {status}: {err}");
    Err(err)
}

/// Bytes escaped in a path segment: everything but RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encode one path segment.
pub(crate) fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Percent-encode a `/`-separated path, keeping the separators.
pub(crate) fn path_segments(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !trimmed.starts_with("https://") {
        return Err(Error::invalid_argument(
            "organization_url",
            format!("{url:?} is not an https URL"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Identity service URL of an organization.
///
/// `https://dev.azure.com/<org>` maps to `https://vssps.dev.azure.com/<org>`
/// and `https://<org>.visualstudio.com` to `https://<org>.vssps.visualstudio.com`;
/// other hosts (Azure DevOps Server) serve graph routes themselves.
pub fn vssps_url(organization_url: &str) -> String {
    if let Some(org) = organization_url.strip_prefix("https://dev.azure.com/") {
        return format!("https://vssps.dev.azure.com/{org}");
    }
    if let Some(host) = organization_url.strip_prefix("https://")
        && let Some(org) = host.strip_suffix(".visualstudio.com")
        && !org.contains('/')
    {
        return format!("https://{org}.vssps.visualstudio.com");
    }
    organization_url.to_string()
}

/// `terraform-provider-azuredevops/<version>`, suffixed with the cloud-shell
/// identifier when present.
pub fn user_agent(version: &str, cloud_shell: Option<&str>) -> String {
    let base = format!("{USER_AGENT_PRODUCT}/{version}");
    match cloud_shell.map(str::trim) {
        Some(suffix) if !suffix.is_empty() => format!("{base} {suffix}"),
        _ => base,
    }
}
