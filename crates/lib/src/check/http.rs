//! HTTP permission checker for the Cloud Resource Manager API.
//!
//! Issues `POST {endpoint}/v1/projects/{project}:testIamPermissions` with a
//! bearer token and a JSON body, using one pooled reqwest client for every
//! shard.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;
use zeroize::Zeroizing;

use super::{
    CheckOutcome, PermissionChecker,
    errors::CheckError,
    protocol::{TestPermissionsRequest, TestPermissionsResponse},
};
use crate::{
    config::{ConfigError, ProbeConfig},
    constants::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT},
};

/// Permission checker backed by the `testIamPermissions` HTTP endpoint.
pub struct HttpChecker {
    client: reqwest::Client,
    url: Url,
    token: Zeroizing<String>,
}

impl HttpChecker {
    /// Create a builder for configuring the checker.
    pub fn builder() -> HttpCheckerBuilder {
        HttpCheckerBuilder::new()
    }

    /// Build a checker from a validated probe configuration.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::builder()
            .endpoint(config.endpoint.clone())
            .project(config.project.clone())
            .token(config.token.as_str())
            .timeout(config.timeout)
            .build()
    }

    /// The fully resolved URL every check is sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Debug for HttpChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpChecker")
            .field("url", &self.url.as_str())
            .field("token", &"***")
            .finish()
    }
}

#[async_trait]
impl PermissionChecker for HttpChecker {
    async fn test_permissions(&self, permissions: &[String]) -> Result<CheckOutcome, CheckError> {
        let body = serde_json::to_vec(&TestPermissionsRequest {
            permissions: permissions.to_vec(),
        })
        .map_err(|e| CheckError::Encode(e.to_string()))?;

        debug!(url = %self.url, count = permissions.len(), "Sending bulk permission check");

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(self.token.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        trace!(status = status.as_u16(), body = %String::from_utf8_lossy(&bytes), "Got response");

        let parsed: TestPermissionsResponse = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(CheckError::UnexpectedStatus {
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(CheckError::Decode(e.to_string())),
        };

        if !status.is_success() && parsed.error.is_none() {
            return Err(CheckError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        parsed.into_outcome()
    }
}

impl HttpChecker {
    fn transport_error(&self, error: reqwest::Error) -> CheckError {
        CheckError::Transport {
            url: self.url.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Builder for [`HttpChecker`].
pub struct HttpCheckerBuilder {
    endpoint: Option<Url>,
    project: Option<String>,
    token: Option<Zeroizing<String>>,
    timeout: Duration,
}

impl Default for HttpCheckerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCheckerBuilder {
    /// Create a builder targeting the public Cloud Resource Manager host.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            project: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the API host, e.g. to point at a local mock server.
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Project whose permissions are checked.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// OAuth access token sent as the bearer credential.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Zeroizing::new(token.into()));
        self
    }

    /// Timeout applied to each HTTP request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the checker, resolving the endpoint URL for the project.
    pub fn build(self) -> Result<HttpChecker, ConfigError> {
        let project = self
            .project
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingProject)?;
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let endpoint = match self.endpoint {
            Some(endpoint) => endpoint,
            None => Url::parse(DEFAULT_ENDPOINT).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                reason: e.to_string(),
            })?,
        };

        let url = test_permissions_url(&endpoint, &project)?;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(HttpChecker { client, url, token })
    }
}

/// Resolve `{endpoint}/v1/projects/{project}:testIamPermissions`.
///
/// The project is pushed as a single path segment, so separators inside it
/// are percent-encoded rather than changing the path.
pub fn test_permissions_url(endpoint: &Url, project: &str) -> Result<Url, ConfigError> {
    let mut url = endpoint.clone();
    let action = format!("{project}:testIamPermissions");
    url.path_segments_mut()
        .map_err(|_| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint cannot be a base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(["v1", "projects", action.as_str()]);
    Ok(url)
}
