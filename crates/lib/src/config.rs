//! Run configuration for permission discovery.

use std::{fmt, time::Duration};

use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use crate::constants::{DEFAULT_ENDPOINT, DEFAULT_TASKS, DEFAULT_TIMEOUT, MAX_TASKS};

/// Errors raised while validating configuration, before any probing starts.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No project identifier was supplied.
    #[error("project ID is required")]
    MissingProject,

    /// No access token was supplied.
    #[error("access token is required")]
    MissingToken,

    /// The concurrency degree is outside the accepted range.
    #[error("tasks must be between 1 and {max}, got {tasks}")]
    InvalidTasks {
        /// Requested number of shards
        tasks: usize,
        /// Largest accepted value
        max: usize,
    },

    /// The API endpoint could not be used as a base URL.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Validate a concurrency degree against the accepted `1..=MAX_TASKS` range.
pub fn validate_tasks(tasks: usize) -> Result<usize, ConfigError> {
    if (1..=MAX_TASKS).contains(&tasks) {
        Ok(tasks)
    } else {
        Err(ConfigError::InvalidTasks {
            tasks,
            max: MAX_TASKS,
        })
    }
}

/// Everything needed to probe one project.
#[derive(Clone)]
pub struct ProbeConfig {
    /// Project whose permissions are discovered
    pub project: String,
    /// OAuth access token for the caller
    pub token: Zeroizing<String>,
    /// Number of concurrent shards
    pub tasks: usize,
    /// API host the check endpoint is resolved against
    pub endpoint: Url,
    /// Timeout applied to each HTTP request
    pub timeout: Duration,
}

impl ProbeConfig {
    /// Create a configuration with default concurrency, endpoint and timeout.
    pub fn new(project: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            token: Zeroizing::new(token.into()),
            tasks: DEFAULT_TASKS,
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_tasks(mut self, tasks: usize) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check required fields and ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.is_empty() {
            return Err(ConfigError::MissingProject);
        }
        if self.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        validate_tasks(self.tasks)?;
        if self.endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.to_string(),
                reason: "endpoint cannot be a base URL".to_string(),
            });
        }
        Ok(())
    }
}

// Keeps the access token out of logs and panic messages.
impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("project", &self.project)
            .field("token", &"***")
            .field("tasks", &self.tasks)
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
