//! Wire types for the `testIamPermissions` endpoint.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{CheckOutcome, errors::CheckError};

/// Message pattern the endpoint uses when a submitted name is not a known permission.
static INVALID_PERMISSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Permission (.+) is not valid for this resource\.$").unwrap()
});

/// Body of a bulk permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPermissionsRequest {
    pub permissions: Vec<String>,
}

/// Body returned by the endpoint, either granted names or an `error` object.
///
/// `permissions` is omitted entirely when nothing in the request is granted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestPermissionsResponse {
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// The `error` object of a failed call. Only `status` and `message` are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TestPermissionsResponse {
    /// Interpret the body as a granted list or an API rejection.
    pub fn into_outcome(self) -> Result<CheckOutcome, CheckError> {
        match self.error {
            None => Ok(CheckOutcome::Granted(self.permissions.unwrap_or_default())),
            Some(error) => {
                let status = error
                    .status
                    .ok_or(CheckError::MalformedErrorBody { missing: "status" })?;
                let message = error
                    .message
                    .ok_or(CheckError::MalformedErrorBody { missing: "message" })?;
                Ok(CheckOutcome::Rejected(ApiError { status, message }))
            }
        }
    }
}

/// An API-level rejection of a whole bulk check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    /// The permission name cited by an invalid-permission rejection, if this is one.
    ///
    /// The status is not consulted; only the message shape identifies the
    /// recoverable case.
    pub fn invalid_permission(&self) -> Option<&str> {
        INVALID_PERMISSION
            .captures(&self.message)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.status, self.message)
    }
}
