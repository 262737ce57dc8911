//! Error types for the permission-check client.

use thiserror::Error;

/// Errors raised while performing one bulk permission check.
///
/// An API-level rejection is not an error at this layer: it is returned as
/// [`CheckOutcome::Rejected`](super::CheckOutcome::Rejected) so the prober can
/// decide whether it is recoverable.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CheckError {
    /// The request could not be built or sent, or the body could not be read.
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// Endpoint URL of the failed call
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The request body could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// The response body was not valid JSON of the expected shape.
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// The response carried an `error` object without `status` or `message`.
    #[error("Malformed error body: missing {missing}")]
    MalformedErrorBody {
        /// The field that was absent
        missing: &'static str,
    },

    /// A non-success HTTP status arrived without an `error` object.
    #[error("Endpoint returned HTTP {status} without an error body")]
    UnexpectedStatus {
        /// The HTTP status code
        status: u16,
    },
}

impl CheckError {
    /// Check if this error happened before a response body was available.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, CheckError::Transport { .. })
    }

    /// Check if this error is an encoding or decoding failure.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, CheckError::Encode(_) | CheckError::Decode(_))
    }

    /// Check if the endpoint answered with something that cannot be interpreted.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            CheckError::MalformedErrorBody { .. } | CheckError::UnexpectedStatus { .. }
        )
    }
}
