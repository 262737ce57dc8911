//! Error types for shard probing.

use thiserror::Error;

use crate::check::{ApiError, CheckError};

/// Fatal conditions that end probing of a single shard.
///
/// Invalid-permission rejections never surface here; the prober consumes them
/// to shrink the shard and retry.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The bulk check itself failed (transport, encoding or protocol).
    #[error(transparent)]
    Check(#[from] CheckError),

    /// The endpoint rejected the batch for a reason other than an invalid name.
    #[error("error: {0}")]
    Api(ApiError),

    /// The endpoint cited an invalid permission that was not in the batch.
    #[error("endpoint rejected {permission}, which was not in the submitted batch")]
    UnknownInvalidPermission { permission: String },
}

impl ProbeError {
    /// The API rejection behind this error, if the endpoint answered with one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ProbeError::Api(error) => Some(error),
            _ => None,
        }
    }
}

/// An error reported on the run's error stream.
///
/// None of these stop the run; they are collected and logged while the
/// remaining shards carry on.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TaskError {
    /// A shard stopped early; its remaining candidates were abandoned.
    #[error("shard {shard} failed: {source}")]
    Shard {
        shard: usize,
        #[source]
        source: ProbeError,
    },

    /// A worker or consumer task panicked or was aborted.
    ///
    /// `shard` is set when the task was a shard's prober.
    #[error("task aborted: {reason}")]
    Aborted {
        shard: Option<usize>,
        reason: String,
    },

    /// A confirmed permission could not be written to the output.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl TaskError {
    /// Index of the shard this error belongs to, if any.
    pub fn shard(&self) -> Option<usize> {
        match self {
            TaskError::Shard { shard, .. } => Some(*shard),
            TaskError::Aborted { shard, .. } => *shard,
            TaskError::Output(_) => None,
        }
    }

    /// Check if this error came from writing output rather than probing.
    pub fn is_output_error(&self) -> bool {
        matches!(self, TaskError::Output(_))
    }
}
