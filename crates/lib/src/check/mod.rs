//! Permission-check client abstractions.
//!
//! The prober only needs one operation from the network: submit a batch of
//! permission names and learn which are granted. [`PermissionChecker`] is the
//! seam for that operation so the probing algorithm can run against the real
//! HTTP endpoint ([`http::HttpChecker`]) or a scripted checker in tests.

use async_trait::async_trait;

pub mod errors;
pub mod http;
pub mod protocol;

pub use errors::CheckError;
pub use http::{HttpChecker, HttpCheckerBuilder};
pub use protocol::ApiError;

/// Result of one bulk permission check that produced an interpretable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Names from the request that the caller holds. Names that are valid but
    /// not held are simply absent.
    Granted(Vec<String>),
    /// The endpoint refused the whole batch.
    Rejected(ApiError),
}

/// A bulk permission-check endpoint bound to one resource and one credential.
///
/// Implementations must be shareable across shard workers; each call is
/// independent and carries no state between batches.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Check a batch of at most
    /// [`MAX_PERMISSIONS_PER_CALL`](crate::constants::MAX_PERMISSIONS_PER_CALL) names.
    async fn test_permissions(&self, permissions: &[String]) -> Result<CheckOutcome, CheckError>;
}
