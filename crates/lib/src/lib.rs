//!
//! iamprobe: discover which IAM permissions a caller effectively holds on a
//! GCP project.
//!
//! No API lists a caller's effective permissions, but `testIamPermissions`
//! answers "which of these do I hold?" for up to 100 names at a time. This
//! library turns that into full enumeration:
//!
//! * **Catalogs (`catalog::Catalog`)**: the ordered candidate permission names to probe.
//! * **Checkers (`check::PermissionChecker`)**: one bulk check against the endpoint. `check::HttpChecker` talks to the real API.
//! * **Prober (`probe::probe_shard`)**: resolves a shard of candidates, eliminating names the endpoint reports as invalid and retrying.
//! * **Scheduler (`probe::Scheduler`)**: runs one prober per shard concurrently and merges granted permissions and errors.
//! * **Sink (`probe::Sink`)**: streams granted permissions as lines or collects them for aggregate JSON output.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod catalog;
pub mod check;
pub mod config;
pub mod constants;
pub mod probe;

pub use catalog::Catalog;
pub use config::ProbeConfig;
pub use probe::{Findings, RunReport, Scheduler, Sink};

/// Result type used throughout the iamprobe library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the iamprobe library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid run configuration
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// Candidate catalog could not be loaded
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Catalog(_) => "catalog",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error was raised before any probing started.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Catalog(_))
    }
}

/// Probe every permission in `catalog` against the configured project.
///
/// Builds the HTTP checker from `config`, runs `config.tasks` shards and
/// returns once every shard has terminated. Shard failures are in the
/// returned report; only configuration problems are returned as errors.
pub async fn discover(
    config: &ProbeConfig,
    catalog: &Catalog,
    sink: Sink,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let checker = check::HttpChecker::from_config(config)?;
    info!(
        project = %config.project,
        candidates = catalog.len(),
        tasks = config.tasks,
        "Starting permission discovery"
    );

    let report = Scheduler::new(Arc::new(checker), config.tasks)?
        .with_cancellation(cancel)
        .run(catalog, sink)
        .await?;

    info!(
        granted = report.permissions.len(),
        errors = report.errors.len(),
        "Permission discovery finished"
    );
    Ok(report)
}
