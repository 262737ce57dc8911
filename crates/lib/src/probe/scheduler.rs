//! Concurrent distribution of shards across prober tasks.

use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

use super::{
    errors::TaskError,
    prober::{ShardReport, probe_shard},
    shard::partition,
    sink::{Findings, Sink, drain_errors},
};
use crate::{
    Result,
    catalog::Catalog,
    check::PermissionChecker,
    config::validate_tasks,
};

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Granted permissions in arrival order
    pub permissions: Vec<String>,
    /// Every error reported during the run
    pub errors: Vec<TaskError>,
    /// Reports of shards that ended without a fatal error, in completion order
    pub shards: Vec<ShardReport>,
}

impl RunReport {
    /// The aggregate `{"permissions": [...]}` view of the run.
    pub fn findings(&self) -> Findings {
        Findings {
            permissions: self.permissions.clone(),
        }
    }

    /// True when no error was reported and no shard was cancelled.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.shards.iter().all(|s| !s.cancelled)
    }
}

/// Runs one prober per shard and merges their output.
pub struct Scheduler {
    checker: Arc<dyn PermissionChecker>,
    tasks: usize,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler with `tasks` concurrent shards (1 to 100).
    pub fn new(checker: Arc<dyn PermissionChecker>, tasks: usize) -> Result<Self> {
        let tasks = validate_tasks(tasks)?;
        Ok(Self {
            checker,
            tasks,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token for the run.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops every shard at its next iteration when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Probe the whole catalog and wait until every shard has terminated.
    ///
    /// Consumers are started before any worker. A failing shard is reported
    /// on the error stream and never stops its siblings.
    pub async fn run(&self, catalog: &Catalog, sink: Sink) -> Result<RunReport> {
        let shards = partition(catalog.permissions(), self.tasks)?;

        let (granted_tx, granted_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::channel(self.tasks);

        let errors_task = tokio::spawn(drain_errors(error_rx));
        let sink_task = tokio::spawn(sink.consume(granted_rx, error_tx.clone()));

        let mut workers = JoinSet::new();
        let mut shard_of_task = HashMap::new();
        for shard in shards {
            let checker = Arc::clone(&self.checker);
            let granted = granted_tx.clone();
            let errors = error_tx.clone();
            let cancel = self.cancel.clone();
            let index = shard.index;

            let handle = workers.spawn(
                async move {
                    let result = probe_shard(checker.as_ref(), shard, &granted, &cancel).await;
                    debug!("Task complete");
                    match result {
                        Ok(report) => Some(report),
                        Err(source) => {
                            let _ = errors.send(TaskError::Shard { shard: index, source }).await;
                            None
                        }
                    }
                }
                .instrument(info_span!("shard", index)),
            );
            shard_of_task.insert(handle.id(), index);
        }
        drop(granted_tx);

        let mut shard_reports = Vec::new();
        while let Some(joined) = workers.join_next_with_id().await {
            match joined {
                Ok((_, Some(report))) => {
                    debug!(
                        shard = report.index,
                        calls = report.calls,
                        granted = report.granted,
                        invalid = report.invalid.len(),
                        "Shard finished"
                    );
                    shard_reports.push(report);
                }
                Ok((_, None)) => {}
                Err(e) => {
                    let shard = shard_of_task.get(&e.id()).copied();
                    let _ = error_tx
                        .send(TaskError::Aborted {
                            shard,
                            reason: abort_reason(e),
                        })
                        .await;
                }
            }
        }

        // All workers are done; the sink ends once the last output sender drops.
        let permissions = match sink_task.await {
            Ok(permissions) => permissions,
            Err(e) => {
                let _ = error_tx
                    .send(TaskError::Aborted {
                        shard: None,
                        reason: format!("output consumer: {}", abort_reason(e)),
                    })
                    .await;
                Vec::new()
            }
        };
        drop(error_tx);

        let errors = errors_task.await.unwrap_or_else(|e| {
            error!(error = %e, "Error consumer aborted");
            Vec::new()
        });

        Ok(RunReport {
            permissions,
            errors,
            shards: shard_reports,
        })
    }
}

/// Describe a failed task by its panic message rather than tokio's task id.
fn abort_reason(error: JoinError) -> String {
    if !error.is_panic() {
        return "cancelled".to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
