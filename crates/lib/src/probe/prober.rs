//! Batch prober: resolves one shard with repeated bulk checks.
//!
//! The endpoint validates a batch atomically and names only one invalid
//! permission per failed call. The prober therefore treats an invalid name as
//! a poison pill: it removes that single occurrence and resubmits the rest of
//! the batch, until every candidate has been resolved.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{errors::ProbeError, shard::Shard};
use crate::{
    check::{CheckOutcome, PermissionChecker},
    constants::MAX_PERMISSIONS_PER_CALL,
};

/// Summary of a shard that finished without a fatal error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardReport {
    pub index: usize,
    /// Number of candidates the shard started with
    pub candidates: usize,
    /// Bulk-check calls issued
    pub calls: usize,
    /// Permissions emitted as granted
    pub granted: usize,
    /// Invalid names eliminated, in the order the endpoint reported them
    pub invalid: Vec<String>,
    /// Whether probing stopped because the run was cancelled
    pub cancelled: bool,
}

/// Probe every candidate of `shard`, sending granted names to `granted`.
///
/// Stops when the shard is exhausted, when `cancel` is observed at the top of
/// an iteration, or on the first unrecoverable error. Candidates left at that
/// point are abandoned.
pub async fn probe_shard(
    checker: &dyn PermissionChecker,
    shard: Shard,
    granted: &mpsc::UnboundedSender<String>,
    cancel: &CancellationToken,
) -> Result<ShardReport, ProbeError> {
    let mut report = ShardReport {
        index: shard.index,
        candidates: shard.len(),
        ..Default::default()
    };
    let mut remaining: VecDeque<String> = shard.permissions.into();

    while !remaining.is_empty() {
        if cancel.is_cancelled() {
            warn!(remaining = remaining.len(), "Shard cancelled");
            report.cancelled = true;
            break;
        }

        let batch_len = remaining.len().min(MAX_PERMISSIONS_PER_CALL);
        let batch: Vec<String> = remaining.range(..batch_len).cloned().collect();
        report.calls += 1;

        match checker.test_permissions(&batch).await? {
            CheckOutcome::Granted(permissions) => {
                if !permissions.is_empty() {
                    info!(permissions = ?permissions, "Found granted permission(s)");
                }
                for permission in permissions {
                    report.granted += 1;
                    if granted.send(permission).is_err() {
                        warn!("Output channel closed, dropping granted permission");
                    }
                }
                // Names missing from the response are valid but not held.
                remaining.drain(..batch_len);
            }
            CheckOutcome::Rejected(error) => {
                debug!(status = %error.status, detail = %error.message, "Got error");
                let invalid = error.invalid_permission().map(str::to_string);
                let Some(invalid) = invalid else {
                    return Err(ProbeError::Api(error));
                };

                let position = batch
                    .iter()
                    .position(|permission| *permission == invalid)
                    .ok_or_else(|| ProbeError::UnknownInvalidPermission {
                        permission: invalid.clone(),
                    })?;

                debug!(permission = %invalid, "Invalid permission detected");
                if position > 0 {
                    debug!(permissions = ?&batch[..position], "Valid permission(s) detected");
                }

                remaining.remove(position);
                report.invalid.push(invalid);
            }
        }
    }

    Ok(report)
}
