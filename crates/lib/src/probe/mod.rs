//! Permission discovery engine.
//!
//! A [`Catalog`](crate::Catalog) is split into contiguous [`Shard`]s, each
//! resolved by [`probe_shard`] on its own task. The [`Scheduler`] wires the
//! workers to two channels: granted permissions flow to a [`Sink`] and
//! failures to an error consumer. Both consumers own their data exclusively.

pub mod errors;
pub mod prober;
pub mod scheduler;
pub mod shard;
pub mod sink;

pub use errors::{ProbeError, TaskError};
pub use prober::{ShardReport, probe_shard};
pub use scheduler::{RunReport, Scheduler};
pub use shard::{Shard, partition};
pub use sink::{Findings, OutputWriter, Sink};
