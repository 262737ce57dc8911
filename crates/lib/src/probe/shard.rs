//! Partitioning of a catalog into contiguous shards.

use crate::config::{ConfigError, validate_tasks};

/// A contiguous run of candidates probed by one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shard {
    /// Position of this shard in the partition
    pub index: usize,
    pub permissions: Vec<String>,
}

impl Shard {
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

/// Split `candidates` into exactly `tasks` contiguous shards.
///
/// Every shard gets `len / tasks` candidates and the last one also takes the
/// remainder, so concatenating the shards in index order yields `candidates`.
/// When there are fewer candidates than tasks, the leading shards are empty.
pub fn partition(candidates: &[String], tasks: usize) -> Result<Vec<Shard>, ConfigError> {
    let tasks = validate_tasks(tasks)?;
    let size = candidates.len() / tasks;

    let shards = (0..tasks)
        .map(|index| {
            let start = index * size;
            let end = if index + 1 == tasks {
                candidates.len()
            } else {
                start + size
            };
            Shard {
                index,
                permissions: candidates[start..end].to_vec(),
            }
        })
        .collect();
    Ok(shards)
}
