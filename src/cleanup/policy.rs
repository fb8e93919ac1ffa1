use std::fmt;

use serde::Serialize;

use super::run::{sort_by_recency, PipelineRun};
use crate::error::{Result, ToolboxError};

/// Which runs survive a cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "keep", rename_all = "kebab-case")]
pub enum RetentionPolicy {
    DeleteAll,
    KeepMostRecent(usize),
}

impl RetentionPolicy {
    /// Builds a policy from the `--all` / `--keep` flags.
    ///
    /// # Errors
    ///
    /// Returns `ToolboxError::Config` unless exactly one flag is supplied.
    pub fn from_flags(all: bool, keep: Option<u32>) -> Result<Self> {
        match (all, keep) {
            (true, None) => Ok(Self::DeleteAll),
            (false, Some(n)) => Ok(Self::KeepMostRecent(n as usize)),
            (true, Some(_)) => Err(ToolboxError::Config(
                "--all and --keep are mutually exclusive".to_string(),
            )),
            (false, None) => Err(ToolboxError::Config(
                "one of --all or --keep <N> is required".to_string(),
            )),
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteAll => f.write_str("delete all"),
            Self::KeepMostRecent(n) => write!(f, "keep {n} most recent"),
        }
    }
}

/// Runs split by a retention decision. Both halves stay in recency order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    pub to_keep: Vec<PipelineRun>,
    pub to_delete: Vec<PipelineRun>,
}

/// Splits `runs` into the runs to keep and the runs to delete.
///
/// The input is re-sorted by recency (ties by ascending id) so the result
/// does not depend on the order the API returned runs in.
pub fn classify(runs: &[PipelineRun], policy: RetentionPolicy) -> Partition {
    let mut ordered = runs.to_vec();
    sort_by_recency(&mut ordered);

    match policy {
        RetentionPolicy::DeleteAll => Partition {
            to_keep: Vec::new(),
            to_delete: ordered,
        },
        RetentionPolicy::KeepMostRecent(n) => {
            let to_delete = ordered.split_off(n.min(ordered.len()));
            Partition {
                to_keep: ordered,
                to_delete,
            }
        }
    }
}
