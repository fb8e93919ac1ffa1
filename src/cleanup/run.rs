use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier of a build or release.
///
/// Unique only within (organization, project, pipeline, pipeline type).
pub type RunId = u64;

/// Pipeline definition style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineType {
    /// Classic release pipeline (Release Management API)
    Release,
    /// YAML pipeline (Build API)
    Yaml,
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => f.write_str("release"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

/// The pipeline whose runs are being cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineTarget {
    pub project: String,
    pub pipeline_id: u64,
    pub pipeline_type: PipelineType,
}

/// Handle needed to issue mutating calls for a run.
///
/// Builds and releases live behind different hosts and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunReference {
    Build { project: String, build_id: u64 },
    Release { project: String, release_id: u64 },
}

/// One recorded execution of a pipeline, normalised from either API shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub pipeline_type: PipelineType,
    /// Build number or release name
    pub display_name: String,
    /// Run is protected by `keepForever` or a retention lease
    pub retained: bool,
    #[serde(skip)]
    pub reference: RunReference,
}

/// Sort key for recency order: most recent first, timestamp ties broken by
/// ascending id. Shared by everything that lists runs.
pub fn recency_key(
    created_at: DateTime<Utc>,
    run_id: RunId,
) -> (Reverse<DateTime<Utc>>, RunId) {
    (Reverse(created_at), run_id)
}

pub fn sort_by_recency(runs: &mut [PipelineRun]) {
    runs.sort_by_key(|run| recency_key(run.created_at, run.run_id));
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, TimeZone};

    use super::*;

    /// Build run created `minutes` after a fixed epoch.
    pub fn build_run(run_id: RunId, minutes: i64) -> PipelineRun {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PipelineRun {
            run_id,
            created_at: base + Duration::minutes(minutes),
            pipeline_type: PipelineType::Yaml,
            display_name: format!("20240101.{run_id}"),
            retained: false,
            reference: RunReference::Build {
                project: "project".to_string(),
                build_id: run_id,
            },
        }
    }
}
