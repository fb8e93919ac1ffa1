use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;

use super::policy::RetentionPolicy;
use super::run::{recency_key, PipelineRun, PipelineTarget, RunId};
use crate::providers::AzureDevOpsClient;

/// Why a run was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Inside the keep window of the retention policy
    Kept,
    /// Selected for deletion, but this was a dry run
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum CleanupOutcome {
    Deleted,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub outcome: CleanupOutcome,
}

impl RunOutcome {
    pub fn new(run: &PipelineRun, outcome: CleanupOutcome) -> Self {
        Self {
            run_id: run.run_id,
            display_name: run.display_name.clone(),
            created_at: run.created_at,
            outcome,
        }
    }
}

/// Result of one pipeline cleanup: one outcome per enumerated run.
#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub organization: String,
    #[serde(flatten)]
    pub target: PipelineTarget,
    pub policy: RetentionPolicy,
    pub dry_run: bool,
    pub kept: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Runs a dry run would have deleted
    pub planned: usize,
    /// Failed run ids with their cause, in the order they were recorded
    pub failures: IndexMap<RunId, String>,
    pub outcomes: Vec<RunOutcome>,
}

impl CleanupReport {
    pub fn new(
        organization: &str,
        target: PipelineTarget,
        policy: RetentionPolicy,
        dry_run: bool,
    ) -> Self {
        Self {
            organization: organization.to_string(),
            target,
            policy,
            dry_run,
            kept: 0,
            deleted: 0,
            failed: 0,
            planned: 0,
            failures: IndexMap::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: RunOutcome) {
        match &outcome.outcome {
            CleanupOutcome::Deleted => self.deleted += 1,
            CleanupOutcome::Skipped(SkipReason::Kept) => self.kept += 1,
            CleanupOutcome::Skipped(SkipReason::DryRun) => self.planned += 1,
            CleanupOutcome::Failed(cause) => {
                self.failed += 1;
                self.failures.insert(outcome.run_id, cause.clone());
            }
        }
        self.outcomes.push(outcome);
    }

    /// True when no deletion failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Issues one delete per selected run, recording failures instead of
/// stopping the batch.
pub struct DeletionExecutor<'a> {
    client: &'a AzureDevOpsClient,
    concurrency: usize,
    remove_retention_leases: bool,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(
        client: &'a AzureDevOpsClient,
        concurrency: usize,
        remove_retention_leases: bool,
    ) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            remove_retention_leases,
        }
    }

    /// Deletes every run in `to_delete` and records one outcome per run.
    ///
    /// Up to `concurrency` deletes are in flight at once. Outcomes are
    /// collected independently and then recorded in recency order.
    pub async fn execute(&self, to_delete: Vec<PipelineRun>, report: &mut CleanupReport) {
        let mut outcomes: Vec<RunOutcome> = stream::iter(to_delete)
            .map(|run| self.delete_one(run))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|outcome| recency_key(outcome.created_at, outcome.run_id));

        for outcome in outcomes {
            report.record(outcome);
        }
    }

    async fn delete_one(&self, run: PipelineRun) -> RunOutcome {
        if run.retained && self.remove_retention_leases {
            if let Err(err) = self.client.release_retention(&run).await {
                warn!("Could not release retention on run {}: {err}", run.run_id);
                return RunOutcome::new(
                    &run,
                    CleanupOutcome::Failed(format!("failed to release retention: {err}")),
                );
            }
        }

        match self.client.delete_run(&run).await {
            Ok(()) => {
                debug!("Run {} ({}) deleted", run.run_id, run.display_name);
                RunOutcome::new(&run, CleanupOutcome::Deleted)
            }
            Err(err) => {
                warn!("Failed to delete run {}: {err}", run.run_id);
                RunOutcome::new(&run, CleanupOutcome::Failed(err.to_string()))
            }
        }
    }
}
