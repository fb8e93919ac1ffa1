use log::{error, info};

use super::enumerator::enumerate_runs;
use super::executor::{CleanupOutcome, CleanupReport, DeletionExecutor, RunOutcome, SkipReason};
use super::policy::{classify, RetentionPolicy};
use super::run::PipelineTarget;
use crate::error::Result;
use crate::output::PhaseProgress;
use crate::providers::AzureDevOpsClient;

#[derive(Debug, Clone, Copy)]
pub struct CleanupOptions {
    /// Parallel delete calls
    pub concurrency: usize,
    /// Release `keepForever` / leases before deleting retained runs
    pub remove_retention_leases: bool,
    /// Classify only; issue no mutating calls
    pub dry_run: bool,
}

/// Runs a retention cleanup for one pipeline.
///
/// Progress is displayed in three phases:
/// 1. Enumerating every run of the pipeline
/// 2. Applying the retention policy
/// 3. Deleting the selected runs
///
/// Deletion starts only after the complete run list is known and the
/// policy has been evaluated against it.
pub struct PipelineCleanup<'a> {
    client: &'a AzureDevOpsClient,
    options: CleanupOptions,
}

impl<'a> PipelineCleanup<'a> {
    pub fn new(client: &'a AzureDevOpsClient, options: CleanupOptions) -> Self {
        Self { client, options }
    }

    /// # Errors
    ///
    /// Returns the enumeration or authentication error when the run list
    /// cannot be fetched completely; in that case no run is deleted.
    /// Per-run delete failures are recorded in the report instead.
    pub async fn run(
        &self,
        target: &PipelineTarget,
        policy: RetentionPolicy,
    ) -> Result<CleanupReport> {
        info!(
            "Starting cleanup of {} pipeline {} in {}/{} ({policy})",
            target.pipeline_type,
            target.pipeline_id,
            self.client.organization(),
            target.project
        );

        // Phase 1: enumerate
        let progress = PhaseProgress::start_phase_1();
        let runs = match enumerate_runs(self.client, target).await {
            Ok(runs) => runs,
            Err(err) => {
                error!("Enumeration failed, no runs were deleted: {err}");
                progress.abandon("could not list pipeline runs");
                return Err(err);
            }
        };

        // Phase 2: classify
        let progress = progress.finish_phase_1_start_phase_2(runs.len());
        let partition = classify(&runs, policy);
        info!(
            "Keeping {} run(s), {} selected for deletion",
            partition.to_keep.len(),
            partition.to_delete.len()
        );

        let mut report = CleanupReport::new(
            self.client.organization(),
            target.clone(),
            policy,
            self.options.dry_run,
        );
        for run in &partition.to_keep {
            report.record(RunOutcome::new(run, CleanupOutcome::Skipped(SkipReason::Kept)));
        }

        // Phase 3: execute
        let progress = progress.finish_phase_2_start_phase_3(
            partition.to_keep.len(),
            partition.to_delete.len(),
            self.options.dry_run,
        );

        if self.options.dry_run {
            for run in &partition.to_delete {
                report.record(RunOutcome::new(
                    run,
                    CleanupOutcome::Skipped(SkipReason::DryRun),
                ));
            }
        } else {
            DeletionExecutor::new(
                self.client,
                self.options.concurrency,
                self.options.remove_retention_leases,
            )
            .execute(partition.to_delete, &mut report)
            .await;
        }

        progress.finish_phase_3(report.deleted, report.failed);
        info!(
            "Cleanup finished: kept {}, deleted {}, failed {}",
            report.kept, report.deleted, report.failed
        );

        Ok(report)
    }
}
