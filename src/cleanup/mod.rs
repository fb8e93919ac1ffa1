//! Retention-driven pipeline run cleanup.
//!
//! Enumerate every run, classify against a [`RetentionPolicy`], then
//! delete the selected runs and collect a [`CleanupReport`].

mod enumerator;
mod executor;
mod orchestrator;
mod policy;
pub(crate) mod run;

pub use executor::{CleanupOutcome, CleanupReport, SkipReason};
pub use orchestrator::{CleanupOptions, PipelineCleanup};
pub use policy::RetentionPolicy;
pub use run::{PipelineRun, PipelineTarget, PipelineType, RunReference};

#[cfg(test)]
pub(crate) use executor::RunOutcome;
