use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failure, heading, pending, success};

/// Progress tracking for the three cleanup phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}  {}", heading("⚙️"), heading("Phases").underlined());
        let pb = create_spinner(pending("Phase 1/3: Fetching pipeline runs").to_string());
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, run_count: usize) -> Self {
        self.pb.finish_with_message(
            success(format!("Phase 1/3: Fetched {run_count} runs ✓")).to_string(),
        );
        let pb = create_spinner(pending("Phase 2/3: Applying retention policy").to_string());
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self, keep: usize, delete: usize, dry_run: bool) -> Self {
        self.pb.finish_with_message(
            success(format!(
                "Phase 2/3: Keeping {keep}, selected {delete} for deletion ✓"
            ))
            .to_string(),
        );
        let message = if dry_run {
            "Phase 3/3: Dry run, skipping deletions".to_string()
        } else {
            format!("Phase 3/3: Deleting {delete} runs")
        };
        let pb = create_spinner(pending(message).to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self, deleted: usize, failed: usize) {
        let message = if failed == 0 {
            success(format!("Phase 3/3: Deleted {deleted} runs ✓")).to_string()
        } else {
            failure(format!(
                "Phase 3/3: Deleted {deleted} runs, {failed} failed ✗"
            ))
            .to_string()
        };
        self.pb.finish_with_message(message);
        eprintln!();
    }

    /// Stops the current phase after a fatal error.
    pub fn abandon(self, reason: &str) {
        self.pb
            .abandon_with_message(failure(format!("Aborted: {reason} ✗")).to_string());
        eprintln!();
    }
}

/// Single spinner for short lookups outside the cleanup phases.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        Self {
            pb: create_spinner(pending(message).to_string()),
        }
    }

    pub fn finish(self, message: &str) {
        self.pb
            .finish_with_message(success(format!("{message} ✓")).to_string());
    }

    pub fn fail(self, message: &str) {
        self.pb
            .abandon_with_message(failure(format!("{message} ✗")).to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    // Template is a literal; fall back to the default style if it ever fails to parse
    let style = ProgressStyle::default_spinner()
        .template("  {msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
