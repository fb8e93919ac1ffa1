mod memberships;
mod progress;
mod styling;
mod summary;
mod tables;

pub use memberships::print_memberships;
pub use progress::{PhaseProgress, Spinner};
pub use styling::{banner, dim};
pub use summary::print_report;

/// Prints the azdo-toolbox banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        banner("🧰 azdo-toolbox"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Azure DevOps housekeeping")
    );
}
