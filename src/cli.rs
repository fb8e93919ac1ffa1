use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::auth::{Token, PAT_ENV_VAR};
use crate::cleanup::{CleanupOptions, PipelineCleanup, PipelineTarget, PipelineType, RetentionPolicy};
use crate::config::Config;
use crate::membership::lookup_memberships;
use crate::output::{self, Spinner};
use crate::providers::AzureDevOpsClient;

#[derive(Parser)]
#[command(name = "azdo-toolbox")]
#[command(author, version, about = "Azure DevOps housekeeping toolbox", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the result as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Personal access token
    #[arg(long, global = true, env = PAT_ENV_VAR, hide_env_values = true)]
    pat: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete runs of a classic release or YAML pipeline under a retention policy
    PipelineCleanup(PipelineCleanupArgs),

    /// List the groups and teams a user belongs to
    UserManagement(UserManagementArgs),
}

#[derive(Args)]
struct PipelineCleanupArgs {
    /// Azure DevOps organization name
    #[arg(long)]
    organization: String,

    /// Azure DevOps project name
    #[arg(long)]
    project: String,

    /// Pipeline (definition) ID
    #[arg(long = "pipeline_id", visible_alias = "pipeline-id")]
    pipeline_id: u64,

    /// 'release' for a classic release pipeline, 'yaml' for a YAML pipeline
    #[arg(long = "pipeline_type", visible_alias = "pipeline-type", value_enum)]
    pipeline_type: PipelineType,

    #[command(flatten)]
    retention: RetentionArgs,

    /// Show which runs would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Parallel delete calls (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: Option<u16>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct RetentionArgs {
    /// Delete all runs
    #[arg(long)]
    all: bool,

    /// Number of most recent runs to keep; the rest are deleted
    #[arg(long, value_name = "N")]
    keep: Option<u32>,
}

#[derive(Args)]
struct UserManagementArgs {
    /// Azure DevOps organization name
    #[arg(long)]
    organization: String,

    /// Email address of the user
    #[arg(long = "user_email", visible_alias = "user-email")]
    user_email: String,
}

impl Cli {
    fn write_output(&self, value: &impl Serialize) -> Result<()> {
        let Some(output_path) = &self.output else {
            return Ok(());
        };

        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        std::fs::write(output_path, json_output)
            .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
        info!("Results written to: {}", output_path.display());

        Ok(())
    }

    async fn execute_pipeline_cleanup(
        &self,
        args: &PipelineCleanupArgs,
        token: Token,
        config: &Config,
    ) -> Result<ExitCode> {
        let policy = RetentionPolicy::from_flags(args.retention.all, args.retention.keep)?;

        let client = AzureDevOpsClient::new(&args.organization, token, config)?;

        let options = CleanupOptions {
            concurrency: args
                .concurrency
                .map_or(config.cleanup.concurrency, usize::from),
            remove_retention_leases: config.cleanup.remove_retention_leases,
            dry_run: args.dry_run,
        };

        let target = PipelineTarget {
            project: args.project.clone(),
            pipeline_id: args.pipeline_id,
            pipeline_type: args.pipeline_type,
        };

        let report = PipelineCleanup::new(&client, options)
            .run(&target, policy)
            .await
            .context("Pipeline cleanup aborted before any run was deleted")?;

        output::print_report(&report);
        self.write_output(&report)?;

        Ok(if report.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    async fn execute_user_management(
        &self,
        args: &UserManagementArgs,
        token: Token,
        config: &Config,
    ) -> Result<ExitCode> {
        let client = AzureDevOpsClient::new(&args.organization, token, config)?;
        let email = args.user_email.trim().to_lowercase();

        let spinner = Spinner::start(&format!("Resolving memberships for {email}"));
        let memberships = match lookup_memberships(&client, &email).await {
            Ok(memberships) => {
                spinner.finish("Resolved memberships");
                memberships
            }
            Err(err) => {
                spinner.fail("Could not resolve user");
                return Err(err).context(format!("User lookup failed for {email}"));
            }
        };

        output::print_memberships(&memberships);
        self.write_output(&memberships)?;

        Ok(ExitCode::SUCCESS)
    }

    pub async fn execute(&self) -> Result<ExitCode> {
        // Credential first: nothing touches the network without it
        let token = Token::require(self.pat.as_deref())?;
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::PipelineCleanup(args) => {
                self.execute_pipeline_cleanup(args, token, &config).await
            }
            Commands::UserManagement(args) => {
                self.execute_user_management(args, token, &config).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("azdo-toolbox").chain(args.iter().copied()))
    }

    fn cleanup_args(cli: &Cli) -> &PipelineCleanupArgs {
        match &cli.command {
            Commands::PipelineCleanup(args) => args,
            Commands::UserManagement(_) => panic!("expected pipeline-cleanup"),
        }
    }

    const BASE: &[&str] = &[
        "pipeline-cleanup",
        "--organization",
        "contoso",
        "--project",
        "web",
        "--pipeline_id",
        "12",
        "--pipeline_type",
        "yaml",
    ];

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_keep() {
        let args: Vec<_> = BASE.iter().copied().chain(["--keep", "3"]).collect();
        let cli = parse(&args).unwrap();
        let cleanup = cleanup_args(&cli);

        assert_eq!(cleanup.pipeline_id, 12);
        assert_eq!(cleanup.pipeline_type, PipelineType::Yaml);
        assert_eq!(cleanup.retention.keep, Some(3));
        assert!(!cleanup.retention.all);
        assert!(!cleanup.dry_run);
    }

    #[test]
    fn test_parse_all_with_kebab_aliases() {
        let cli = parse(&[
            "pipeline-cleanup",
            "--organization",
            "contoso",
            "--project",
            "web",
            "--pipeline-id",
            "7",
            "--pipeline-type",
            "release",
            "--all",
            "--dry-run",
        ])
        .unwrap();
        let cleanup = cleanup_args(&cli);

        assert_eq!(cleanup.pipeline_type, PipelineType::Release);
        assert!(cleanup.retention.all);
        assert!(cleanup.dry_run);
    }

    #[test]
    fn test_all_and_keep_are_mutually_exclusive() {
        let args: Vec<_> = BASE.iter().copied().chain(["--all", "--keep", "2"]).collect();
        assert!(parse(&args).is_err());
    }

    #[test]
    fn test_all_or_keep_is_required() {
        assert!(parse(BASE).is_err());
    }

    #[test]
    fn test_keep_must_be_non_negative() {
        let args: Vec<_> = BASE.iter().copied().chain(["--keep=-1"]).collect();
        assert!(parse(&args).is_err());
    }

    #[test]
    fn test_invalid_pipeline_type_rejected() {
        let args = [
            "pipeline-cleanup",
            "--organization",
            "contoso",
            "--project",
            "web",
            "--pipeline_id",
            "12",
            "--pipeline_type",
            "classic",
            "--all",
        ];
        assert!(parse(&args).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let args: Vec<_> = BASE
            .iter()
            .copied()
            .chain(["--all", "--concurrency", "0"])
            .collect();
        assert!(parse(&args).is_err());
    }

    #[test]
    fn test_parse_user_management() {
        let cli = parse(&[
            "user-management",
            "--organization",
            "contoso",
            "--user_email",
            "Jane@Example.com",
            "--output",
            "out.json",
        ])
        .unwrap();

        match &cli.command {
            Commands::UserManagement(args) => {
                assert_eq!(args.organization, "contoso");
                assert_eq!(args.user_email, "Jane@Example.com");
            }
            Commands::PipelineCleanup(_) => panic!("expected user-management"),
        }
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
    }

    #[tokio::test]
    async fn test_missing_pat_fails_before_any_request() {
        let args: Vec<_> = BASE.iter().copied().chain(["--all"]).collect();
        let mut cli = parse(&args).unwrap();
        cli.pat = None;

        let err = cli.execute().await.unwrap_err();
        assert!(err.to_string().contains(PAT_ENV_VAR));
    }
}
