use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod changelog;
mod config;
mod context;
mod error;
mod github;
mod outputs;

use changelog::{ChangelogBuilder, DEFAULT_BATCH_SIZE};
use context::{ContextInputs, RunContext};
use github::client::DEFAULT_API_URL;
use github::GitHubClient;
use outputs::OutputFormat;

#[derive(Parser)]
#[command(name = "tag-release-bridge")]
#[command(about = "Build a release changelog from pull requests merged since the previous tag")]
struct Cli {
    /// GitHub token (can also be set via GITHUB_TOKEN env var)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: String,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Branch the changelog is built for (defaults to the pull request head)
    #[arg(long)]
    head_ref: Option<String>,

    /// Commit the changelog is built for (defaults to the pull request head)
    #[arg(long)]
    head_sha: Option<String>,

    /// Pull request that receives the changelog comment
    #[arg(long)]
    pr_number: Option<u64>,

    #[arg(long, env = "GITHUB_EVENT_PATH", hide = true)]
    event_path: Option<PathBuf>,

    #[arg(long = "github-ref", env = "GITHUB_REF", hide = true)]
    git_ref: Option<String>,

    #[arg(long = "github-sha", env = "GITHUB_SHA", hide = true)]
    sha: Option<String>,
}

impl TargetArgs {
    fn inputs(&self, repository: &str) -> ContextInputs {
        ContextInputs {
            repository: repository.to_string(),
            head_ref: self.head_ref.clone(),
            head_sha: self.head_sha.clone(),
            pr_number: self.pr_number,
            event_path: self.event_path.clone(),
            git_ref: self.git_ref.clone(),
            sha: self.sha.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the changelog and optionally post it on the pull request
    Generate {
        /// Regex the head ref must match for a changelog to be built
        #[arg(long, env = "BRANCH_PATTERN", default_value = "release/.+")]
        branch_pattern: String,

        /// Configuration file (YAML, JSON or TOML)
        #[arg(
            short,
            long,
            env = "CHANGELOG_CONFIGURATION",
            default_value = ".github/release-changelog-builder-config.yml"
        )]
        configuration: PathBuf,

        /// Create or update the changelog comment on the pull request
        #[arg(long, env = "POST_COMMENT", default_value_t = true, action = clap::ArgAction::Set)]
        post_comment: bool,

        /// Maximum concurrent requests per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        concurrency: usize,

        /// Output format
        #[arg(short = 'f', long, default_value = "markdown")]
        format: OutputFormat,

        /// Output file path for the body (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, env = "GITHUB_OUTPUT", hide = true)]
        github_output: Option<PathBuf>,
    },

    /// Print the tag the changelog would start from
    PreviousTag,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            println!("::error::{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let inputs = cli.target.inputs(&cli.repository);

    match cli.command {
        Commands::Generate {
            branch_pattern,
            configuration,
            post_comment,
            concurrency,
            format,
            output,
            github_output,
        } => {
            let pattern = context::compile_branch_pattern(&branch_pattern)?;
            let ctx = RunContext::resolve(&inputs)?;
            let config = config::load(&configuration)?;
            let client = GitHubClient::new(cli.token, ctx.owner.clone(), ctx.repo.clone(), &cli.api_url)?;

            let result = ChangelogBuilder::new(&client, &config)
                .batch_size(concurrency)
                .generate(&pattern, &ctx, post_comment)
                .await
                .context("failed to generate changelog")?;

            if let Some(path) = github_output {
                outputs::write_workflow_outputs(&path, &result)?;
            }
            if let Some(path) = output {
                std::fs::write(&path, &result.body)?;
                info!("Changelog written to {}", path.display());
            } else {
                println!("{}", outputs::format_output(&result, format)?);
            }
        }
        Commands::PreviousTag => {
            let ctx = RunContext::resolve(&inputs)?;
            let client = GitHubClient::new(cli.token, ctx.owner.clone(), ctx.repo.clone(), &cli.api_url)?;
            let config = config::ResolvedConfig::default();

            let tag = ChangelogBuilder::new(&client, &config)
                .previous_tag(ctx.head_sha()?)
                .await?;
            println!("{}", tag.unwrap_or_default());
        }
    }

    Ok(())
}
