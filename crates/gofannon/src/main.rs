//! Gofannon - turns a GitHub issue into a committed code change.
//!
//! Main entry point for the Gofannon CLI.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use gofannon_agent::{AgentOrchestrator, IssueRunner, ToolContext, default_registry};
use gofannon_github::{GithubClient, GithubConfig};
use gofannon_llm::{
    AnthropicBackend, ModelFallbackChain, ModelRouter, OpenAiBackend, SharedBackend,
};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Gofannon - turns a GitHub issue into a committed code change
#[derive(Parser)]
#[command(name = "gofannon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository owner
    #[arg(long, env = "GOFANNON_OWNER")]
    owner: String,

    /// Repository name
    #[arg(long, env = "GOFANNON_REPO")]
    repo: String,

    /// Branch the work branch was forked from
    #[arg(long, env = "GOFANNON_BASE_BRANCH", default_value = "main")]
    base_branch: String,

    /// Branch to read from and commit to
    #[arg(long, env = "GOFANNON_WORK_BRANCH")]
    work_branch: String,

    /// GitHub token with contents and issues access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// Issue comment id carrying the progress bar
    #[arg(long, env = "GOFANNON_PROGRESS_COMMENT_ID")]
    progress_comment_id: Option<u64>,

    /// Models to try in order, comma separated
    #[arg(
        long,
        env = "GOFANNON_MODELS",
        value_delimiter = ',',
        default_value = "claude-sonnet-4-20250514,gpt-4.1"
    )]
    models: Vec<String>,

    /// Mark commits with [skip ci]
    #[arg(long, env = "GOFANNON_SKIP_CI")]
    skip_ci: bool,

    /// The issue text to resolve (reads stdin when omitted)
    #[arg(long)]
    issue_body: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "gofannon=debug,gofannon_agent=debug,gofannon_llm=debug,gofannon_github=debug,gofannon_patch=debug,info"
    } else {
        "gofannon=info,gofannon_agent=info,gofannon_llm=info,gofannon_github=info,warn"
    };
    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let issue_body = match cli.issue_body {
        Some(body) => body,
        None => {
            let mut buf = String::new();
            use std::io::Read as _;
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading the issue body from stdin")?;
            buf
        }
    };
    if issue_body.trim().is_empty() {
        anyhow::bail!("the issue body is empty; pass --issue-body or pipe it on stdin");
    }

    let anthropic: SharedBackend =
        Arc::new(AnthropicBackend::from_env().context("configuring the Anthropic backend")?);
    let openai: SharedBackend =
        Arc::new(OpenAiBackend::from_env().context("configuring the OpenAI backend")?);
    let router = ModelRouter::new(anthropic, openai);
    let chain = ModelFallbackChain::new(cli.models);

    let mut github_config = GithubConfig::new(
        cli.github_token,
        cli.owner.clone(),
        cli.repo.clone(),
        cli.work_branch.clone(),
    );
    if let Some(id) = cli.progress_comment_id {
        github_config = github_config.with_progress_comment(id);
    }
    let host = Arc::new(GithubClient::new(github_config).context("configuring the GitHub client")?);

    let ctx = ToolContext::new(cli.owner, cli.repo, cli.base_branch, cli.work_branch, host)
        .with_skip_ci(cli.skip_ci);
    let registry = default_registry().context("building the tool registry")?;

    let orchestrator = AgentOrchestrator::new(router, chain, registry, ctx, issue_body);
    let mut runner = IssueRunner::new(orchestrator);
    let summary = runner.run().await.context("running the issue loop")?;

    println!(
        "finished after {} rounds: committed={}, progress={}%, tokens in/out: {}/{}",
        summary.rounds,
        summary.committed,
        summary.progress_percent,
        summary.token_input_total,
        summary.token_output_total,
    );
    Ok(())
}
