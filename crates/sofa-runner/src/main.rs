//! Non-interactive all-stage runner for CI/cron use (§10.4): runs the full
//! `all` pipeline unattended, emits no prompts, and prints one
//! machine-parseable summary line on exit.

use anyhow::{Context, Result};
use clap::Parser;
use sofa_core::config::Config;
use sofa_core::orchestrator::{Pipeline, RunOptions};
use sofa_core::reporter::TracingReporter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Runs Fetch -> Process -> Emit once and exits; intended for cron/CI, not interactive use.
#[derive(Debug, Parser)]
#[command(name = "sofa-runner", about = "Unattended SOFA pipeline runner")]
struct Args {
    /// Override the default `config/sofa.toml` location.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip re-fetching index pages; read whatever rows are already cached.
    #[arg(long)]
    skip_gather: bool,
    /// Skip fetching detail pages; the extractor falls back to index-row facts.
    #[arg(long)]
    skip_fetch: bool,
    /// Compare each platform's UpdateHash against the previous run and report changes.
    #[arg(long)]
    detect_changes: bool,
    /// Compare cache content_hashes against their previous value and report changes.
    #[arg(long)]
    detect_cache_changes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sofa=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config_path = args.config.clone().unwrap_or_else(sofa_core::paths::config_path);
    let config = Config::load(Some(&config_path)).context("failed to resolve configuration")?;
    let pipeline = Pipeline::new(config, Arc::new(TracingReporter));

    let options = RunOptions {
        skip_gather: args.skip_gather,
        skip_fetch: args.skip_fetch,
        detect_changes: args.detect_changes,
        detect_cache_changes: args.detect_cache_changes,
    };
    let outcome = pipeline.run_all(&options).await;

    let ok_stages = outcome.stages.iter().filter(|s| s.ok).count();
    println!(
        "sofa-runner: exit_code={} stages_ok={}/{} stages={}",
        outcome.exit_code,
        ok_stages,
        outcome.stages.len(),
        outcome
            .stages
            .iter()
            .map(|s| format!("{}:{}", s.stage, if s.ok { "ok" } else { "fail" }))
            .collect::<Vec<_>>()
            .join(",")
    );

    std::process::exit(outcome.exit_code);
}
