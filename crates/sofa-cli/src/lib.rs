//! Command-line surface for the SOFA pipeline (§6, §10.4).
//!
//! `sofa-cli` owns argument parsing, terminal progress reporting, and config
//! resolution; every subcommand drives `sofa_core::orchestrator::Pipeline`
//! rather than calling the fetch/extract/assemble modules directly.

/// Subcommand implementations (§10.4).
pub mod cmd;
/// Terminal [`reporter::TerminalReporter`] implementation (§10.3).
pub mod reporter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SOFA -- Simple Organized Feed for Apple.
#[derive(Debug, Parser)]
#[command(name = "sofa")]
#[command(author, version, about = "Fetch, enrich, and publish Apple security-release feeds")]
pub struct Cli {
    /// Override the default `config/sofa.toml` location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the resolved cache/data directory for this invocation only.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Raise logging verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the Fetch stage only: index pages, then every other source.
    Gather(RunArgs),
    /// Synonym for `gather`, retained for the detail-page-only sub-step name
    /// used by the reference tooling this CLI is modeled on.
    Fetch(RunArgs),
    /// Run Process + Emit: extract, enrich, retain, and write v1/v2/RSS feeds.
    Build(RunArgs),
    /// Print a human-readable CVE/exploitation summary without writing feed files.
    Bulletin(BulletinArgs),
    /// Emit only the RSS view.
    Rss(RunArgs),
    /// Run the KEV/exploitation enrichment pass and print a summary.
    Cve(BulletinArgs),
    /// Run Fetch -> Process -> Emit end to end. Default when no subcommand is given.
    All(RunArgs),
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: clap_complete::Shell,
    },
}

/// Flags shared by every stage-running subcommand (§6 global flags).
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Skip re-fetching index pages; read whatever rows are already cached.
    #[arg(long)]
    pub skip_gather: bool,
    /// Skip fetching detail pages; the extractor falls back to index-row facts.
    #[arg(long)]
    pub skip_fetch: bool,
    /// Compare each platform's UpdateHash against the previous run and report changes.
    #[arg(long)]
    pub detect_changes: bool,
    /// Compare cache content_hashes against their previous value and report changes.
    #[arg(long)]
    pub detect_cache_changes: bool,
    /// Emit only the legacy v1 feed schema, skipping v2 and its manifest.
    #[arg(long)]
    pub use_legacy_v1: bool,
}

impl From<&RunArgs> for sofa_core::orchestrator::RunOptions {
    fn from(args: &RunArgs) -> Self {
        Self {
            skip_gather: args.skip_gather,
            skip_fetch: args.skip_fetch,
            detect_changes: args.detect_changes,
            detect_cache_changes: args.detect_cache_changes,
        }
    }
}

/// Flags for the `bulletin`/`cve` summary subcommands.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct BulletinArgs {
    /// Include cross-platform exploitation warnings in the printed summary.
    #[arg(long)]
    pub full_cve: bool,
}

/// Resolve a `Config`, applying `--config`/`--cache-dir` on top of the normal
/// defaults/file/env layering (§10.1); CLI flags are the highest-precedence layer.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<sofa_core::config::Config> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(sofa_core::paths::config_path);
    let mut config = sofa_core::config::Config::load(Some(&config_path))?;
    if let Some(dir) = &cli.cache_dir {
        config.data_root = dir.clone();
    }
    Ok(config)
}

/// Initialize `tracing-subscriber` from `-v`/`RUST_LOG`, per §10.3.
pub fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let default_level = match verbose {
        0 => "sofa=info",
        1 => "sofa=debug",
        _ => "sofa=trace,sofa_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
