//! Cache/resource administration (§4.1 "Maintenance", §10.4): `stats`,
//! `prune --older-than <days>`, and `verify` over the HTTP Cache.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sofa_core::cache::HttpCache;
use sofa_core::config::Config;
use std::path::PathBuf;

/// Inspect and maintain the SOFA HTTP Cache without running the pipeline.
#[derive(Debug, Parser)]
#[command(name = "sofa-admin", about = "SOFA cache/resource administration")]
struct Args {
    /// Override the default `config/sofa.toml` location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print cache entry count and total size on disk.
    Stats,
    /// Remove cache entries older than the given number of days.
    Prune {
        #[arg(long, default_value_t = 90)]
        older_than: i64,
    },
    /// Re-validate every cached parsed derivative as well-formed JSON.
    Verify,
}

fn load_cache(config_path: Option<&PathBuf>) -> Result<HttpCache> {
    let config_path = config_path
        .cloned()
        .unwrap_or_else(sofa_core::paths::config_path);
    let config = Config::load(Some(&config_path)).context("failed to resolve configuration")?;
    Ok(HttpCache::new(&config.http))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cache = load_cache(args.config.as_ref())?;

    match args.command {
        Command::Stats => {
            let stats = cache.stats();
            println!("entries: {}", stats.entry_count);
            println!("total_bytes: {}", stats.total_bytes);
        }
        Command::Prune { older_than } => {
            let removed = cache.prune(older_than).context("failed to prune cache")?;
            println!("removed {removed} entr{} older than {older_than} day(s)", if removed == 1 { "y" } else { "ies" });
        }
        Command::Verify => {
            let bad = cache.verify();
            if bad.is_empty() {
                println!("verify: all cache entries are well-formed JSON");
            } else {
                println!("verify: {} corrupt entr{} found", bad.len(), if bad.len() == 1 { "y" } else { "ies" });
                for key in &bad {
                    println!("  {key}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
