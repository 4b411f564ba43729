//! `gather`/`fetch`/`build`/`rss`/`all`: every subcommand that drives stages
//! of `sofa_core::orchestrator::Pipeline` directly (§10.4 subcommand semantics).

use crate::reporter::TerminalReporter;
use crate::{resolve_config, Cli, RunArgs};
use anyhow::{Context, Result};
use sofa_core::orchestrator::{Pipeline, RunOptions};
use std::sync::Arc;

fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let config = resolve_config(cli).context("failed to resolve configuration")?;
    Ok(Pipeline::new(config, Arc::new(TerminalReporter::new())))
}

/// `gather`/`fetch`: Fetch stage only.
pub async fn gather(cli: &Cli, args: &RunArgs) -> Result<i32> {
    let pipeline = build_pipeline(cli)?;
    let options: RunOptions = args.into();
    match pipeline.run_fetch(&options).await {
        Ok(report) => Ok(if report.ok { 0 } else { 2 }),
        Err(e) => {
            eprintln!("fetch stage failed: {e}");
            Ok(2)
        }
    }
}

/// `build`: Process + Emit, no network.
pub async fn build(cli: &Cli, args: &RunArgs) -> Result<i32> {
    let mut pipeline = build_pipeline(cli)?;
    if args.use_legacy_v1 {
        let mut config = pipeline.config().clone();
        config.use_legacy_v1 = true;
        pipeline = Pipeline::new(config, Arc::new(TerminalReporter::new()));
    }
    let (releases, process_report) = pipeline
        .run_process()
        .context("while extracting/enriching releases from the cache")?;
    let options: RunOptions = args.into();
    let emit_report = pipeline
        .run_emit(releases, &options)
        .context("while writing feed output")?;
    Ok(if process_report.ok && emit_report.ok { 0 } else { 2 })
}

/// `rss`: Process, then only the RSS channel per platform (no v1/v2 JSON).
pub async fn rss_only(cli: &Cli) -> Result<i32> {
    let pipeline = build_pipeline(cli)?;
    let (releases, _) = pipeline
        .run_process()
        .context("while extracting/enriching releases from the cache")?;

    sofa_core::paths::ensure_layout().context("while preparing the output directory tree")?;
    for platform in sofa_schema::Platform::ALL {
        let platform_releases = releases.get(&platform).cloned().unwrap_or_default();
        let groups = sofa_core::feed_assembler::group_by_os_version(platform, platform_releases);
        let ref_groups: Vec<(String, Vec<&sofa_schema::ReleaseRecord>)> =
            groups.iter().map(|(label, recs)| (label.clone(), recs.iter().collect())).collect();
        let feed_url = format!(
            "https://sofa.example/v1/{}",
            sofa_schema::feed::feed_filename(platform)
        );
        let xml = sofa_core::rss::render_channel(platform, &ref_groups, &feed_url);
        let path = sofa_core::paths::feeds_v1_dir().join(format!("{}_rss_feed.xml", platform.slug()));
        sofa_core::atomic::write_atomic_bytes(&path, xml.as_bytes())
            .with_context(|| format!("while writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(0)
}

/// `all`: Fetch -> Process -> Emit end to end, the default subcommand.
pub async fn all(cli: &Cli, args: &RunArgs) -> Result<i32> {
    let mut pipeline = build_pipeline(cli)?;
    if args.use_legacy_v1 {
        let mut config = pipeline.config().clone();
        config.use_legacy_v1 = true;
        pipeline = Pipeline::new(config, Arc::new(TerminalReporter::new()));
    }
    let options: RunOptions = args.into();
    let outcome = pipeline.run_all(&options).await;
    Ok(outcome.exit_code)
}
