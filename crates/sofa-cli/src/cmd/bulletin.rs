//! `bulletin`/`cve`: run Process only and print a human-readable CVE/exploitation
//! summary to stdout without writing any feed files (§10.4).

use crate::reporter::TerminalReporter;
use crate::{resolve_config, BulletinArgs, Cli};
use anyhow::{Context, Result};
use sofa_core::orchestrator::Pipeline;
use sofa_schema::ExploitationSource;
use std::sync::Arc;

/// `bulletin`: plain per-platform CVE/exploitation counts, no cross-platform detail.
pub async fn bulletin(cli: &Cli, _args: &BulletinArgs) -> Result<i32> {
    print_summary(cli, false).await
}

/// `cve`: same pass, `--full-cve` additionally lists cross-platform warnings.
pub async fn cve(cli: &Cli, args: &BulletinArgs) -> Result<i32> {
    print_summary(cli, args.full_cve).await
}

async fn print_summary(cli: &Cli, full_cve: bool) -> Result<i32> {
    let config = resolve_config(cli).context("failed to resolve configuration")?;
    let pipeline = Pipeline::new(config, Arc::new(TerminalReporter::new()));
    let (releases, report) = pipeline
        .run_process()
        .context("while extracting/enriching releases from the cache")?;

    for platform in sofa_schema::Platform::ALL {
        let Some(platform_releases) = releases.get(&platform) else {
            continue;
        };
        if platform_releases.is_empty() {
            continue;
        }

        println!("== {} ==", platform.label());
        for release in platform_releases {
            let exploited = release.actively_exploited_cves();
            println!(
                "  {} (build {}): {} CVE(s), {} actively exploited",
                release.version,
                release.build,
                release.cves.len(),
                exploited.len()
            );
            for cve in &exploited {
                let detail = release.cve_details.get(cve.as_str());
                let confidence = detail.map(|d| d.exploitation.confidence).unwrap_or(sofa_schema::ExploitationConfidence::Low);
                println!("      {cve}  confidence={confidence:?}");
            }
            if full_cve {
                for (cve_str, detail) in &release.cve_details {
                    if detail.exploitation.sources.contains(&ExploitationSource::CrossPlatform) {
                        println!(
                            "      {cve_str}  cross-platform warning: {}",
                            detail.exploitation.notes.as_deref().unwrap_or("known exploited elsewhere")
                        );
                    }
                }
            }
        }
    }

    Ok(if report.ok { 0 } else { 2 })
}
