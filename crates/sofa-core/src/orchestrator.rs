//! Three-stage Fetch/Process/Emit controller (§4.9).
//!
//! Fetch is fail-tolerant per source and writes everything it learns straight
//! into the HTTP Cache; Process reads only from the cache and never touches
//! the network; Emit writes the feed tree atomically. `sofa-cli`, `sofa-runner`,
//! and `sofa-admin` all drive the pipeline through [`Pipeline`] rather than
//! calling the fetch/extract/assemble modules directly.

use crate::cache::HttpCache;
use crate::config::Config;
use crate::error::{FeedError, FetchError, ProcessError};
use crate::fetch::{
    BetaReleasesScraper, DetailPageFetcher, GdmfClient, KevClient, SecurityIndexFetcher,
    XProtectClient, XProtectSnapshot,
};
use crate::reporter::Reporter;
use crate::{extractor, feed_assembler, gdmf_merge, kev_detector, retention, rss};
use sofa_schema::feed::{Manifest, ManifestEntry, TimestampDocument, TimestampEntry};
use sofa_schema::{ComponentCategory, CveDetail, Platform, ReleaseRecord, Sha256Hex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of fetching, or re-checking, one named source within a stage.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    /// Human-readable source name, e.g. `"gdmf"` or an index-page id.
    pub name: String,
    /// Whether this source was fetched (or read from cache) successfully.
    pub ok: bool,
    /// Failure detail when `ok` is `false`.
    pub error: Option<String>,
}

/// Per-stage summary returned to the caller and handed to the [`Reporter`].
#[derive(Debug, Clone)]
pub struct StageReport {
    /// `"Fetch"`, `"Process"`, or `"Emit"`.
    pub stage: &'static str,
    /// Whether the stage as a whole succeeded.
    pub ok: bool,
    /// Wall-clock time the stage took.
    pub elapsed: Duration,
    /// Per-source outcomes collected during the stage.
    pub sources: Vec<SourceOutcome>,
}

/// The whole run's result: one [`StageReport`] per stage attempted, and the
/// process exit code the CLI should use (§7: 0 success, 1 fatal config, 2 any
/// stage reported failure).
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// One report per stage that actually ran.
    pub stages: Vec<StageReport>,
    /// The process exit code the caller should use.
    pub exit_code: i32,
}

/// Flags that select which stages `run_all` performs and how Emit behaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip re-fetching index pages; read whatever rows are already cached.
    pub skip_gather: bool,
    /// Skip fetching detail pages; the extractor falls back to index-row facts.
    pub skip_fetch: bool,
    /// Compare each platform's `UpdateHash` against the previous run and report changes.
    pub detect_changes: bool,
    /// Compare cache `content_hash`es against their previous value and report changes.
    pub detect_cache_changes: bool,
}

/// Spawns every fetcher/extractor/enrichment/assembler call in sequence for one run.
pub struct Pipeline {
    config: Config,
    cache: Arc<HttpCache>,
    reporter: Arc<dyn Reporter>,
}

impl Pipeline {
    /// Build a pipeline from a resolved [`Config`] and a [`Reporter`] implementation.
    pub fn new(config: Config, reporter: Arc<dyn Reporter>) -> Self {
        let cache = Arc::new(HttpCache::new(&config.http));
        Self { config, cache, reporter }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<HttpCache> {
        &self.cache
    }

    /// Fetch stage (§4.2, §4.9): index pages, detail pages, then GDMF, KEV,
    /// XProtect, and the beta-releases archive, each independently
    /// fail-tolerant. Fails hard only if every enabled index page fails.
    pub async fn run_fetch(&self, options: &RunOptions) -> Result<StageReport, FetchError> {
        let start = Instant::now();
        self.reporter.stage_start("Fetch");
        let mut sources = Vec::new();
        let mut any_index_ok = false;

        for page in &self.config.index_pages {
            if !page.enabled {
                continue;
            }
            if options.skip_gather {
                let cached = self.cache.get_parsed::<Vec<crate::fetch::IndexRow>>(&page.url).is_some();
                if cached {
                    any_index_ok = true;
                    sources.push(SourceOutcome { name: page.id.clone(), ok: true, error: None });
                    self.reporter.source_done("Fetch", &page.id, "cached");
                } else {
                    sources.push(SourceOutcome {
                        name: page.id.clone(),
                        ok: false,
                        error: Some("--skip-gather: no cached index rows".into()),
                    });
                    self.reporter.source_failed("Fetch", &page.id, "no cached rows");
                }
                continue;
            }

            match SecurityIndexFetcher::fetch(&self.cache, &page.url).await {
                Ok(_) => {
                    any_index_ok = true;
                    sources.push(SourceOutcome { name: page.id.clone(), ok: true, error: None });
                    self.reporter.source_done("Fetch", &page.id, "fetched");
                }
                Err(e) => {
                    sources.push(SourceOutcome { name: page.id.clone(), ok: false, error: Some(e.to_string()) });
                    self.reporter.source_failed("Fetch", &page.id, &e.to_string());
                }
            }
        }

        if !any_index_ok {
            self.reporter.stage_done("Fetch", start.elapsed(), false);
            return Err(FetchError::FetchStageFailed);
        }

        if !options.skip_fetch {
            let mut candidates = Vec::new();
            for page in &self.config.index_pages {
                if !page.enabled {
                    continue;
                }
                let Some(rows) = self.cache.get_parsed::<Vec<crate::fetch::IndexRow>>(&page.url) else {
                    continue;
                };
                for row in rows {
                    if let Some(url) = row.detail_url {
                        candidates.push((url, None));
                    }
                }
            }
            let results = DetailPageFetcher::fetch_all(
                Arc::clone(&self.cache),
                candidates,
                &self.config.detail_pages,
                self.config.http.detail_fetch_workers,
                self.config.http.rate_limit_delay_secs,
                &crate::paths::failed_detail_urls_path(),
            )
            .await;
            sources.push(SourceOutcome {
                name: "detail_pages".into(),
                ok: true,
                error: None,
            });
            self.reporter.source_done("Fetch", "detail_pages", &format!("{} fetched", results.len()));
        }

        macro_rules! try_source {
            ($name:expr, $future:expr) => {{
                match $future.await {
                    Ok(_) => {
                        sources.push(SourceOutcome { name: $name.into(), ok: true, error: None });
                        self.reporter.source_done("Fetch", $name, "fetched");
                    }
                    Err(e) => {
                        sources.push(SourceOutcome { name: $name.into(), ok: false, error: Some(e.to_string()) });
                        self.reporter.source_failed("Fetch", $name, &e.to_string());
                    }
                }
            }};
        }

        try_source!("gdmf", GdmfClient::fetch(&self.cache, &self.config.http, &self.config.gdmf));
        try_source!("kev", KevClient::fetch(&self.cache, &self.config.kev));
        try_source!("xprotect", XProtectClient::fetch(&self.cache, &self.config.xprotect));

        if self.config.beta.enabled {
            match BetaReleasesScraper::fetch(&self.cache, &self.config.beta.releases_url, &self.config.beta).await {
                Ok(fresh) => {
                    let archive_path = crate::paths::resources_dir().join("apple_beta_os_history.json");
                    let mut archive: Vec<crate::fetch::BetaEntry> = std::fs::read_to_string(&archive_path)
                        .ok()
                        .and_then(|t| serde_json::from_str(&t).ok())
                        .unwrap_or_default();
                    BetaReleasesScraper::merge_archive(&mut archive, fresh);
                    if let Some(parent) = archive_path.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    if let Ok(json) = serde_json::to_vec_pretty(&archive) {
                        let _ = std::fs::write(&archive_path, json);
                    }
                    sources.push(SourceOutcome { name: "beta".into(), ok: true, error: None });
                    self.reporter.source_done("Fetch", "beta", "fetched");
                }
                Err(e) => {
                    sources.push(SourceOutcome { name: "beta".into(), ok: false, error: Some(e.to_string()) });
                    self.reporter.source_failed("Fetch", "beta", &e.to_string());
                }
            }
        }

        let ok = sources.iter().any(|s| s.ok);
        let elapsed = start.elapsed();
        self.reporter.stage_done("Fetch", elapsed, ok);
        Ok(StageReport { stage: "Fetch", ok, elapsed, sources })
    }

    /// Process stage (§4.3-§4.7, §4.9): deterministic, no network. Reads every
    /// cached index row and detail page, extracts release facts, folds in
    /// GDMF/KEV enrichment and component normalization, then applies pinning
    /// and retention. Never fails outright; rows that can't yield a usable
    /// version/date, or whose major version is below the platform's minimum
    /// supported version (§4.3), are dropped and reported via the [`Reporter`].
    pub fn run_process(&self) -> Result<(BTreeMap<Platform, Vec<ReleaseRecord>>, StageReport), ProcessError> {
        let start = Instant::now();
        self.reporter.stage_start("Process");

        let gdmf_asset_sets: BTreeMap<String, Vec<sofa_schema::GdmfAsset>> =
            self.cache.get_parsed(&self.config.gdmf.base_url).unwrap_or_default();
        let gdmf = crate::fetch::GdmfSnapshot { asset_sets: gdmf_asset_sets };

        let kev_entries: BTreeMap<String, sofa_schema::KevEntry> =
            self.cache.get_parsed(&self.config.kev.cisa_kev_url).unwrap_or_default();
        let kev = crate::fetch::KevSnapshot { entries: kev_entries };

        let mut detector = kev_detector::KevDetector::new();
        let mut by_platform: BTreeMap<Platform, Vec<ReleaseRecord>> = BTreeMap::new();
        let mut dropped = 0usize;

        for page in &self.config.index_pages {
            if !page.enabled {
                continue;
            }
            let Some(rows) = self.cache.get_parsed::<Vec<crate::fetch::IndexRow>>(&page.url) else {
                continue;
            };

            for row in rows {
                let Some(platform) = row.os_type else {
                    continue;
                };

                let html = row
                    .detail_url
                    .as_deref()
                    .and_then(|url| self.cache.read_cached_raw(url));

                let extracted = match (&row.detail_url, &html) {
                    (Some(url), Some(html)) => extractor::parse_detail_page(url.as_str(), html.as_str()),
                    _ => extractor::basic_info(
                        row.detail_url.as_deref().unwrap_or(page.url.as_str()),
                        row.name.as_str(),
                        Some(row.date.as_str()),
                    ),
                };

                let Some(version) = extracted.version.clone() else {
                    dropped += 1;
                    continue;
                };
                let release_date_text = extracted.release_date_text.as_deref().unwrap_or(row.date.as_str());
                let Some(release_date) = extractor::parse_apple_date(release_date_text, &self.config.date_locale)
                else {
                    dropped += 1;
                    continue;
                };

                if let Some(&floor) = self.config.min_supported_versions.get(platform.slug()) {
                    if retention::major_version_of(&version) < floor {
                        dropped += 1;
                        continue;
                    }
                }

                let gdmf_match = gdmf_merge::find_gdmf_match(&gdmf, platform, &version);
                let mut all_builds: std::collections::BTreeSet<String> =
                    gdmf_match.all_builds.iter().cloned().collect();
                let build = extracted
                    .build
                    .clone()
                    .or_else(|| gdmf_match.representative_build.clone())
                    .unwrap_or_default();
                all_builds.insert(build.clone());

                let mut cve_details = std::collections::BTreeMap::new();
                if let Some(html) = &html {
                    for section in extractor::extract_cve_sections(html) {
                        let category = crate::component_normalizer::normalize(&section.component_raw);
                        let section_text =
                            format!("{} {}", section.impact.clone().unwrap_or_default(), section.description.clone().unwrap_or_default());
                        for cve in &section.cves {
                            let exploitation = detector.get_exploitation_status(
                                cve,
                                Some(&section_text),
                                platform,
                                kev.contains(cve.as_str()),
                            );
                            cve_details.insert(
                                cve.as_str().to_string(),
                                CveDetail {
                                    exploitation,
                                    component: category,
                                    component_raw: section.component_raw.clone(),
                                    impact: section.impact.clone(),
                                    description: section.description.clone(),
                                },
                            );
                        }
                    }
                }
                for cve in &extracted.cves {
                    cve_details.entry(cve.as_str().to_string()).or_insert_with(|| CveDetail {
                        exploitation: detector.get_exploitation_status(cve, None, platform, kev.contains(cve.as_str())),
                        component: ComponentCategory::System,
                        component_raw: String::new(),
                        impact: None,
                        description: None,
                    });
                }

                let title = if extracted.title.is_empty() { row.name.clone() } else { extracted.title.clone() };
                let expiration_date = gdmf_match.expiration_date.as_deref().and_then(parse_gdmf_date);

                let record = ReleaseRecord {
                    platform,
                    version: sofa_schema::PackagingVersion::new(version),
                    build,
                    title: title.clone(),
                    release_date,
                    url: row.detail_url.clone().unwrap_or_else(|| page.url.clone()),
                    cves: extracted.cves.clone(),
                    cve_details,
                    supported_devices: gdmf_match.supported_devices,
                    all_builds: all_builds.into_iter().collect(),
                    expiration_date,
                    release_type: determine_release_type(platform, &title),
                    days_since_previous: None,
                    is_pinned: false,
                };
                by_platform.entry(platform).or_default().push(record);
            }
        }

        let pins = self.config.pinned_versions.clone();
        for (platform, releases) in by_platform.iter_mut() {
            releases.sort_by(|a, b| a.identity().cmp(&b.identity()));
            releases.dedup_by(|a, b| a.identity() == b.identity());

            retention::apply_pins(releases, *platform, &pins);
            let policy = self
                .config
                .retention
                .get(platform.slug())
                .cloned()
                .unwrap_or_default();
            let retained = retention::apply_retention(std::mem::take(releases), &policy, pins.allow_pins_outside_window);
            *releases = retained;
        }

        if dropped > 0 {
            self.reporter.warning(&format!(
                "{dropped} release row(s) dropped: no usable version/release date, or below the minimum supported version"
            ));
        }

        let elapsed = start.elapsed();
        self.reporter.stage_done("Process", elapsed, true);
        Ok((
            by_platform,
            StageReport { stage: "Process", ok: true, elapsed, sources: Vec::new() },
        ))
    }

    /// Emit stage (§4.8, §4.9): assembles and atomically writes v1/v2 feed
    /// documents, a per-platform RSS channel, the v2 manifest, and the
    /// change-detection timestamp file. A platform with zero retained
    /// releases still gets its file written with an empty `OSVersions` list
    /// (`RetentionEmpty` is not an error).
    pub fn run_emit(
        &self,
        releases: BTreeMap<Platform, Vec<ReleaseRecord>>,
        options: &RunOptions,
    ) -> Result<StageReport, FeedError> {
        let start = Instant::now();
        self.reporter.stage_start("Emit");
        crate::paths::ensure_layout().map_err(|source| FeedError::WriteFailed {
            path: "data root".into(),
            source,
        })?;

        let mut macos_xprotect = None;
        let mut macos_xprotect_plist = None;
        if self.config.xprotect.enabled {
            if let Some(snapshot) = self.cache.get_parsed::<XProtectSnapshot>(&self.config.xprotect.sucatalog_url) {
                macos_xprotect = snapshot.xprotect_version.map(|v| serde_json::json!({ "version": v }));
                macos_xprotect_plist = snapshot.plist_config_version.map(|v| serde_json::json!({ "version": v }));
            }
        }

        let mut timestamp_doc: TimestampDocument = std::fs::read_to_string(crate::paths::timestamp_path())
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();

        let mut sources = Vec::new();
        let mut manifest_entries = Vec::new();

        for platform in Platform::ALL {
            let platform_releases = releases.get(&platform).cloned().unwrap_or_default();

            let mut v1 = feed_assembler::assemble_v1(platform, platform_releases.clone());
            if platform == Platform::MacOs {
                v1.xprotect_payloads = macos_xprotect.clone();
                v1.xprotect_plist_config_data = macos_xprotect_plist.clone();
            }

            let previous_hash = timestamp_doc.get(platform.slug()).map(|e| e.update_hash.clone());
            let changed = previous_hash.as_deref() != Some(v1.update_hash.as_str());
            if options.detect_changes {
                self.reporter.info(&format!(
                    "{}: {}",
                    platform.label(),
                    if changed { "changed" } else { "unchanged" }
                ));
            }

            let v1_path = crate::paths::feeds_v1_dir().join(sofa_schema::feed::feed_filename(platform));
            write_json_atomic(&v1_path, &v1)?;
            manifest_entries.push(manifest_entry_for(&v1_path)?);

            if !self.config.use_legacy_v1 {
                let mut v2 = feed_assembler::assemble_v2(platform, platform_releases.clone());
                if platform == Platform::MacOs {
                    v2.xprotect_payloads = macos_xprotect.clone();
                    v2.xprotect_plist_config_data = macos_xprotect_plist.clone();
                }
                let v2_path = crate::paths::feeds_v2_dir().join(sofa_schema::feed::feed_filename(platform));
                write_json_atomic(&v2_path, &v2)?;
                manifest_entries.push(manifest_entry_for(&v2_path)?);
            }

            let groups = feed_assembler::group_by_os_version(platform, platform_releases);
            let ref_groups: Vec<(String, Vec<&ReleaseRecord>)> =
                groups.iter().map(|(label, recs)| (label.clone(), recs.iter().collect())).collect();
            let feed_url = format!(
                "https://sofa.example/v1/{}",
                sofa_schema::feed::feed_filename(platform)
            );
            let rss_xml = rss::render_channel(platform, &ref_groups, &feed_url);
            let rss_path = crate::paths::feeds_v1_dir().join(format!("{}_rss_feed.xml", platform.slug()));
            write_atomic_bytes(&rss_path, rss_xml.as_bytes())?;
            manifest_entries.push(manifest_entry_for(&rss_path)?);

            timestamp_doc.insert(
                platform.slug().to_string(),
                TimestampEntry {
                    last_check: chrono::Utc::now().to_rfc3339(),
                    update_hash: v1.update_hash.clone(),
                },
            );

            sources.push(SourceOutcome { name: platform.slug().to_string(), ok: true, error: None });
            self.reporter.source_done("Emit", platform.slug(), if changed { "changed" } else { "unchanged" });
        }

        if !self.config.use_legacy_v1 {
            let manifest = Manifest {
                generated_at: chrono::Utc::now().to_rfc3339(),
                entries: manifest_entries,
            };
            let manifest_path = crate::paths::feeds_v2_dir().join("manifest_v2.json");
            write_json_atomic(&manifest_path, &manifest)?;
        }

        write_json_atomic(&crate::paths::timestamp_path(), &timestamp_doc)?;

        let elapsed = start.elapsed();
        self.reporter.stage_done("Emit", elapsed, true);
        Ok(StageReport { stage: "Emit", ok: true, elapsed, sources })
    }

    /// Run Fetch, then Process, then Emit, stopping early if Fetch fails hard.
    /// Exit code follows §7: 0 if every stage reported ok, 2 otherwise.
    pub async fn run_all(&self, options: &RunOptions) -> PipelineOutcome {
        let mut stages = Vec::new();

        let fetch_report = match self.run_fetch(options).await {
            Ok(report) => report,
            Err(e) => {
                self.reporter.warning(&e.to_string());
                stages.push(StageReport {
                    stage: "Fetch",
                    ok: false,
                    elapsed: Duration::default(),
                    sources: vec![SourceOutcome { name: "index_pages".into(), ok: false, error: Some(e.to_string()) }],
                });
                self.reporter.summary(2);
                return PipelineOutcome { stages, exit_code: 2 };
            }
        };
        let fetch_ok = fetch_report.ok;
        stages.push(fetch_report);

        let (releases, process_report) = match self.run_process() {
            Ok(result) => result,
            Err(e) => {
                self.reporter.warning(&e.to_string());
                stages.push(StageReport { stage: "Process", ok: false, elapsed: Duration::default(), sources: Vec::new() });
                self.reporter.summary(2);
                return PipelineOutcome { stages, exit_code: 2 };
            }
        };
        stages.push(process_report);

        let emit_report = match self.run_emit(releases, options) {
            Ok(report) => report,
            Err(e) => {
                self.reporter.warning(&e.to_string());
                stages.push(StageReport { stage: "Emit", ok: false, elapsed: Duration::default(), sources: Vec::new() });
                self.reporter.summary(2);
                return PipelineOutcome { stages, exit_code: 2 };
            }
        };
        let emit_ok = emit_report.ok;
        stages.push(emit_report);

        let exit_code = if fetch_ok && emit_ok { 0 } else { 2 };
        self.reporter.summary(exit_code);
        PipelineOutcome { stages, exit_code }
    }
}

fn determine_release_type(platform: Platform, title: &str) -> sofa_schema::ReleaseType {
    if platform == Platform::Safari {
        return sofa_schema::ReleaseType::Browser;
    }
    let lower = title.to_lowercase();
    if lower.contains("rapid security response") {
        sofa_schema::ReleaseType::Rsr
    } else if lower.contains("configuration") {
        sofa_schema::ReleaseType::Config
    } else {
        sofa_schema::ReleaseType::Os
    }
}

/// GDMF's `ExpirationDate` is an ISO date, not Apple's free-text release-date
/// prose, so it gets its own small parser rather than reusing `parse_apple_date`.
fn parse_gdmf_date(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&chrono::Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc())
}

use crate::atomic::{write_atomic_bytes, write_json_atomic};

fn manifest_entry_for(path: &Path) -> Result<ManifestEntry, FeedError> {
    let err = |source| FeedError::WriteFailed { path: path.display().to_string(), source };
    let metadata = std::fs::metadata(path).map_err(err)?;
    let bytes = std::fs::read(path).map_err(err)?;
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .and_then(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();
    Ok(ManifestEntry {
        path: path.display().to_string(),
        size_bytes: metadata.len(),
        content_hash: Sha256Hex::compute(&bytes).to_string(),
        last_modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;

    /// `paths::data_root()` is process-global (driven by `SOFA_CACHE_DIR`), so every
    /// test that touches the cache or feed tree has to share one `SOFA_CACHE_DIR`
    /// setup/assert/teardown sequence rather than run as independent `#[test]` fns,
    /// or parallel test threads would race on the same env var.
    #[tokio::test]
    #[allow(unsafe_code)]
    async fn pipeline_stages_against_an_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: no other test in this binary reads or writes SOFA_CACHE_DIR.
        unsafe {
            std::env::set_var("SOFA_CACHE_DIR", dir.path());
        }

        let mut config = Config::default();
        for page in &mut config.index_pages {
            page.enabled = page.id == "current";
        }
        config.beta.enabled = false;
        let pipeline = Pipeline::new(config, Arc::new(NullReporter));

        let fetch_result = pipeline.run_fetch(&RunOptions::default()).await;
        assert!(matches!(fetch_result, Err(FetchError::FetchStageFailed)));

        let (by_platform, process_report) = pipeline.run_process().unwrap();
        assert!(by_platform.is_empty());
        assert!(process_report.ok);

        let emit_report = pipeline.run_emit(BTreeMap::new(), &RunOptions::default()).unwrap();
        assert!(emit_report.ok);
        for platform in Platform::ALL {
            let path = crate::paths::feeds_v1_dir().join(sofa_schema::feed::feed_filename(platform));
            assert!(path.exists(), "expected {path:?} to be written even with zero releases");
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(text.contains("\"OSVersions\": []"));
        }
        assert!(crate::paths::timestamp_path().exists());

        unsafe {
            std::env::remove_var("SOFA_CACHE_DIR");
        }
    }

    #[test]
    fn determine_release_type_maps_safari_to_browser() {
        assert_eq!(determine_release_type(Platform::Safari, "Safari 18.2"), sofa_schema::ReleaseType::Browser);
        assert_eq!(determine_release_type(Platform::MacOs, "macOS Sequoia 15.3"), sofa_schema::ReleaseType::Os);
    }

    #[test]
    fn parse_gdmf_date_accepts_plain_iso_date() {
        let parsed = parse_gdmf_date("2026-10-26").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-10-26T00:00:00+00:00");
    }
}
