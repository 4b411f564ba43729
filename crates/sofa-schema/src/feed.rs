//! Wire shapes for the emitted `feeds/v1` and `feeds/v2` JSON documents.
//!
//! These mirror the on-disk schema exactly (field names and casing are load-bearing
//! for consumers) rather than the internal `ReleaseRecord` shape, which is why this
//! module exists separately from [`crate::types`].

use crate::types::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single CVE entry in a v1 feed: `{cve -> is_exploited}`.
pub type V1CveMap = BTreeMap<String, bool>;

/// One release entry as it appears in `Latest` or `SecurityReleases[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V1Release {
    #[serde(rename = "ProductVersion")]
    pub product_version: String,
    #[serde(rename = "Build")]
    pub build: String,
    #[serde(rename = "AllBuilds")]
    pub all_builds: Vec<String>,
    #[serde(rename = "ReleaseDate")]
    pub release_date: String,
    #[serde(rename = "ExpirationDate")]
    pub expiration_date: String,
    #[serde(rename = "SupportedDevices")]
    pub supported_devices: Vec<String>,
    #[serde(rename = "SecurityInfo")]
    pub security_info: String,
    #[serde(rename = "CVEs")]
    pub cves: V1CveMap,
    #[serde(rename = "ActivelyExploitedCVEs")]
    pub actively_exploited_cves: Vec<String>,
    #[serde(rename = "UniqueCVEsCount")]
    pub unique_cves_count: usize,
    #[serde(rename = "DaysSincePreviousRelease")]
    pub days_since_previous_release: i64,
}

/// One grouping of point releases under a shared `OSVersion` label (e.g. "Sequoia 15").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V1OsVersionBlock {
    #[serde(rename = "OSVersion")]
    pub os_version: String,
    #[serde(rename = "Latest")]
    pub latest: V1Release,
    #[serde(rename = "SecurityReleases")]
    pub security_releases: Vec<V1Release>,
}

/// Top-level v1 feed document, one per platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V1FeedDocument {
    #[serde(rename = "UpdateHash")]
    pub update_hash: String,
    #[serde(rename = "OSVersions")]
    pub os_versions: Vec<V1OsVersionBlock>,
    #[serde(rename = "XProtectPayloads", skip_serializing_if = "Option::is_none")]
    pub xprotect_payloads: Option<serde_json::Value>,
    #[serde(
        rename = "XProtectPlistConfigData",
        skip_serializing_if = "Option::is_none"
    )]
    pub xprotect_plist_config_data: Option<serde_json::Value>,
    #[serde(rename = "Models", skip_serializing_if = "Option::is_none")]
    pub models: Option<serde_json::Value>,
    #[serde(rename = "InstallationApps", skip_serializing_if = "Option::is_none")]
    pub installation_apps: Option<serde_json::Value>,
}

/// A v2 CVE entry: the v1 boolean lifted into a full exploitation/component object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2CveEntry {
    pub id: String,
    pub is_exploited: bool,
    pub component: String,
    pub component_raw: String,
    pub impact: Option<String>,
    pub description: Option<String>,
    pub platforms: Vec<String>,
    pub confidence: String,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeted_attack: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_attack: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeted_versions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exploitation_notes: Option<String>,
}

/// A warning that a CVE is known exploited elsewhere but not confirmed on this platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploitationWarning {
    pub cve: String,
    pub note: String,
}

/// Count of CVEs per [`ComponentCategory`] for one release.
pub type ComponentBreakdown = BTreeMap<String, usize>;

/// Per-release exploitation/CVE rollup counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveMetrics {
    pub total_cves: usize,
    pub exploited_cves: usize,
    pub exploitation_rate: f64,
}

/// Per-OSVersion aggregate statistics in a v2 feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_releases: usize,
    pub total_cves: usize,
    pub total_kevs: usize,
    pub component_distribution: BTreeMap<String, usize>,
    pub exploitation_rate: f64,
}

/// Feed-level summary across every OSVersion block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalInsights {
    pub most_affected_components: Vec<(String, usize)>,
    pub high_risk_releases: Vec<String>,
}

/// v2 release entry: v1 shape plus the richer CVE objects and per-release metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2Release {
    #[serde(rename = "ProductVersion")]
    pub product_version: String,
    #[serde(rename = "Build")]
    pub build: String,
    #[serde(rename = "AllBuilds")]
    pub all_builds: Vec<String>,
    #[serde(rename = "ReleaseDate")]
    pub release_date: String,
    #[serde(rename = "ExpirationDate")]
    pub expiration_date: String,
    #[serde(rename = "SupportedDevices")]
    pub supported_devices: Vec<String>,
    #[serde(rename = "SecurityInfo")]
    pub security_info: String,
    #[serde(rename = "CVEs")]
    pub cves: BTreeMap<String, V2CveEntry>,
    #[serde(rename = "ActivelyExploitedCVEs")]
    pub actively_exploited_cves: Vec<String>,
    #[serde(rename = "ExploitationWarnings")]
    pub exploitation_warnings: Vec<ExploitationWarning>,
    #[serde(rename = "UniqueCVEsCount")]
    pub unique_cves_count: usize,
    #[serde(rename = "DaysSincePreviousRelease")]
    pub days_since_previous_release: i64,
    #[serde(rename = "CVEMetrics")]
    pub cve_metrics: CveMetrics,
    #[serde(rename = "ComponentBreakdown")]
    pub component_breakdown: ComponentBreakdown,
}

/// v2 OSVersion block: v1 shape plus aggregate [`Statistics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2OsVersionBlock {
    #[serde(rename = "OSVersion")]
    pub os_version: String,
    #[serde(rename = "Latest")]
    pub latest: V2Release,
    #[serde(rename = "SecurityReleases")]
    pub security_releases: Vec<V2Release>,
    #[serde(rename = "Statistics")]
    pub statistics: Statistics,
}

/// Top-level v2 feed document, one per platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2FeedDocument {
    pub schema_version: String,
    pub generated_at: String,
    #[serde(rename = "UpdateHash")]
    pub update_hash: String,
    #[serde(rename = "OSVersions")]
    pub os_versions: Vec<V2OsVersionBlock>,
    #[serde(rename = "GlobalInsights")]
    pub global_insights: GlobalInsights,
    #[serde(rename = "XProtectPayloads", skip_serializing_if = "Option::is_none")]
    pub xprotect_payloads: Option<serde_json::Value>,
    #[serde(
        rename = "XProtectPlistConfigData",
        skip_serializing_if = "Option::is_none"
    )]
    pub xprotect_plist_config_data: Option<serde_json::Value>,
    #[serde(rename = "Models", skip_serializing_if = "Option::is_none")]
    pub models: Option<serde_json::Value>,
    #[serde(rename = "InstallationApps", skip_serializing_if = "Option::is_none")]
    pub installation_apps: Option<serde_json::Value>,
}

/// A single manifest entry describing one emitted feed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub size_bytes: u64,
    pub content_hash: String,
    pub last_modified: String,
}

/// `feeds/v2/manifest_v2.json`: sizes/hashes/timestamps for every emitted file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    pub entries: Vec<ManifestEntry>,
}

/// `feeds/timestamp.json`: per-platform change-detection marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampEntry {
    pub last_check: String,
    pub update_hash: String,
}

/// The full `feeds/timestamp.json` document, keyed by platform slug.
pub type TimestampDocument = BTreeMap<String, TimestampEntry>;

/// Returns the conventional feed filename for a platform (e.g. `macos_data_feed.json`).
pub fn feed_filename(platform: Platform) -> String {
    format!("{}_data_feed.json", platform.slug())
}
