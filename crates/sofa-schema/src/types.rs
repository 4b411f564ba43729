use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;

/// One of the OS/browser families SOFA tracks. Closed set -- new platforms are a
/// schema change, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Ios,
    IPadOs,
    WatchOs,
    TvOs,
    VisionOs,
    Safari,
}

impl Platform {
    /// All platforms, in the order they are emitted to the `feeds/` tree.
    pub const ALL: [Platform; 7] = [
        Platform::MacOs,
        Platform::Ios,
        Platform::IPadOs,
        Platform::WatchOs,
        Platform::TvOs,
        Platform::VisionOs,
        Platform::Safari,
    ];

    /// The lowercase token used as a feed filename stem (`macos`, `ipados`, ...).
    pub fn slug(self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Ios => "ios",
            Platform::IPadOs => "ipados",
            Platform::WatchOs => "watchos",
            Platform::TvOs => "tvos",
            Platform::VisionOs => "visionos",
            Platform::Safari => "safari",
        }
    }

    /// The human-facing label as it appears in Apple's own prose ("macOS", "iPadOS", ...).
    pub fn label(self) -> &'static str {
        match self {
            Platform::MacOs => "macOS",
            Platform::Ios => "iOS",
            Platform::IPadOs => "iPadOS",
            Platform::WatchOs => "watchOS",
            Platform::TvOs => "tvOS",
            Platform::VisionOs => "visionOS",
            Platform::Safari => "Safari",
        }
    }

    /// Detect a platform by keyword match against free-text Apple prose.
    ///
    /// Order matters: `iPadOS` and `iOS` both contain `OS`, and `iPadOS` must be
    /// checked before `iOS` since `"iOS"` is not a substring-safe test on its own
    /// once combined titles like "iOS and iPadOS" are in play -- callers that need
    /// every platform mentioned in a row should call this per-candidate rather than
    /// assume a single match.
    pub fn detect(text: &str) -> Option<Platform> {
        const ORDER: [(&str, Platform); 7] = [
            ("iPadOS", Platform::IPadOs),
            ("watchOS", Platform::WatchOs),
            ("tvOS", Platform::TvOs),
            ("visionOS", Platform::VisionOs),
            ("macOS", Platform::MacOs),
            ("iOS", Platform::Ios),
            ("Safari", Platform::Safari),
        ];
        ORDER
            .iter()
            .find(|(needle, _)| text.contains(needle))
            .map(|(_, platform)| *platform)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A `CVE-YYYY-N` identifier, stored verbatim but comparable by (year, sequence)
/// so iteration order matches the canonical ordering required of `ReleaseRecord::cves`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CveId(String);

impl CveId {
    /// Parse a `CVE-YYYY-NNNN` string. Returns `None` if it doesn't match the grammar.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("CVE-")?;
        let (year, seq) = rest.split_once('-')?;
        if year.len() == 4
            && year.chars().all(|c| c.is_ascii_digit())
            && !seq.is_empty()
            && seq.chars().all(|c| c.is_ascii_digit())
        {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn sort_key(&self) -> (u32, u64) {
        let rest = self.0.strip_prefix("CVE-").unwrap_or(&self.0);
        let (year, seq) = rest.split_once('-').unwrap_or((rest, "0"));
        (
            year.parse().unwrap_or(0),
            seq.parse().unwrap_or(0),
        )
    }
}

impl std::fmt::Display for CveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CveId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CveId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CveId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialOrd for CveId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CveId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// An Apple OS/app version string compared component-wise ("15.3.1" < "15.10"),
/// falling back to lexical comparison for anything that isn't dotted digits --
/// Apple occasionally ships labels like "Preinstalled" through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackagingVersion(String);

impl PackagingVersion {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components(&self) -> Option<Vec<u64>> {
        self.0
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect()
    }
}

impl std::fmt::Display for PackagingVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PackagingVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackagingVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackagingVersion {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialOrd for PackagingVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackagingVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.components(), other.components()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

/// Where an exploitation signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploitationSource {
    AppleDirect,
    AppleTargeted,
    AppleVersionSpecific,
    CisaKev,
    CrossPlatform,
}

/// How sure we are that a CVE is actively exploited, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExploitationConfidence {
    Low,
    Medium,
    High,
    Confirmed,
}

/// Normalized exploitation evidence for one CVE on one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploitationInfo {
    pub cve_id: CveId,
    pub is_exploited: bool,
    pub confidence: ExploitationConfidence,
    pub sources: Vec<ExploitationSource>,
    pub affected_platforms: Vec<Platform>,
    pub is_targeted_attack: bool,
    pub is_physical_attack: bool,
    pub targeted_versions: Option<String>,
    pub notes: Option<String>,
}

impl ExploitationInfo {
    /// A record with no evidence at all: not exploited, lowest confidence, no sources.
    pub fn none(cve_id: CveId) -> Self {
        Self {
            cve_id,
            is_exploited: false,
            confidence: ExploitationConfidence::Low,
            sources: Vec::new(),
            affected_platforms: Vec::new(),
            is_targeted_attack: false,
            is_physical_attack: false,
            targeted_versions: None,
            notes: None,
        }
    }

    /// Whether this record is eligible for a platform's `ActivelyExploitedCVEs` list:
    /// cross-platform evidence alone never suffices (spec invariant).
    pub fn qualifies_for_exploited_list(&self) -> bool {
        self.is_exploited
            && self.sources.iter().any(|s| *s != ExploitationSource::CrossPlatform)
    }
}

/// The fixed ~15-category taxonomy that free-text "component" strings normalize to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ComponentCategory {
    WebKit,
    Kernel,
    Networking,
    Security,
    Media,
    Graphics,
    SystemServices,
    FileSystem,
    Drivers,
    Applications,
    Accessibility,
    Virtualization,
    PackageManagement,
    DeveloperTools,
    Privacy,
    /// Default bucket when no rule fires.
    System,
}

impl std::fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentCategory::WebKit => "WebKit",
            ComponentCategory::Kernel => "Kernel",
            ComponentCategory::Networking => "Networking",
            ComponentCategory::Security => "Security",
            ComponentCategory::Media => "Media",
            ComponentCategory::Graphics => "Graphics",
            ComponentCategory::SystemServices => "System Services",
            ComponentCategory::FileSystem => "File System",
            ComponentCategory::Drivers => "Drivers",
            ComponentCategory::Applications => "Applications",
            ComponentCategory::Accessibility => "Accessibility",
            ComponentCategory::Virtualization => "Virtualization",
            ComponentCategory::PackageManagement => "Package Management",
            ComponentCategory::DeveloperTools => "Developer Tools",
            ComponentCategory::Privacy => "Privacy",
            ComponentCategory::System => "System",
        };
        write!(f, "{name}")
    }
}

/// The kind of release a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReleaseType {
    #[default]
    Os,
    Rsr,
    Config,
    Browser,
}

/// Per-CVE enrichment attached to a release, beyond the boolean map in v1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CveDetail {
    pub exploitation: ExploitationInfo,
    pub component: ComponentCategory,
    pub component_raw: String,
    pub impact: Option<String>,
    pub description: Option<String>,
}

/// One (platform, version, build) release, the unit the rest of the pipeline operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub platform: Platform,
    pub version: PackagingVersion,
    pub build: String,
    pub title: String,
    pub release_date: chrono::DateTime<chrono::Utc>,
    pub url: String,
    pub cves: Vec<CveId>,
    pub cve_details: std::collections::BTreeMap<String, CveDetail>,
    pub supported_devices: Vec<String>,
    pub all_builds: Vec<String>,
    pub expiration_date: Option<chrono::DateTime<chrono::Utc>>,
    pub release_type: ReleaseType,
    pub days_since_previous: Option<i64>,
    pub is_pinned: bool,
}

impl ReleaseRecord {
    /// Identity key used to enforce the "unique (version, build) within a platform" invariant.
    pub fn identity(&self) -> (Platform, &str, &str) {
        (self.platform, self.version.as_str(), self.build.as_str())
    }

    /// `ActivelyExploitedCVEs`: sorted CVEs confirmed exploited on *this* platform.
    pub fn actively_exploited_cves(&self) -> Vec<&CveId> {
        let mut out: Vec<&CveId> = self
            .cves
            .iter()
            .filter(|c| {
                self.cve_details
                    .get(c.as_str())
                    .is_some_and(|d| d.exploitation.qualifies_for_exploited_list())
            })
            .collect();
        out.sort();
        out
    }
}

/// A single entry from Apple's public per-platform asset manifest (GDMF).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdmfAsset {
    pub product_version: String,
    pub build: String,
    pub posting_date: Option<String>,
    pub expiration_date: Option<String>,
    pub supported_devices: Vec<String>,
}

/// One row of the CISA Known Exploited Vulnerabilities catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KevEntry {
    pub cve_id: String,
    pub date_added: String,
    pub vendor_project: String,
    pub product: String,
    pub short_description: String,
    pub ransomware_use: bool,
}

/// Per-platform retention policy, applied after pinning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep every release ever seen for this platform.
    All,
    /// Keep only the newest `last_n` major versions.
    LastNMajor { last_n: u32 },
    /// Keep only releases whose major version is explicitly listed.
    Whitelist { majors: Vec<u32> },
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::LastNMajor { last_n: 2 }
    }
}

/// Explicit pins that survive outside the retention window, see §3 `PinnedVersions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinnedVersions {
    #[serde(default)]
    pub pins: std::collections::BTreeMap<String, Vec<String>>,
    #[serde(default = "default_true")]
    pub allow_pins_outside_window: bool,
}

fn default_true() -> bool {
    true
}

impl PinnedVersions {
    pub fn is_pinned(&self, platform: Platform, version: &str, build: &str) -> bool {
        self.pins
            .get(platform.slug())
            .is_some_and(|pins| pins.iter().any(|p| p == version || p == build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cve_sort_order_is_year_then_sequence() {
        let mut ids = vec![
            CveId::from("CVE-2023-9999"),
            CveId::from("CVE-2024-1"),
            CveId::from("CVE-2023-1"),
        ];
        ids.sort();
        assert_eq!(
            ids.iter().map(CveId::as_str).collect::<Vec<_>>(),
            vec!["CVE-2023-1", "CVE-2023-9999", "CVE-2024-1"]
        );
    }

    #[test]
    fn cve_parse_rejects_malformed() {
        assert!(CveId::parse("CVE-2024-1234").is_some());
        assert!(CveId::parse("CVE-24-1234").is_none());
        assert!(CveId::parse("not-a-cve").is_none());
    }

    #[test]
    fn packaging_version_orders_numerically_not_lexically() {
        let a = PackagingVersion::new("15.3.1");
        let b = PackagingVersion::new("15.10");
        assert!(a < b, "15.3.1 should sort before 15.10");
    }

    #[test]
    fn packaging_version_falls_back_to_lexical_for_non_numeric() {
        let a = PackagingVersion::new("Preinstalled");
        let b = PackagingVersion::new("15.0");
        assert!(a < b, "non-numeric label sorts before any real version");
    }

    #[test]
    fn platform_detects_longest_match_first() {
        assert_eq!(Platform::detect("iPadOS 18.2"), Some(Platform::IPadOs));
        assert_eq!(Platform::detect("macOS Sequoia 15.3"), Some(Platform::MacOs));
        assert_eq!(Platform::detect("no platform here"), None);
    }

    #[test]
    fn exploitation_cross_platform_alone_does_not_qualify() {
        let mut info = ExploitationInfo::none(CveId::from("CVE-2024-1"));
        info.is_exploited = false;
        info.sources = vec![ExploitationSource::CrossPlatform];
        assert!(!info.qualifies_for_exploited_list());

        info.is_exploited = true;
        assert!(
            !info.qualifies_for_exploited_list(),
            "cross_platform source must never qualify even if is_exploited were set"
        );

        info.sources.push(ExploitationSource::CisaKev);
        assert!(info.qualifies_for_exploited_list());
    }
}
