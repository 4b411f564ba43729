//! Typed configuration, layered: built-in defaults < `config/sofa.toml` < environment < CLI.

use crate::error::ConfigError;
use sofa_schema::{PinnedVersions, RetentionPolicy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One entry in the configurable set of Apple security-release index pages.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexPageConfig {
    pub id: String,
    pub url: String,
    pub enabled: bool,
    pub description: String,
}

fn default_index_pages() -> Vec<IndexPageConfig> {
    vec![
        IndexPageConfig {
            id: "current".into(),
            url: "https://support.apple.com/en-us/100100".into(),
            enabled: true,
            description: "Current security releases".into(),
        },
        IndexPageConfig {
            id: "2022-2023".into(),
            url: "https://support.apple.com/en-us/121012".into(),
            enabled: true,
            description: "Security releases 2022-2023".into(),
        },
        IndexPageConfig {
            id: "2020-2021".into(),
            url: "https://support.apple.com/en-us/120989".into(),
            enabled: false,
            description: "Security releases 2020-2021".into(),
        },
        IndexPageConfig {
            id: "2018-2019".into(),
            url: "https://support.apple.com/en-us/103179".into(),
            enabled: false,
            description: "Security releases 2018-2019".into(),
        },
    ]
}

/// Detail-page fetch policy: caps, skip-age, include/exclude patterns.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetailPageConfig {
    pub enabled: bool,
    pub max_pages: Option<usize>,
    pub skip_older_than_days: Option<i64>,
    pub required_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for DetailPageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_pages: None,
            skip_older_than_days: Some(365 * 2),
            required_patterns: Vec::new(),
            exclude_patterns: vec!["/HT20".into(), "/HT19".into()],
        }
    }
}

impl DetailPageConfig {
    /// Mirrors `original_source`'s `should_fetch_detail_url`: exclude patterns win,
    /// then required patterns, then age.
    pub fn should_fetch(
        &self,
        url: &str,
        release_date: Option<chrono::DateTime<chrono::Utc>>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if self.exclude_patterns.iter().any(|p| url.contains(p.as_str())) {
            return false;
        }
        if !self.required_patterns.is_empty()
            && !self.required_patterns.iter().any(|p| url.contains(p.as_str()))
        {
            return false;
        }
        if let (Some(date), Some(max_age)) = (release_date, self.skip_older_than_days) {
            let age_days = (now - date).num_days();
            if age_days > max_age {
                return false;
            }
        }
        true
    }
}

/// HTTP client behavior shared by every fetcher.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub rate_limit_delay_secs: f64,
    pub detail_fetch_workers: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "SOFA/2.0 (github.com/macadmins/sofa)".into(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 2,
            rate_limit_delay_secs: 1.5,
            detail_fetch_workers: 4,
        }
    }
}

/// GDMF-specific fetch behavior.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GdmfConfig {
    pub enabled: bool,
    pub base_url: String,
    pub stale_window_hours: u64,
    pub insecure: bool,
}

impl Default for GdmfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://gdmf.apple.com/v2/pmv".into(),
            stale_window_hours: 6,
            insecure: false,
        }
    }
}

/// KEV-specific fetch and confidence-threshold behavior.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct KevConfig {
    pub fetch_cisa_kev: bool,
    pub cisa_kev_url: String,
    pub cache_freshness_hours: u64,
    pub min_confidence_for_exploited_list: sofa_schema::ExploitationConfidence,
}

impl Default for KevConfig {
    fn default() -> Self {
        Self {
            fetch_cisa_kev: true,
            cisa_kev_url:
                "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json"
                    .into(),
            cache_freshness_hours: 6,
            min_confidence_for_exploited_list: sofa_schema::ExploitationConfidence::High,
        }
    }
}

/// XProtect is config-gated and off by default, mirroring the upstream project.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct XProtectConfig {
    pub enabled: bool,
    pub sucatalog_url: String,
}

impl Default for XProtectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sucatalog_url: "https://swscan.apple.com/content/catalogs/others/index-14-13-10.16-10.15-10.14-10.13-10.12-10.11-10.10-10.9-mountainlion-lion-snowleopard-leopard.merged-1.sucatalog".into(),
        }
    }
}

/// Beta Releases Scraper window/archive behavior.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BetaConfig {
    pub enabled: bool,
    pub releases_url: String,
    pub window_days: i64,
}

impl Default for BetaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            releases_url: "https://developer.apple.com/news/releases/".into(),
            window_days: 90,
        }
    }
}

/// Per-platform retention configuration, keyed by platform slug.
pub fn default_retention() -> BTreeMap<String, RetentionPolicy> {
    let mut map = BTreeMap::new();
    map.insert("macos".into(), RetentionPolicy::All);
    for slug in ["ios", "ipados", "watchos", "tvos", "visionos"] {
        map.insert(slug.into(), RetentionPolicy::LastNMajor { last_n: 2 });
    }
    map.insert(
        "safari".into(),
        RetentionPolicy::LastNMajor { last_n: 3 },
    );
    map
}

/// Lowest major version still reported for each platform; anything older is
/// dropped at extraction time, mirroring `original_source`'s `MIN_SUPPORTED_VERSIONS`.
pub fn default_min_supported_versions() -> BTreeMap<String, u32> {
    let mut map = BTreeMap::new();
    map.insert("macos".into(), 12);
    map.insert("ios".into(), 15);
    map.insert("ipados".into(), 15);
    map.insert("watchos".into(), 8);
    map.insert("tvos".into(), 15);
    map.insert("visionos".into(), 1);
    map.insert("safari".into(), 15);
    map
}

/// The fully resolved configuration used by every stage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub data_root: PathBuf,
    pub index_pages: Vec<IndexPageConfig>,
    pub detail_pages: DetailPageConfig,
    pub http: HttpConfig,
    pub gdmf: GdmfConfig,
    pub kev: KevConfig,
    pub xprotect: XProtectConfig,
    pub beta: BetaConfig,
    pub retention: BTreeMap<String, RetentionPolicy>,
    pub pinned_versions: PinnedVersions,
    /// Per-platform minimum supported major version (§4.3); rows below the floor
    /// for their platform are dropped during extraction.
    pub min_supported_versions: BTreeMap<String, u32>,
    pub use_legacy_v1: bool,
    /// `LOCALE` hint for disambiguating Apple's free-text release-date format (§6, §10.1).
    pub date_locale: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: crate::paths::data_root(),
            index_pages: default_index_pages(),
            detail_pages: DetailPageConfig::default(),
            http: HttpConfig::default(),
            gdmf: GdmfConfig::default(),
            kev: KevConfig::default(),
            xprotect: XProtectConfig::default(),
            beta: BetaConfig::default(),
            retention: default_retention(),
            pinned_versions: PinnedVersions::default(),
            min_supported_versions: default_min_supported_versions(),
            use_legacy_v1: false,
            date_locale: "en_US".into(),
        }
    }
}

impl Config {
    /// Load defaults, then an optional TOML file, then environment variable overrides.
    pub fn load(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = toml_path {
            if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                })?;
                let overrides: TomlOverrides =
                    toml::from_str(&text).map_err(|source| ConfigError::ParseFailed {
                        path: path.display().to_string(),
                        source,
                    })?;
                overrides.apply(&mut config);
            }
        }

        config.apply_env_overrides();
        config.load_pinned_versions()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `config/pinned.json` (`paths::pinned_versions_path()`), if present. A
    /// missing file leaves `pinned_versions` at its default (`allow_pins_outside_window: true`).
    fn load_pinned_versions(&mut self) -> Result<(), ConfigError> {
        let path = crate::paths::pinned_versions_path();
        if !path.exists() {
            return Ok(());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        self.pinned_versions =
            serde_json::from_str(&text).map_err(|source| ConfigError::PinsParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SOFA_CACHE_DIR") {
            self.data_root = PathBuf::from(dir);
        }
        if std::env::var("SOFA_SKIP_OLD_RELEASES").is_ok() {
            for page in &mut self.index_pages {
                if page.id == "2020-2021" || page.id == "2018-2019" {
                    page.enabled = false;
                }
            }
        }
        if let Ok(max) = std::env::var("SOFA_MAX_DETAIL_PAGES") {
            if let Ok(n) = max.parse() {
                self.detail_pages.max_pages = Some(n);
            }
        }
        if std::env::var("SOFA_DISABLE_KEV").is_ok() {
            self.kev.fetch_cisa_kev = false;
        }
        if let Ok(locale) = std::env::var("LOCALE") {
            self.date_locale = locale;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.index_pages.iter().any(|p| p.enabled) {
            return Err(ConfigError::InvalidValue {
                field: "index_pages".into(),
                reason: "no index pages are enabled for fetching".into(),
            });
        }
        for (platform, policy) in &self.retention {
            if let RetentionPolicy::LastNMajor { last_n } = policy {
                if *last_n == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: format!("retention.{platform}.last_n"),
                        reason: "last_n must be at least 1".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Subset of [`Config`] that a user-supplied TOML file may override. Kept separate from
/// `Config` itself so `Default` for the full struct doesn't depend on partial TOML shapes.
#[derive(Debug, Default, serde::Deserialize)]
struct TomlOverrides {
    data_root: Option<PathBuf>,
    use_legacy_v1: Option<bool>,
}

impl TomlOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(root) = self.data_root {
            config.data_root = root;
        }
        if let Some(legacy) = self.use_legacy_v1 {
            config.use_legacy_v1 = legacy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_last_n_is_rejected() {
        let mut config = Config::default();
        config
            .retention
            .insert("ios".into(), RetentionPolicy::LastNMajor { last_n: 0 });
        assert!(config.validate().is_err());
    }

    /// `paths::pinned_versions_path()` is process-global (driven by `SOFA_CACHE_DIR`),
    /// so these two tests serialize on that one env var rather than `Config::data_root`.
    #[test]
    #[allow(unsafe_code)]
    fn missing_pinned_file_keeps_default_allow_pins_outside_window() {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: no other test in this binary reads or writes SOFA_CACHE_DIR.
        unsafe {
            std::env::set_var("SOFA_CACHE_DIR", dir.path());
        }

        let mut config = Config::default();
        config.load_pinned_versions().unwrap();
        assert!(config.pinned_versions.allow_pins_outside_window);
        assert!(config.pinned_versions.pins.is_empty());

        unsafe {
            std::env::remove_var("SOFA_CACHE_DIR");
        }
    }

    #[test]
    #[allow(unsafe_code)]
    fn pinned_file_on_disk_is_loaded_and_merged() {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: no other test in this binary reads or writes SOFA_CACHE_DIR.
        unsafe {
            std::env::set_var("SOFA_CACHE_DIR", dir.path());
        }
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("pinned.json"),
            r#"{"pins": {"macos": ["14.1"]}, "allow_pins_outside_window": false}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.load_pinned_versions().unwrap();
        assert_eq!(config.pinned_versions.pins.get("macos").unwrap(), &vec!["14.1".to_string()]);
        assert!(!config.pinned_versions.allow_pins_outside_window);

        unsafe {
            std::env::remove_var("SOFA_CACHE_DIR");
        }
    }

    #[test]
    fn detail_page_policy_respects_exclude_then_age() {
        let policy = DetailPageConfig::default();
        assert!(!policy.should_fetch("https://support.apple.com/en-us/HT201222", None, chrono::Utc::now()));
        assert!(policy.should_fetch("https://support.apple.com/en-us/HT213931", None, chrono::Utc::now()));
    }
}
