//! Read-only two-function interface over the IPSW/UMA catalog (§1, §4.2).
//!
//! Full-OS restore images (IPSW) and updater apps (UMA) are out of scope as a
//! *feature* here -- the pipeline never parses their package internals. What
//! it needs from them is a single fact per (platform, version): is there a
//! matching restore image or installer app, and if so what's its direct URL.
//! That's the whole contract, so it's exposed as two plain functions rather
//! than a client type, mirroring how the spec names this collaborator.

use crate::cache::{GetOptions, HttpCache};
use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use sofa_schema::Platform;

/// Config for the IPSW/UMA catalog lookup. Disabled by default: most
/// downstream consumers only need the feed's version/build/CVE data, not
/// installer links.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IpswUmaConfig {
    pub enabled: bool,
    pub catalog_url: String,
}

impl Default for IpswUmaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            catalog_url: "https://api.ipsw.me/v4/catalog".into(),
        }
    }
}

/// One IPSW (full restore image) catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpswInfo {
    pub platform: Platform,
    pub version: String,
    pub build: String,
    pub url: String,
}

/// One UMA (updater app) catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmaInfo {
    pub platform: Platform,
    pub version: String,
    pub build: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogEntry {
    platform: Platform,
    version: String,
    build: String,
    url: String,
    #[serde(rename = "type")]
    kind: CatalogKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum CatalogKind {
    Ipsw,
    Uma,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    entries: Vec<CatalogEntry>,
}

async fn fetch_catalog(
    cache: &HttpCache,
    config: &IpswUmaConfig,
) -> Result<Vec<CatalogEntry>, FetchError> {
    if !config.enabled {
        return Ok(Vec::new());
    }
    if let Some(cached) = cache.get_parsed::<Vec<CatalogEntry>>(&config.catalog_url) {
        return Ok(cached);
    }
    let entry = cache.get(&config.catalog_url, GetOptions::default()).await?;
    let doc: CatalogDocument =
        serde_json::from_str(&entry.body).map_err(|e| FetchError::ParseError {
            url: config.catalog_url.clone(),
            reason: e.to_string(),
        })?;
    cache.put_parsed(&config.catalog_url, &doc.entries)?;
    Ok(doc.entries)
}

/// Look up the IPSW restore-image URL for `(platform, version)`, if any.
pub async fn ipsw_lookup(
    cache: &HttpCache,
    config: &IpswUmaConfig,
    platform: Platform,
    version: &str,
) -> Result<Option<IpswInfo>, FetchError> {
    let catalog = fetch_catalog(cache, config).await?;
    Ok(catalog
        .into_iter()
        .find(|e| e.kind == CatalogKind::Ipsw && e.platform == platform && e.version == version)
        .map(|e| IpswInfo {
            platform: e.platform,
            version: e.version,
            build: e.build,
            url: e.url,
        }))
}

/// Look up the UMA updater-app URL for `(platform, version)`, if any.
pub async fn uma_lookup(
    cache: &HttpCache,
    config: &IpswUmaConfig,
    platform: Platform,
    version: &str,
) -> Result<Option<UmaInfo>, FetchError> {
    let catalog = fetch_catalog(cache, config).await?;
    Ok(catalog
        .into_iter()
        .find(|e| e.kind == CatalogKind::Uma && e.platform == platform && e.version == version)
        .map(|e| UmaInfo {
            platform: e.platform,
            version: e.version,
            build: e.build,
            url: e.url,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    #[tokio::test]
    async fn disabled_config_returns_none_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );
        let config = IpswUmaConfig::default();
        assert!(ipsw_lookup(&cache, &config, Platform::MacOs, "15.3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn finds_matching_entry_by_platform_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );

        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "entries": [
                {"platform": "macos", "version": "15.3", "build": "24D60", "url": "https://example.com/macos15.3.ipsw", "type": "ipsw"},
                {"platform": "macos", "version": "15.3", "build": "24D60", "url": "https://example.com/installer.app", "type": "uma"}
            ]
        }"#;
        server.mock("GET", "/catalog").with_status(200).with_body(body).create_async().await;

        let config = IpswUmaConfig {
            enabled: true,
            catalog_url: format!("{}/catalog", server.url()),
        };

        let ipsw = ipsw_lookup(&cache, &config, Platform::MacOs, "15.3").await.unwrap();
        assert_eq!(ipsw.unwrap().url, "https://example.com/macos15.3.ipsw");

        let uma = uma_lookup(&cache, &config, Platform::MacOs, "15.3").await.unwrap();
        assert_eq!(uma.unwrap().url, "https://example.com/installer.app");

        assert!(ipsw_lookup(&cache, &config, Platform::Ios, "18.2").await.unwrap().is_none());
    }
}
