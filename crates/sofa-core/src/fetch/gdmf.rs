use crate::cache::{GetOptions, HttpCache};
use crate::config::{GdmfConfig, HttpConfig};
use crate::error::FetchError;
use serde::Deserialize;
use sofa_schema::GdmfAsset;
use std::collections::BTreeMap;

/// Apple's Global Device Management Feed asset manifest, keyed by the platform
/// name GDMF itself uses ("macOS", "iOS", ...), before the merge step in §4.5
/// folds watchOS/tvOS assets under the "iOS" bucket they're nested in.
#[derive(Debug, Clone, Default)]
pub struct GdmfSnapshot {
    pub asset_sets: BTreeMap<String, Vec<GdmfAsset>>,
}

#[derive(Debug, Deserialize)]
struct GdmfDocument {
    #[serde(rename = "PublicAssetSets", default)]
    public_asset_sets: BTreeMap<String, Vec<GdmfAssetWire>>,
    // GDMF also carries a non-public "AssetSets" keyspace alongside
    // "PublicAssetSets"; both must be searched for a given platform (§4.5).
    #[serde(rename = "AssetSets", default)]
    asset_sets: BTreeMap<String, Vec<GdmfAssetWire>>,
}

#[derive(Debug, Deserialize)]
struct GdmfAssetWire {
    #[serde(rename = "ProductVersion")]
    product_version: String,
    #[serde(rename = "Build")]
    build: String,
    #[serde(rename = "PostingDate")]
    posting_date: Option<String>,
    #[serde(rename = "ExpirationDate")]
    expiration_date: Option<String>,
    #[serde(rename = "SupportedDevices", default)]
    supported_devices: Vec<String>,
}

/// Fetches and parses Apple's GDMF asset manifest (§4.2, §4.5).
#[derive(Debug, Default)]
pub struct GdmfClient;

impl GdmfClient {
    /// Fetch the manifest over GDMF's pinned-root client (§4.2, §6). On a
    /// transient failure, callers should fall back to the last cached snapshot
    /// rather than treating this as fatal -- GDMF's own staleness window
    /// (`stale_window_hours`) governs how old that may be.
    pub async fn fetch(
        cache: &HttpCache,
        http: &HttpConfig,
        config: &GdmfConfig,
    ) -> Result<GdmfSnapshot, FetchError> {
        if !config.enabled {
            return Ok(GdmfSnapshot::default());
        }

        let client = crate::cache::gdmf_client(http, config);
        let entry = cache
            .get_with_client(&config.base_url, GetOptions::default(), &client)
            .await?;

        if !entry.from_network {
            let age_hours = (chrono::Utc::now() - entry.fetched_at).num_hours();
            if age_hours > config.stale_window_hours as i64 {
                return Err(FetchError::StaleCacheExpired {
                    url: config.base_url.clone(),
                    age_hours,
                    window_hours: config.stale_window_hours,
                });
            }
        }

        let document: GdmfDocument =
            serde_json::from_str(&entry.body).map_err(|e| FetchError::ParseError {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;

        let mut asset_sets: BTreeMap<String, Vec<GdmfAsset>> = BTreeMap::new();
        for wire_map in [document.public_asset_sets, document.asset_sets] {
            for (platform, assets) in wire_map {
                let entry = asset_sets.entry(platform).or_default();
                entry.extend(assets.into_iter().map(|a| GdmfAsset {
                    product_version: a.product_version,
                    build: a.build,
                    posting_date: a.posting_date,
                    expiration_date: a.expiration_date,
                    supported_devices: a.supported_devices,
                }));
            }
        }

        cache.put_parsed(&config.base_url, &asset_sets)?;
        Ok(GdmfSnapshot { asset_sets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    #[tokio::test]
    async fn parses_nested_asset_sets_by_platform_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );

        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "PublicAssetSets": {
                "macOS": [{"ProductVersion": "15.3", "Build": "24D60", "SupportedDevices": ["Mac16,1"]}],
                "iOS": [{"ProductVersion": "18.3", "Build": "22D63", "SupportedDevices": ["iPhone17,1"]}]
            }
        }"#;
        server
            .mock("GET", "/v2/pmv")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let config = GdmfConfig {
            enabled: true,
            base_url: format!("{}/v2/pmv", server.url()),
            ..GdmfConfig::default()
        };

        let snapshot = GdmfClient::fetch(&cache, &HttpConfig::default(), &config).await.unwrap();
        assert_eq!(snapshot.asset_sets.get("macOS").unwrap()[0].build, "24D60");
        assert_eq!(snapshot.asset_sets.get("iOS").unwrap()[0].product_version, "18.3");
    }

    #[tokio::test]
    async fn merges_public_and_non_public_asset_sets() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );

        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "PublicAssetSets": {
                "macOS": [{"ProductVersion": "15.3", "Build": "24D60", "SupportedDevices": ["Mac16,1"]}]
            },
            "AssetSets": {
                "macOS": [{"ProductVersion": "15.3.1", "Build": "24D70", "SupportedDevices": ["Mac16,1"]}]
            }
        }"#;
        server
            .mock("GET", "/v2/pmv")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let config = GdmfConfig {
            enabled: true,
            base_url: format!("{}/v2/pmv", server.url()),
            ..GdmfConfig::default()
        };

        let snapshot = GdmfClient::fetch(&cache, &HttpConfig::default(), &config).await.unwrap();
        let macos = snapshot.asset_sets.get("macOS").unwrap();
        assert_eq!(macos.len(), 2, "both PublicAssetSets and AssetSets entries must be present");
        assert!(macos.iter().any(|a| a.build == "24D60"));
        assert!(macos.iter().any(|a| a.build == "24D70"));
    }

    #[tokio::test]
    async fn disabled_config_skips_fetch_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );
        let config = GdmfConfig {
            enabled: false,
            ..GdmfConfig::default()
        };
        let snapshot = GdmfClient::fetch(&cache, &HttpConfig::default(), &config).await.unwrap();
        assert!(snapshot.asset_sets.is_empty());
    }

    #[tokio::test]
    async fn stale_cache_past_the_window_fails_instead_of_silently_serving() {
        let dir = tempfile::tempdir().unwrap();
        let urls_dir = dir.path().join("urls");
        let raw_dir = dir.path().join("raw");
        let parsed_dir = dir.path().join("parsed");
        let cache = HttpCache::at(urls_dir.clone(), raw_dir.clone(), parsed_dir, &HttpConfig::default());

        // unreachable host; the client will never get a response
        let unreachable_url = "http://127.0.0.1:1".to_string();
        let key = sofa_schema::sha1_hex(&crate::cache::canonicalize_url(&unreachable_url));
        std::fs::create_dir_all(&urls_dir).unwrap();
        std::fs::create_dir_all(&raw_dir).unwrap();
        std::fs::write(
            raw_dir.join(format!("{key}.html")),
            r#"{"PublicAssetSets": {}}"#,
        )
        .unwrap();
        let stale_meta = sofa_schema::CachedResourceMeta {
            url: unreachable_url.clone(),
            content_hash: "deadbeef".into(),
            last_modified: None,
            etag: None,
            fetched_at: chrono::Utc::now() - chrono::Duration::hours(48),
        };
        std::fs::write(
            urls_dir.join(format!("{key}.json")),
            serde_json::to_vec(&stale_meta).unwrap(),
        )
        .unwrap();

        let config = GdmfConfig {
            enabled: true,
            base_url: unreachable_url,
            stale_window_hours: 6,
            ..GdmfConfig::default()
        };

        let result = GdmfClient::fetch(&cache, &HttpConfig::default(), &config).await;
        assert!(matches!(result, Err(FetchError::StaleCacheExpired { .. })), "{result:?}");
    }
}
