//! Content-addressed HTTP cache with conditional revalidation (§4.1).
//!
//! Every network call in the pipeline goes through [`HttpCache::get`]. Three
//! parallel keyspaces are kept on disk, each keyed by `sha1(canonicalize(url))`:
//! metadata (JSON), raw body (bytes), and an optional source-specific parsed
//! derivative (JSON), written by callers via [`HttpCache::put_parsed`].

mod normalize;
mod trust;

pub use normalize::{canonicalize_url, normalized_text};
pub use trust::gdmf_client;

use crate::config::HttpConfig;
use crate::error::CacheError;
use sofa_schema::{CachedResourceMeta, Sha256Hex, sha1_hex};
use std::path::{Path, PathBuf};

/// Options controlling a single [`HttpCache::get`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Skip the `If-Modified-Since` conditional header even if a cached entry exists.
    pub force_refresh: bool,
    /// Always issue the request, even for a cached entry that would otherwise be reused.
    pub verify_content: bool,
}

/// Result of a [`HttpCache::get`] call.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: String,
    /// `true` if the content actually changed (new content_hash) since the last fetch.
    pub was_modified: bool,
    /// `false` when this entry was served from the on-disk cache because the
    /// network request itself failed (§4.1 "on network error..."), as opposed
    /// to a live 200/304 round-trip. Callers with a staleness budget (GDMF;
    /// §4.2) use this to decide whether a fallback is still acceptable.
    pub from_network: bool,
    /// The metadata timestamp backing this entry, for staleness checks.
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

/// The content-addressed cache itself.
#[derive(Debug, Clone)]
pub struct HttpCache {
    urls_dir: PathBuf,
    raw_dir: PathBuf,
    parsed_dir: PathBuf,
    client: reqwest::Client,
}

impl HttpCache {
    /// Build a cache rooted at the standard `data/cache` layout (see `crate::paths`).
    pub fn new(http: &HttpConfig) -> Self {
        Self::at(
            crate::paths::cache_urls_dir(),
            crate::paths::cache_raw_dir(),
            crate::paths::cache_parsed_dir(),
            http,
        )
    }

    /// Build a cache rooted at explicit directories, for tests.
    pub fn at(
        urls_dir: PathBuf,
        raw_dir: PathBuf,
        parsed_dir: PathBuf,
        http: &HttpConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(&http.user_agent)
            .timeout(std::time::Duration::from_secs(http.timeout_secs))
            .build()
            .expect("reqwest client config is static and known-valid");

        Self {
            urls_dir,
            raw_dir,
            parsed_dir,
            client,
        }
    }

    fn key(url: &str) -> String {
        sha1_hex(&canonicalize_url(url))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.urls_dir.join(format!("{key}.json"))
    }

    fn raw_path(&self, key: &str) -> PathBuf {
        self.raw_dir.join(format!("{key}.html"))
    }

    fn parsed_path(&self, key: &str) -> PathBuf {
        self.parsed_dir.join(format!("{key}.json"))
    }

    fn read_meta(&self, key: &str) -> Option<CachedResourceMeta> {
        let path = self.meta_path(key);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(meta) => Some(meta),
            Err(_) => {
                // CacheCorrupt: discard and treat as a miss.
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.raw_path(key)).ok()
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), CacheError> {
        let key = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = path.parent().expect("cache paths always have a parent dir");
        std::fs::create_dir_all(dir).map_err(|source| CacheError::CacheWriteFailed {
            key: key.clone(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| {
            CacheError::CacheWriteFailed {
                key: key.clone(),
                source,
            }
        })?;
        std::io::Write::write_all(&mut tmp, contents).map_err(|source| {
            CacheError::CacheWriteFailed {
                key: key.clone(),
                source,
            }
        })?;
        tmp.persist(path)
            .map_err(|e| CacheError::CacheWriteFailed {
                key,
                source: e.error,
            })?;
        Ok(())
    }

    fn write_meta_and_raw(
        &self,
        key: &str,
        meta: &CachedResourceMeta,
        raw: &str,
    ) -> Result<(), CacheError> {
        // Both must be rewritten together: never commit one without the other (§5).
        let meta_json = serde_json::to_vec_pretty(meta).expect("CachedResourceMeta always serializes");
        self.write_atomic(&self.raw_path(key), raw.as_bytes())?;
        self.write_atomic(&self.meta_path(key), &meta_json)?;
        Ok(())
    }

    /// Fetch `url`, honoring conditional revalidation and content-hash deduplication,
    /// using the cache's own default HTTP client (the system default trust store).
    pub async fn get(&self, url: &str, options: GetOptions) -> Result<CacheEntry, CacheError> {
        self.get_with_client(url, options, &self.client).await
    }

    /// As [`HttpCache::get`], but issues the request over a caller-supplied client
    /// rather than the cache's own default one. GDMF's pinned-root policy (§4.2,
    /// §6) is the only source that needs this; every other fetcher uses [`get`].
    pub async fn get_with_client(
        &self,
        url: &str,
        options: GetOptions,
        client: &reqwest::Client,
    ) -> Result<CacheEntry, CacheError> {
        let key = Self::key(url);
        let existing_meta = self.read_meta(&key);
        let existing_raw = self.read_raw(&key);

        let skip_conditional = options.force_refresh || options.verify_content || existing_meta.is_none();

        let mut request = client.get(url);
        if !skip_conditional {
            if let Some(meta) = &existing_meta {
                if let Some(last_modified) = &meta.last_modified {
                    request = request.header(reqwest::header::IF_MODIFIED_SINCE, last_modified);
                }
            }
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(_) => {
                return existing_raw
                    .map(|body| CacheEntry {
                        body,
                        was_modified: false,
                        from_network: false,
                        fetched_at: existing_meta.map(|m| m.fetched_at).unwrap_or_else(chrono::Utc::now),
                    })
                    .ok_or_else(|| CacheError::NetworkUnavailable { url: url.to_string() });
            }
        };

        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            if let Some(body) = existing_raw {
                let mut meta = existing_meta.unwrap_or_else(|| {
                    CachedResourceMeta::new(url, Sha256Hex::compute_str(&normalized_text(&body)).to_string())
                });
                meta.fetched_at = chrono::Utc::now();
                self.write_meta_and_raw(&key, &meta, &body)?;
                return Ok(CacheEntry {
                    body,
                    was_modified: false,
                    from_network: true,
                    fetched_at: meta.fetched_at,
                });
            }
            // 304 with no cached body: retry unconditionally.
            return Box::pin(self.get_with_client(
                url,
                GetOptions {
                    force_refresh: true,
                    ..options
                },
                client,
            ))
            .await;
        }

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => {
                return existing_raw
                    .map(|body| CacheEntry {
                        body,
                        was_modified: false,
                        from_network: false,
                        fetched_at: existing_meta.map(|m| m.fetched_at).unwrap_or_else(chrono::Utc::now),
                    })
                    .ok_or_else(|| CacheError::NetworkUnavailable { url: url.to_string() });
            }
        };

        let new_hash = Sha256Hex::compute_str(&normalized_text(&body));
        let was_modified = existing_meta
            .as_ref()
            .map(|m| m.content_hash != new_hash.as_str())
            .unwrap_or(true);

        let mut meta = CachedResourceMeta::new(url, new_hash.to_string());
        meta.last_modified = last_modified;
        meta.etag = etag;

        self.write_meta_and_raw(&key, &meta, &body)?;

        Ok(CacheEntry {
            body,
            was_modified,
            from_network: true,
            fetched_at: meta.fetched_at,
        })
    }

    /// Read a previously-cached raw body for `url` without ever touching the
    /// network. The Release Extractor (§4.3) reads cache-only by design.
    pub fn read_cached_raw(&self, url: &str) -> Option<String> {
        self.read_raw(&Self::key(url))
    }

    /// Store a parser-specific derivative for `url`.
    pub fn put_parsed<T: serde::Serialize>(&self, url: &str, value: &T) -> Result<(), CacheError> {
        let key = Self::key(url);
        let json = serde_json::to_vec_pretty(value).expect("derivative type always serializes");
        self.write_atomic(&self.parsed_path(&key), &json)
    }

    /// Load a parser-specific derivative for `url`, if present.
    pub fn get_parsed<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        let key = Self::key(url);
        let text = std::fs::read_to_string(self.parsed_path(&key)).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Raw cache stats: entry count and total bytes across metadata + raw keyspaces.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for dir in [&self.urls_dir, &self.raw_dir, &self.parsed_dir] {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    stats.entry_count += 1;
                    stats.total_bytes += metadata.len();
                }
            }
        }
        stats
    }

    /// Remove cache entries whose metadata's `fetched_at` is older than `max_age_days`.
    pub fn prune(&self, max_age_days: i64) -> std::io::Result<usize> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(max_age_days);
        let mut removed = 0;
        let Ok(entries) = std::fs::read_dir(&self.urls_dir) else {
            return Ok(0);
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(key) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            let Ok(meta) = serde_json::from_str::<CachedResourceMeta>(&text) else {
                continue;
            };
            if meta.fetched_at < cutoff {
                let _ = std::fs::remove_file(&path);
                let _ = std::fs::remove_file(self.raw_path(&key));
                let _ = std::fs::remove_file(self.parsed_path(&key));
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Re-validate every cached metadata and parsed-derivative file as well-formed
    /// JSON, returning the keys that failed to parse. Per-source schema checking
    /// happens naturally at read time (`get_parsed::<T>` returns `None` on
    /// mismatch); this is the maintenance-binary sweep over everything at once.
    pub fn verify(&self) -> Vec<String> {
        let mut bad = Vec::new();
        for dir in [&self.urls_dir, &self.parsed_dir] {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let key = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
                let Ok(text) = std::fs::read_to_string(&path) else {
                    bad.push(key);
                    continue;
                };
                if serde_json::from_str::<serde_json::Value>(&text).is_err() {
                    bad.push(key);
                }
            }
        }
        bad
    }
}

/// Aggregate cache size/age statistics, used by the maintenance binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache(dir: &tempfile::TempDir) -> HttpCache {
        HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        )
    }

    #[tokio::test]
    async fn second_get_with_304_returns_cached_body_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(&dir);

        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock1 = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("last-modified", "Wed, 01 Jan 2025 00:00:00 GMT")
            .with_body("<p>Hello</p>")
            .create_async()
            .await;

        let first = cache.get(&url, GetOptions::default()).await.unwrap();
        assert!(first.was_modified);
        mock1.assert_async().await;

        let mock2 = server
            .mock("GET", "/")
            .match_header("if-modified-since", "Wed, 01 Jan 2025 00:00:00 GMT")
            .with_status(304)
            .create_async()
            .await;

        let second = cache.get(&url, GetOptions::default()).await.unwrap();
        assert!(!second.was_modified);
        assert_eq!(second.body, "<p>Hello</p>");
        mock2.assert_async().await;
    }

    #[tokio::test]
    async fn unchanged_content_hash_reports_not_modified_on_200() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(&dir);

        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<p>Hello   World</p>")
            .create_async()
            .await;
        let first = cache.get(&url, GetOptions::default()).await.unwrap();
        assert!(first.was_modified);

        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<p>Hello\n\nWorld</p>")
            .create_async()
            .await;
        let second = cache
            .get(&url, GetOptions { force_refresh: true, verify_content: true })
            .await
            .unwrap();
        assert!(!second.was_modified, "whitespace-only churn must not count as modified");
    }

    #[tokio::test]
    async fn read_cached_raw_never_hits_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(&dir);
        assert!(cache.read_cached_raw("https://example.com/missing").is_none());

        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        server.mock("GET", "/").with_status(200).with_body("hi").create_async().await;
        cache.get(&url, GetOptions::default()).await.unwrap();

        assert_eq!(cache.read_cached_raw(&url).as_deref(), Some("hi"));
    }

    #[test]
    fn parsed_derivative_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(&dir);
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Row {
            name: String,
        }
        let row = Row { name: "macOS 15.3".into() };
        cache.put_parsed("https://example.com/x", &row).unwrap();
        let loaded: Row = cache.get_parsed("https://example.com/x").unwrap();
        assert_eq!(loaded, row);
    }
}
