use crate::cache::{GetOptions, HttpCache};
use crate::config::DetailPageConfig;
use crate::fetch::OriginRateLimiter;
use serde::{Deserialize, Serialize};
use sofa_schema::FailedUrl;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Outcome of fetching one detail page: the fetcher itself does not parse content,
/// it only guarantees the page is cached for the Release Extractor to read (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailPageData {
    pub url: String,
    pub fetched: bool,
}

/// Fetches Apple knowledge-base detail pages concurrently, deduplicated and
/// rate-limited per origin (§4.2, §5).
#[derive(Debug, Default)]
pub struct DetailPageFetcher;

impl DetailPageFetcher {
    /// Fetch every eligible URL from `candidates`, returning the ones that succeeded.
    /// Failures are appended to the failed-URLs sidecar for next-run recovery.
    pub async fn fetch_all(
        cache: Arc<HttpCache>,
        candidates: Vec<(String, Option<chrono::DateTime<chrono::Utc>>)>,
        policy: &DetailPageConfig,
        workers: usize,
        rate_limit_delay_secs: f64,
        failed_urls_path: &std::path::Path,
    ) -> Vec<DetailPageData> {
        let now = chrono::Utc::now();

        let mut seen = HashSet::new();
        let mut eligible: Vec<String> = Vec::new();
        for (url, date) in candidates {
            if !policy.should_fetch(&url, date, now) {
                continue;
            }
            let canonical = crate::cache::canonicalize_url(&url);
            if seen.insert(canonical) {
                eligible.push(url);
            }
        }

        if let Some(max) = policy.max_pages {
            eligible.truncate(max);
        }

        let limiter = OriginRateLimiter::new(Duration::from_secs_f64(rate_limit_delay_secs));
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut failures = Vec::new();

        let tasks: Vec<_> = eligible
            .into_iter()
            .map(|url| {
                let cache = Arc::clone(&cache);
                let limiter = limiter.clone();
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                    limiter.wait_turn(&url).await;
                    let result = cache.get(&url, GetOptions::default()).await;
                    (url, result.is_ok(), result.err().map(|e| e.to_string()))
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            if let Ok((url, ok, error)) = task.await {
                if ok {
                    results.push(DetailPageData { url, fetched: true });
                } else if let Some(error) = error {
                    failures.push(FailedUrl {
                        url,
                        error,
                        last_attempt: chrono::Utc::now(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            Self::record_failures(failed_urls_path, failures);
        }

        results
    }

    fn record_failures(path: &std::path::Path, mut new_failures: Vec<FailedUrl>) {
        let mut existing: Vec<FailedUrl> = std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        existing.retain(|f| !new_failures.iter().any(|n| n.url == f.url));
        existing.append(&mut new_failures);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_vec_pretty(&existing) {
            let _ = std::fs::write(path, json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    #[tokio::test]
    async fn dedupes_equivalent_url_shapes_and_respects_max_pages() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        ));

        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/en-us/HT1")
            .with_status(200)
            .with_body("<p>one</p>")
            .create_async()
            .await;

        let candidates = vec![
            (format!("{base}/en-us/HT1"), None),
            (format!("{base}/kb/HT1"), None),
        ];

        let mut policy = DetailPageConfig::default();
        policy.max_pages = Some(10);

        let results = DetailPageFetcher::fetch_all(
            cache,
            candidates,
            &policy,
            2,
            0.0,
            &dir.path().join("failed.json"),
        )
        .await;

        assert_eq!(results.len(), 1, "equivalent URL shapes must dedupe to one fetch");
    }
}
