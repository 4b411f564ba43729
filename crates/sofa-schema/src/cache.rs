//! On-disk shape of HTTP Cache metadata entries (`data/cache/urls/<sha1>.json`).

use serde::{Deserialize, Serialize};

/// Metadata stored alongside every cached URL: everything needed to decide whether
/// a conditional revalidation is possible and whether the content actually changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResourceMeta {
    pub url: String,
    pub content_hash: String,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

impl CachedResourceMeta {
    pub fn new(url: impl Into<String>, content_hash: String) -> Self {
        Self {
            url: url.into(),
            content_hash,
            last_modified: None,
            etag: None,
            fetched_at: chrono::Utc::now(),
        }
    }
}

/// A failed detail-page fetch recorded for next-run retry (`failed_detail_urls.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUrl {
    pub url: String,
    pub error: String,
    pub last_attempt: chrono::DateTime<chrono::Utc>,
}
