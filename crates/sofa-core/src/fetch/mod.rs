//! Per-source fetchers: thin adapters over [`crate::cache::HttpCache`] plus a
//! source-specific parser (§4.2). Each fetcher reports its own success/failure so
//! the orchestrator's Fetch stage can continue past a partial outage.

mod beta;
mod detail_page;
mod gdmf;
mod ipsw_uma;
mod kev;
mod security_index;
mod xprotect;

pub use beta::{BetaEntry, BetaReleasesScraper};
pub use detail_page::{DetailPageData, DetailPageFetcher};
pub use gdmf::{GdmfClient, GdmfSnapshot};
pub use ipsw_uma::{IpswInfo, UmaInfo, ipsw_lookup, uma_lookup};
pub use kev::{KevClient, KevSnapshot};
pub use security_index::{IndexRow, SecurityIndexFetcher};
pub use xprotect::{XProtectClient, XProtectSnapshot};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Serializes requests to the same origin with a minimum inter-request delay (§5).
#[derive(Debug, Clone)]
pub struct OriginRateLimiter {
    delay: Duration,
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl OriginRateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn origin_of(url: &str) -> String {
        url.split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or(url)
            .to_string()
    }

    /// Wait, if needed, so that this origin is not hit more often than `delay`.
    pub async fn wait_turn(&self, url: &str) {
        let origin = Self::origin_of(url);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = last.get(&origin) {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        last.insert(origin, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_of_ignores_path_and_query() {
        assert_eq!(
            OriginRateLimiter::origin_of("https://support.apple.com/en-us/HT213931"),
            "support.apple.com"
        );
    }
}
