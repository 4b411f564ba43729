use crate::cache::{GetOptions, HttpCache};
use crate::config::KevConfig;
use crate::error::FetchError;
use serde::Deserialize;
use sofa_schema::KevEntry;
use std::collections::{BTreeMap, HashSet};

/// The CISA Known Exploited Vulnerabilities catalog, indexed by CVE ID for
/// O(1) membership checks during enrichment (§4.4).
#[derive(Debug, Clone, Default)]
pub struct KevSnapshot {
    pub entries: BTreeMap<String, KevEntry>,
}

impl KevSnapshot {
    pub fn contains(&self, cve_id: &str) -> bool {
        self.entries.contains_key(cve_id)
    }

    pub fn cve_ids(&self) -> HashSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Deserialize)]
struct KevCatalog {
    vulnerabilities: Vec<KevVulnerability>,
}

#[derive(Debug, Deserialize)]
struct KevVulnerability {
    #[serde(rename = "cveID")]
    cve_id: String,
    #[serde(rename = "dateAdded")]
    date_added: String,
    #[serde(rename = "vendorProject")]
    vendor_project: String,
    product: String,
    #[serde(rename = "shortDescription")]
    short_description: String,
    #[serde(rename = "knownRansomwareCampaignUse", default)]
    known_ransomware_campaign_use: String,
}

/// Fetches and parses the CISA KEV catalog (§4.2, §4.4).
#[derive(Debug, Default)]
pub struct KevClient;

impl KevClient {
    pub async fn fetch(cache: &HttpCache, config: &KevConfig) -> Result<KevSnapshot, FetchError> {
        if !config.fetch_cisa_kev {
            return Ok(KevSnapshot::default());
        }

        let entry = cache.get(&config.cisa_kev_url, GetOptions::default()).await?;
        let catalog: KevCatalog =
            serde_json::from_str(&entry.body).map_err(|e| FetchError::ParseError {
                url: config.cisa_kev_url.clone(),
                reason: e.to_string(),
            })?;

        let entries = catalog
            .vulnerabilities
            .into_iter()
            .filter(|v| v.vendor_project.eq_ignore_ascii_case("apple"))
            .map(|v| {
                (
                    v.cve_id.clone(),
                    KevEntry {
                        cve_id: v.cve_id,
                        date_added: v.date_added,
                        vendor_project: v.vendor_project,
                        product: v.product,
                        short_description: v.short_description,
                        ransomware_use: v.known_ransomware_campaign_use.eq_ignore_ascii_case("known"),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        cache.put_parsed(&config.cisa_kev_url, &entries)?;
        Ok(KevSnapshot { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    #[tokio::test]
    async fn filters_to_apple_vendor_entries_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );

        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "vulnerabilities": [
                {"cveID": "CVE-2025-1", "dateAdded": "2025-01-01", "vendorProject": "Apple", "product": "iOS", "shortDescription": "x", "knownRansomwareCampaignUse": "Unknown"},
                {"cveID": "CVE-2025-2", "dateAdded": "2025-01-01", "vendorProject": "Microsoft", "product": "Windows", "shortDescription": "y", "knownRansomwareCampaignUse": "Unknown"}
            ]
        }"#;
        server
            .mock("GET", "/kev.json")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let config = KevConfig {
            fetch_cisa_kev: true,
            cisa_kev_url: format!("{}/kev.json", server.url()),
            ..KevConfig::default()
        };

        let snapshot = KevClient::fetch(&cache, &config).await.unwrap();
        assert!(snapshot.contains("CVE-2025-1"));
        assert!(!snapshot.contains("CVE-2025-2"));
    }
}
