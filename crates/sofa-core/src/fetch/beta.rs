use crate::cache::{GetOptions, HttpCache};
use crate::config::BetaConfig;
use crate::error::FetchError;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use sofa_schema::Platform;

/// One beta release parsed from Apple's developer releases page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaEntry {
    pub platform: Platform,
    pub version: String,
    pub build: String,
    pub posted: String,
}

/// Scrapes Apple's developer beta releases page and maintains a persistent
/// append-only archive so entries that scroll out of the page's visible
/// window are not lost (§4.2).
#[derive(Debug, Default)]
pub struct BetaReleasesScraper;

impl BetaReleasesScraper {
    pub async fn fetch(
        cache: &HttpCache,
        url: &str,
        config: &BetaConfig,
    ) -> Result<Vec<BetaEntry>, FetchError> {
        if !config.enabled {
            return Ok(Vec::new());
        }
        let entry = cache.get(url, GetOptions::default()).await?;
        let entries = parse_beta_page(&entry.body);
        cache.put_parsed(url, &entries)?;
        Ok(entries)
    }

    /// Merge newly-fetched entries into a persistent archive, deduplicated by
    /// (platform, version, build), preserving entries already archived even if
    /// Apple's page no longer lists them.
    pub fn merge_archive(archive: &mut Vec<BetaEntry>, fresh: Vec<BetaEntry>) {
        for entry in fresh {
            let exists = archive
                .iter()
                .any(|e| e.platform == entry.platform && e.version == entry.version && e.build == entry.build);
            if !exists {
                archive.push(entry);
            }
        }
    }
}

fn parse_beta_page(html: &str) -> Vec<BetaEntry> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table tr").expect("static selector");
    let cell_sel = Selector::parse("td").expect("static selector");

    let mut entries = Vec::new();
    for tr in document.select(&row_sel) {
        let cells: Vec<_> = tr.select(&cell_sel).map(|c| c.text().collect::<String>().trim().to_string()).collect();
        if cells.len() < 3 {
            continue;
        }
        let Some(platform) = Platform::detect(&cells[0]) else {
            continue;
        };
        entries.push(BetaEntry {
            platform,
            version: cells[1].clone(),
            build: cells[2].clone(),
            posted: cells.get(3).cloned().unwrap_or_default(),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_version_build_rows() {
        let html = r#"
            <table>
              <tr><td>iOS 18.4 beta</td><td>18.4</td><td>22E5200s</td><td>Feb 3, 2025</td></tr>
              <tr><td>not a release</td></tr>
            </table>
        "#;
        let entries = parse_beta_page(html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].platform, Platform::Ios);
        assert_eq!(entries[0].build, "22E5200s");
    }

    #[test]
    fn merge_archive_dedupes_on_platform_version_build() {
        let mut archive = vec![BetaEntry {
            platform: Platform::Ios,
            version: "18.4".into(),
            build: "22E5200s".into(),
            posted: "Feb 3, 2025".into(),
        }];
        let fresh = vec![
            archive[0].clone(),
            BetaEntry {
                platform: Platform::Ios,
                version: "18.4".into(),
                build: "22E5228d".into(),
                posted: "Feb 10, 2025".into(),
            },
        ];
        BetaReleasesScraper::merge_archive(&mut archive, fresh);
        assert_eq!(archive.len(), 2, "duplicate entry must not be appended twice");
    }
}
