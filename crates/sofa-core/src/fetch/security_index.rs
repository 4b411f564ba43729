use crate::cache::{GetOptions, HttpCache};
use crate::error::FetchError;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use sofa_schema::Platform;

/// One row parsed from an Apple security-release index page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRow {
    pub name: String,
    pub date: String,
    pub os_type: Option<Platform>,
    pub detail_url: Option<String>,
}

/// Fetches and parses Apple's security-release index pages (§4.2).
#[derive(Debug, Default)]
pub struct SecurityIndexFetcher;

impl SecurityIndexFetcher {
    /// Fetch one index page, returning its parsed rows. The parsed form is
    /// cached under the page URL so the Release Extractor can read it without
    /// re-parsing HTML on every Process run.
    pub async fn fetch(cache: &HttpCache, url: &str) -> Result<Vec<IndexRow>, FetchError> {
        let entry = cache.get(url, GetOptions::default()).await?;
        let rows = parse_index_page(&entry.body, url);
        // Only re-emit the parsed derivative when the content actually changed
        // (§4.1: an unchanged content_hash means no parsed derivative is
        // re-emitted), unless nothing has been parsed for this URL yet.
        if entry.was_modified || cache.get_parsed::<Vec<IndexRow>>(url).is_none() {
            cache.put_parsed(url, &rows)?;
        }
        Ok(rows)
    }
}

fn parse_index_page(html: &str, base_url: &str) -> Vec<IndexRow> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table tr").expect("static selector");
    let cell_sel = Selector::parse("td").expect("static selector");
    let link_sel = Selector::parse("a").expect("static selector");

    let mut rows = Vec::new();
    for tr in document.select(&row_sel) {
        let cells: Vec<_> = tr.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }

        let name = cells[0].text().collect::<String>().trim().to_string();
        if name.is_empty() {
            continue;
        }
        let date = cells[1].text().collect::<String>().trim().to_string();

        let detail_url = cells[0]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_url(base_url, href));

        let os_type = Platform::detect(&name);

        rows.push(IndexRow {
            name,
            date,
            os_type,
            detail_url,
        });
    }
    rows
}

/// Resolve a (possibly relative) `href` against `base_url`'s scheme and host.
fn resolve_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let origin_end = base_url
        .find("://")
        .and_then(|scheme_end| base_url[scheme_end + 3..].find('/').map(|i| scheme_end + 3 + i))
        .unwrap_or(base_url.len());
    let origin = &base_url[..origin_end];
    if let Some(rest) = href.strip_prefix('/') {
        format!("{origin}/{rest}")
    } else {
        format!("{origin}/{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_detects_platform() {
        let html = r#"
            <table>
              <tr><td><a href="/en-us/HT213931">macOS Sequoia 15.3</a></td><td>Jan 27, 2025</td></tr>
              <tr><td><a href="/en-us/HT213932">iOS 18.2</a></td><td>Jan 27, 2025</td></tr>
              <tr><td>Not a release row</td></tr>
            </table>
        "#;
        let rows = parse_index_page(html, "https://support.apple.com/en-us/100100");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].os_type, Some(Platform::MacOs));
        assert_eq!(
            rows[0].detail_url.as_deref(),
            Some("https://support.apple.com/en-us/HT213931")
        );
        assert_eq!(rows[1].os_type, Some(Platform::Ios));
    }

    #[test]
    fn resolve_url_handles_absolute_and_relative() {
        assert_eq!(
            resolve_url("https://support.apple.com/en-us/100100", "/en-us/HT1"),
            "https://support.apple.com/en-us/HT1"
        );
        assert_eq!(
            resolve_url("https://support.apple.com/en-us/100100", "https://x.com/y"),
            "https://x.com/y"
        );
    }

    #[tokio::test]
    async fn unchanged_content_does_not_rewrite_the_parsed_derivative() {
        use crate::config::HttpConfig;

        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &HttpConfig::default(),
        );

        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let body = r#"<table><tr><td><a href="/en-us/HT1">macOS Sequoia 15.3</a></td><td>Jan 27, 2025</td></tr></table>"#;
        server.mock("GET", "/").with_status(200).with_body(body).create_async().await;

        SecurityIndexFetcher::fetch(&cache, &url).await.unwrap();

        // Tamper with the parsed derivative directly; a skipped reparse must leave it be.
        #[derive(serde::Serialize)]
        struct Sentinel {
            sentinel: bool,
        }
        cache.put_parsed(&url, &Sentinel { sentinel: true }).unwrap();

        server.mock("GET", "/").with_status(200).with_body(body).create_async().await;
        SecurityIndexFetcher::fetch(&cache, &url).await.unwrap();

        let tampered: serde_json::Value = cache.get_parsed(&url).unwrap();
        assert_eq!(tampered["sentinel"], true, "unchanged content must not trigger a reparse");
    }
}
