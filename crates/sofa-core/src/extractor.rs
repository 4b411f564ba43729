//! Release Extractor (§4.3): turns a cached security detail page into
//! structured release facts -- title, version, build, CVEs, release date.
//! Reads only from the cache; never issues a network request itself.

use regex::Regex;
use scraper::{Html, Selector};
use sofa_schema::CveId;
use std::sync::LazyLock;

static RE_CVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCVE-\d{4}-\d{4,7}\b").expect("static regex"));

// Apple build formats: YYLnnnnn[x] -- YY=year (18-29), L=letter, nnnnn=1-5 digits,
// x=optional lowercase suffix. e.g. 24G84, 22H722, 18A5351d.
static RE_BUILD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:1[89]|2[0-9])[A-Z]\d{1,5}[a-z]?\b").expect("static regex"));

static RE_VERSION_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:iOS|iPadOS|macOS|watchOS|tvOS|visionOS|Safari)\s+([0-9]+(?:\.[0-9]+)*)")
        .expect("static regex")
});

static RE_MACOS_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)macOS\s+(?:\w+\s+)+(\d+(?:\.\d+)*)").expect("static regex"));

static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)iOS\s+(\d+(?:\.\d+)*)",
        r"(?i)iPadOS\s+(\d+(?:\.\d+)*)",
        r"(?i)watchOS\s+(\d+(?:\.\d+)*)",
        r"(?i)tvOS\s+(\d+(?:\.\d+)*)",
        r"(?i)visionOS\s+(\d+(?:\.\d+)*)",
        r"(?i)Safari\s+(\d+(?:\.\d+)*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static RE_RELEASE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Released\s+[A-Za-z]+\s+\d{1,2},\s+\d{4}").expect("static regex"));

static RE_COMPONENT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h3[^>]*>([^<]+)</h3>(.*?)(?:<h3|<h2|\z)").expect("static regex")
});
static RE_IMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Impact:\s*([^<]+)").expect("static regex"));
static RE_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Description:\s*([^<]+)").expect("static regex"));

const NON_COMPONENT_HEADINGS: &[&str] = &[
    "Additional recognition",
    "Additional recognitions",
    "Acknowledgements",
    "Entry added",
    "Entry updated",
];

/// Per-CVE detail pulled from one `<h3>Component</h3>` section of a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CveSection {
    pub component_raw: String,
    pub cves: Vec<CveId>,
    pub impact: Option<String>,
    pub description: Option<String>,
}

/// Split a detail page into its per-component CVE sections (component heading,
/// the CVEs listed under it, and its Impact/Description text, if present).
/// Mirrors the reference project's `extract_from_html`, which favors a direct
/// regex scan over a full DOM walk since Apple's heading-then-prose layout
/// doesn't need one.
pub fn extract_cve_sections(html: &str) -> Vec<CveSection> {
    let mut sections = Vec::new();
    for capture in RE_COMPONENT_SECTION.captures_iter(html) {
        let component_raw = capture[1].trim().to_string();
        if NON_COMPONENT_HEADINGS.contains(&component_raw.as_str()) {
            continue;
        }
        let body = &capture[2];
        let cves = extract_cves_from_text(body);
        if cves.is_empty() {
            continue;
        }
        let impact = RE_IMPACT.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string());
        let description = RE_DESCRIPTION.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string());
        sections.push(CveSection {
            component_raw,
            cves,
            impact,
            description,
        });
    }
    sections
}

/// Basic facts pulled out of one detail page, before CVE/GDMF/component enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRelease {
    pub title: String,
    pub url: String,
    pub version: Option<String>,
    pub build: Option<String>,
    pub cves: Vec<CveId>,
    /// Apple's free-text release-date string, verbatim ("Released January 27, 2025").
    pub release_date_text: Option<String>,
}

/// Extract the version number embedded in a release title
/// ("macOS Sequoia 15.3", "iOS 18.2"). The macOS named-release pattern is
/// tried first since every other platform's title has no release-name prefix.
pub fn extract_version_from_title(title: &str) -> Option<String> {
    if let Some(c) = RE_MACOS_TITLE.captures(title) {
        return c.get(1).map(|m| m.as_str().to_string());
    }
    TITLE_PATTERNS
        .iter()
        .find_map(|re| re.captures(title).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))
}

/// Extract the first Apple build number found in `text`.
pub fn extract_build_from_text(text: &str) -> Option<String> {
    RE_BUILD.find(text).map(|m| m.as_str().to_string())
}

/// Extract every CVE ID in `text`, deduplicated and sorted by (year, sequence).
pub fn extract_cves_from_text(text: &str) -> Vec<CveId> {
    let mut seen = std::collections::BTreeSet::new();
    for m in RE_CVE.find_iter(text) {
        if let Some(cve) = CveId::parse(&m.as_str().to_uppercase()) {
            seen.insert(cve);
        }
    }
    let mut cves: Vec<CveId> = seen.into_iter().collect();
    cves.sort();
    cves
}

/// Extract Apple's "Released <Month> <Day>, <Year>" free-text marker, if present.
pub fn extract_release_date_text(text: &str) -> Option<String> {
    RE_RELEASE_DATE.find(text).map(|m| m.as_str().to_string())
}

/// Parse one cached detail page into [`ExtractedRelease`].
///
/// Build and CVE extraction both search the raw HTML first (build numbers and
/// CVE IDs sometimes live in script/meta tags stripped by text extraction)
/// and fall back to the rendered text only if nothing was found there.
pub fn parse_detail_page(url: &str, html: &str) -> ExtractedRelease {
    let document = Html::parse_document(html);
    let title_sel = Selector::parse("h1, h2").expect("static selector");
    let title = document
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_default();

    let text = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let version = extract_version_from_title(&title).or_else(|| {
        RE_VERSION_FALLBACK
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    });

    let build = extract_build_from_text(html).or_else(|| extract_build_from_text(&text));

    let mut cves = extract_cves_from_text(html);
    if cves.is_empty() {
        cves = extract_cves_from_text(&text);
    }

    let release_date_text = extract_release_date_text(&text);

    ExtractedRelease {
        title,
        url: url.to_string(),
        version,
        build,
        cves,
        release_date_text,
    }
}

/// Parse Apple's free-text release-date marker ("Released January 27, 2025"
/// or the bare index-row form "Jan 27, 2025") into a UTC midnight timestamp.
/// Tries the `locale`-preferred ordering first, then the other (§6, `LOCALE`
/// date-parsing hint) -- Apple always writes month-name-first regardless of
/// locale, so this mostly just controls which format string is tried first.
pub fn parse_apple_date(text: &str, locale: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let cleaned = text.strip_prefix("Released").unwrap_or(text).trim();
    let us_first = locale.is_empty() || locale.eq_ignore_ascii_case("en") || locale.to_lowercase().starts_with("en_us");
    let formats: [&str; 2] = if us_first {
        ["%B %d, %Y", "%b %d, %Y"]
    } else {
        ["%b %d, %Y", "%B %d, %Y"]
    };
    formats
        .iter()
        .find_map(|fmt| chrono::NaiveDate::parse_from_str(cleaned, fmt).ok())
        .map(|date| date.and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc())
}

/// Build a minimal [`ExtractedRelease`] when no detail page is cached, from
/// just the index-page row (name + date text), so a release still exists in
/// the feed even without a reachable detail page.
pub fn basic_info(url: &str, name: &str, date_text: Option<&str>) -> ExtractedRelease {
    ExtractedRelease {
        title: name.to_string(),
        url: url.to_string(),
        version: extract_version_from_title(name),
        build: None,
        cves: Vec::new(),
        release_date_text: date_text.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_macos_named_release_version() {
        assert_eq!(extract_version_from_title("macOS Sequoia 15.3").as_deref(), Some("15.3"));
        assert_eq!(extract_version_from_title("macOS Big Sur 11.7.9").as_deref(), Some("11.7.9"));
    }

    #[test]
    fn extracts_simple_platform_version() {
        assert_eq!(extract_version_from_title("iOS 18.2 and iPadOS 18.2").as_deref(), Some("18.2"));
    }

    #[test]
    fn build_pattern_rejects_years_outside_range() {
        assert_eq!(extract_build_from_text("About the security content of 24G84"), Some("24G84".into()));
        assert!(extract_build_from_text("About 17A5352j").is_none(), "year 17 is out of the 18-29 range");
    }

    #[test]
    fn cves_are_deduped_and_sorted() {
        let text = "CVE-2024-9999 fixed. Also cve-2023-1 and CVE-2024-9999 again.";
        let cves = extract_cves_from_text(text);
        assert_eq!(cves.iter().map(CveId::as_str).collect::<Vec<_>>(), vec!["CVE-2023-1", "CVE-2024-9999"]);
    }

    #[test]
    fn parse_detail_page_prefers_html_for_build_and_cves() {
        let html = r#"<html><body><h1>macOS Sequoia 15.3</h1>
            <script>var build="24D60";</script>
            <p>Fixes CVE-2025-1000. Released January 27, 2025</p>
        </body></html>"#;
        let release = parse_detail_page("https://support.apple.com/en-us/100000", html);
        assert_eq!(release.version.as_deref(), Some("15.3"));
        assert_eq!(release.build.as_deref(), Some("24D60"));
        assert_eq!(release.cves.len(), 1);
        assert_eq!(release.release_date_text.as_deref(), Some("Released January 27, 2025"));
    }

    #[test]
    fn parse_apple_date_strips_released_prefix() {
        let parsed = parse_apple_date("Released January 27, 2025", "en_US").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-01-27T00:00:00+00:00");
    }

    #[test]
    fn parse_apple_date_handles_bare_index_row_form() {
        let parsed = parse_apple_date("Jan 27, 2025", "en_US").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-01-27T00:00:00+00:00");
    }

    #[test]
    fn basic_info_falls_back_to_title_derived_version() {
        let release = basic_info("https://support.apple.com/en-us/100000", "iOS 18.2", Some("January 27, 2025"));
        assert_eq!(release.version.as_deref(), Some("18.2"));
        assert!(release.build.is_none());
        assert!(release.cves.is_empty());
    }

    #[test]
    fn cve_sections_split_by_component_heading() {
        let html = r#"
            <h3>WebKit</h3>
            <p>Impact: Processing maliciously crafted web content may lead to arbitrary code execution</p>
            <p>Description: A memory corruption issue was addressed with improved memory handling.</p>
            <p>CVE-2025-1000</p>
            <h3>Additional recognition</h3>
            <p>We would like to thank an anonymous researcher.</p>
            <h3>Kernel</h3>
            <p>Impact: An app may be able to execute arbitrary code with kernel privileges</p>
            <p>CVE-2025-2000, CVE-2025-2001</p>
        "#;
        let sections = extract_cve_sections(html);
        assert_eq!(sections.len(), 2, "Additional recognition must not become a component section");
        assert_eq!(sections[0].component_raw, "WebKit");
        assert_eq!(sections[0].cves.iter().map(CveId::as_str).collect::<Vec<_>>(), vec!["CVE-2025-1000"]);
        assert!(sections[0].impact.as_ref().unwrap().contains("arbitrary code execution"));
        assert_eq!(sections[1].component_raw, "Kernel");
        assert_eq!(sections[1].cves.len(), 2);
    }

    #[test]
    fn component_section_with_no_cves_is_skipped() {
        let html = "<h3>Safari Extensions</h3><p>No published CVE entries.</p>";
        assert!(extract_cve_sections(html).is_empty());
    }
}
