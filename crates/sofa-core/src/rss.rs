//! RSS 2.0 view over the retained release list (§4.8), one channel per platform.
//! Items are capped per OSVersion and rendered with a plain-text description
//! carrying CVE counts and KEV highlights.

use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use sofa_schema::{Platform, ReleaseRecord};
use std::io::Cursor;

const MAX_ITEMS_PER_OS_VERSION: usize = 20;

fn rfc822(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc2822()
}

fn item_description(release: &ReleaseRecord) -> String {
    let total = release.cves.len();
    let exploited = release.actively_exploited_cves().len();
    if total == 0 {
        return format!("{} — no CVEs recorded.", release.title);
    }
    if exploited == 0 {
        format!("{} — {total} CVE(s) addressed.", release.title)
    } else {
        format!("{} — {total} CVE(s) addressed, {exploited} actively exploited.", release.title)
    }
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape(text))))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, platform: Platform, release: &ReleaseRecord) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_element(writer, "title", &release.title)?;
    write_element(writer, "link", &release.url)?;
    write_element(writer, "description", &item_description(release))?;

    let guid_value = format!("{}-{}-{}", platform.slug(), release.version.as_str(), release.release_date.to_rfc3339());
    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape(&guid_value))))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    write_element(writer, "pubDate", &rfc822(release.release_date))?;
    writer.write_event(Event::End(BytesEnd::new("item")))
}

/// Render one platform's RSS 2.0 channel. `releases` must already be grouped
/// and newest-first within each OSVersion; this caps items per OSVersion label
/// rather than globally, so every tracked OS version stays represented.
pub fn render_channel(
    platform: Platform,
    groups: &[(String, Vec<&ReleaseRecord>)],
    feed_url: &str,
) -> String {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss)).expect("in-memory write never fails");
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .expect("in-memory write never fails");

    write_element(&mut writer, "title", &format!("{} Security Releases", platform.label())).unwrap();
    write_element(&mut writer, "link", feed_url).unwrap();
    write_element(
        &mut writer,
        "description",
        &format!("Security releases for {} tracked via SOFA.", platform.label()),
    )
    .unwrap();

    for (_, releases) in groups {
        for release in releases.iter().take(MAX_ITEMS_PER_OS_VERSION) {
            write_item(&mut writer, platform, release).expect("in-memory write never fails");
        }
    }

    writer.write_event(Event::End(BytesEnd::new("channel"))).unwrap();
    writer.write_event(Event::End(BytesEnd::new("rss"))).unwrap();

    String::from_utf8(writer.into_inner().into_inner()).expect("quick-xml writes valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sofa_schema::PackagingVersion;
    use std::collections::BTreeMap;

    fn release(version: &str, build: &str, cve_count: usize) -> ReleaseRecord {
        ReleaseRecord {
            platform: Platform::Ios,
            version: PackagingVersion::new(version),
            build: build.to_string(),
            title: format!("iOS {version}"),
            release_date: chrono::Utc::now(),
            url: "https://support.apple.com/en-us/100000".to_string(),
            cves: (0..cve_count).map(|i| sofa_schema::CveId::from(format!("CVE-2025-{i}").as_str())).collect(),
            cve_details: BTreeMap::new(),
            supported_devices: Vec::new(),
            all_builds: vec![build.to_string()],
            expiration_date: None,
            release_type: sofa_schema::ReleaseType::Os,
            days_since_previous: None,
            is_pinned: false,
        }
    }

    #[test]
    fn channel_caps_items_per_os_version_group() {
        let releases: Vec<ReleaseRecord> = (0..25).map(|i| release(&format!("18.{i}"), "B", 0)).collect();
        let refs: Vec<&ReleaseRecord> = releases.iter().collect();
        let groups = vec![("18".to_string(), refs)];
        let xml = render_channel(Platform::Ios, &groups, "https://sofa.example/v1/ios_data_feed.json");
        assert_eq!(xml.matches("<item>").count(), MAX_ITEMS_PER_OS_VERSION);
    }

    #[test]
    fn guid_is_non_permalink_and_includes_platform_version_date() {
        let r = release("18.2", "22D63", 1);
        let refs = vec![&r];
        let groups = vec![("18".to_string(), refs)];
        let xml = render_channel(Platform::Ios, &groups, "https://sofa.example/v1/ios_data_feed.json");
        assert!(xml.contains("isPermaLink=\"false\""));
        assert!(xml.contains("ios-18.2-"));
    }

    #[test]
    fn description_mentions_exploited_count_only_when_nonzero() {
        let r = release("18.2", "22D63", 3);
        assert!(item_description(&r).contains("3 CVE(s) addressed."));
        assert!(!item_description(&r).contains("exploited"));
    }
}
