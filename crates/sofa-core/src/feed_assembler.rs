//! Feed Assembler (§4.8): turns a platform's retained [`ReleaseRecord`]s into the
//! emitted v1/v2 JSON documents, grouped by `OSVersion` label with a stable
//! content hash.

use sofa_schema::feed::{
    ComponentBreakdown, CveMetrics, ExploitationWarning, GlobalInsights, Statistics,
    V1CveMap, V1FeedDocument, V1OsVersionBlock, V1Release, V2CveEntry, V2FeedDocument,
    V2OsVersionBlock, V2Release,
};
use sofa_schema::{ComponentCategory, Platform, ReleaseRecord, Sha256Hex};
use std::collections::BTreeMap;

static RE_MACOS_NAME: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"(?i)macOS\s+((?:[A-Za-z]+\s?)+?)\s+\d").expect("static regex")
});

/// The `OSVersion` grouping label for one release ("Sequoia 15" for macOS, "18" otherwise).
pub fn os_version_label(platform: Platform, release: &ReleaseRecord) -> String {
    let major = release
        .version
        .as_str()
        .split('.')
        .next()
        .unwrap_or(release.version.as_str());
    if platform == Platform::MacOs {
        if let Some(name) = RE_MACOS_NAME
            .captures(&release.title)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
        {
            return format!("{name} {major}");
        }
    }
    major.to_string()
}

/// Group releases by `OSVersion` label, each group sorted newest-first, groups
/// themselves ordered by their newest release descending.
pub fn group_by_os_version(platform: Platform, releases: Vec<ReleaseRecord>) -> Vec<(String, Vec<ReleaseRecord>)> {
    let mut groups: BTreeMap<String, Vec<ReleaseRecord>> = BTreeMap::new();
    for release in releases {
        let label = os_version_label(platform, &release);
        groups.entry(label).or_default().push(release);
    }
    let mut blocks: Vec<(String, Vec<ReleaseRecord>)> = groups.into_iter().collect();
    for (_, group) in blocks.iter_mut() {
        group.sort_by(|a, b| b.release_date.cmp(&a.release_date));
        layer_supported_devices(group);
    }
    blocks.sort_by(|a, b| {
        let a_date = a.1.first().map(|r| r.release_date);
        let b_date = b.1.first().map(|r| r.release_date);
        b_date.cmp(&a_date)
    });
    blocks
}

/// Device layering across versions (expansion, grounded in `layer_supported_devices`):
/// a release with no GDMF-matched devices inherits the device list of the
/// nearest newer release in the same OSVersion block that has one.
fn layer_supported_devices(group: &mut [ReleaseRecord]) {
    let mut carry: Option<Vec<String>> = None;
    for release in group.iter_mut() {
        if release.supported_devices.is_empty() {
            if let Some(devices) = &carry {
                release.supported_devices = devices.clone();
            }
        } else {
            carry = Some(release.supported_devices.clone());
        }
    }
}

/// `DaysSincePreviousRelease` per release in a newest-first-sorted group: the
/// gap to the next (older) release; the oldest release in the group gets 0.
fn days_since_previous(group: &[ReleaseRecord]) -> Vec<i64> {
    group
        .iter()
        .enumerate()
        .map(|(i, release)| match group.get(i + 1) {
            Some(older) => (release.release_date - older.release_date).num_days(),
            None => 0,
        })
        .collect()
}

fn to_v1_release(release: &ReleaseRecord, days_since_previous: i64) -> V1Release {
    let cves: V1CveMap = release
        .cves
        .iter()
        .map(|cve| {
            let exploited = release
                .cve_details
                .get(cve.as_str())
                .is_some_and(|d| d.exploitation.qualifies_for_exploited_list());
            (cve.as_str().to_string(), exploited)
        })
        .collect();
    let actively_exploited_cves = release
        .actively_exploited_cves()
        .into_iter()
        .map(|c| c.as_str().to_string())
        .collect();

    V1Release {
        product_version: release.version.as_str().to_string(),
        build: release.build.clone(),
        all_builds: release.all_builds.clone(),
        release_date: release.release_date.to_rfc3339(),
        expiration_date: release
            .expiration_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_default(),
        supported_devices: release.supported_devices.clone(),
        security_info: release.url.clone(),
        cves,
        actively_exploited_cves,
        unique_cves_count: release.cves.len(),
        days_since_previous_release: days_since_previous,
    }
}

fn component_breakdown(release: &ReleaseRecord) -> ComponentBreakdown {
    let mut breakdown: ComponentBreakdown = BTreeMap::new();
    for detail in release.cve_details.values() {
        *breakdown.entry(detail.component.to_string()).or_insert(0) += 1;
    }
    breakdown
}

fn cve_metrics(release: &ReleaseRecord) -> CveMetrics {
    let total = release.cves.len();
    let exploited = release.actively_exploited_cves().len();
    CveMetrics {
        total_cves: total,
        exploited_cves: exploited,
        exploitation_rate: if total == 0 { 0.0 } else { exploited as f64 / total as f64 },
    }
}

fn exploitation_warnings(release: &ReleaseRecord) -> Vec<ExploitationWarning> {
    release
        .cve_details
        .iter()
        .filter(|(_, detail)| {
            detail
                .exploitation
                .sources
                .contains(&sofa_schema::ExploitationSource::CrossPlatform)
        })
        .map(|(cve, detail)| ExploitationWarning {
            cve: cve.clone(),
            note: detail
                .exploitation
                .notes
                .clone()
                .unwrap_or_else(|| "known exploited on another platform".to_string()),
        })
        .collect()
}

fn to_v2_release(release: &ReleaseRecord, days_since_previous: i64) -> V2Release {
    let cves: BTreeMap<String, V2CveEntry> = release
        .cves
        .iter()
        .map(|cve| {
            let detail = release.cve_details.get(cve.as_str());
            let entry = V2CveEntry {
                id: cve.as_str().to_string(),
                is_exploited: detail.is_some_and(|d| d.exploitation.qualifies_for_exploited_list()),
                component: detail.map(|d| d.component.to_string()).unwrap_or_default(),
                component_raw: detail.map(|d| d.component_raw.clone()).unwrap_or_default(),
                impact: detail.and_then(|d| d.impact.clone()),
                description: detail.and_then(|d| d.description.clone()),
                platforms: detail
                    .map(|d| d.exploitation.affected_platforms.iter().map(|p| p.label().to_string()).collect())
                    .unwrap_or_default(),
                confidence: detail
                    .map(|d| format!("{:?}", d.exploitation.confidence).to_lowercase())
                    .unwrap_or_else(|| "low".to_string()),
                sources: detail
                    .map(|d| d.exploitation.sources.iter().map(|s| format!("{s:?}")).collect())
                    .unwrap_or_default(),
                targeted_attack: detail.map(|d| d.exploitation.is_targeted_attack),
                physical_attack: detail.map(|d| d.exploitation.is_physical_attack),
                targeted_versions: detail.and_then(|d| d.exploitation.targeted_versions.clone()),
                exploitation_notes: detail.and_then(|d| d.exploitation.notes.clone()),
            };
            (cve.as_str().to_string(), entry)
        })
        .collect();
    let actively_exploited_cves = release
        .actively_exploited_cves()
        .into_iter()
        .map(|c| c.as_str().to_string())
        .collect();

    V2Release {
        product_version: release.version.as_str().to_string(),
        build: release.build.clone(),
        all_builds: release.all_builds.clone(),
        release_date: release.release_date.to_rfc3339(),
        expiration_date: release
            .expiration_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_default(),
        supported_devices: release.supported_devices.clone(),
        security_info: release.url.clone(),
        cves,
        actively_exploited_cves,
        exploitation_warnings: exploitation_warnings(release),
        unique_cves_count: release.cves.len(),
        days_since_previous_release: days_since_previous,
        cve_metrics: cve_metrics(release),
        component_breakdown: component_breakdown(release),
    }
}

fn statistics(group: &[ReleaseRecord]) -> Statistics {
    let total_releases = group.len();
    let mut all_cves: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
    let mut total_kevs = 0usize;
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for release in group {
        for cve in &release.cves {
            all_cves.insert(cve.as_str());
        }
        total_kevs += release.actively_exploited_cves().len();
        for detail in release.cve_details.values() {
            *distribution.entry(detail.component.to_string()).or_insert(0) += 1;
        }
    }
    let mut top: Vec<(String, usize)> = distribution.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(10);

    let total_cves = all_cves.len();
    Statistics {
        total_releases,
        total_cves,
        total_kevs,
        component_distribution: top.into_iter().collect(),
        exploitation_rate: if total_cves == 0 { 0.0 } else { total_kevs as f64 / total_cves as f64 },
    }
}

fn global_insights(blocks: &[(String, Vec<ReleaseRecord>, Statistics)]) -> GlobalInsights {
    let mut component_totals: BTreeMap<String, usize> = BTreeMap::new();
    let mut high_risk: Vec<(String, f64)> = Vec::new();

    for (label, releases, _) in blocks {
        for release in releases {
            for detail in release.cve_details.values() {
                *component_totals.entry(detail.component.to_string()).or_insert(0) += 1;
            }
            let metrics = cve_metrics(release);
            if metrics.exploitation_rate > 0.5 {
                high_risk.push((
                    format!("{label} {} ({})", release.version.as_str(), release.build),
                    metrics.exploitation_rate,
                ));
            }
        }
    }

    let mut most_affected: Vec<(String, usize)> = component_totals.into_iter().collect();
    most_affected.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_affected.truncate(10);

    high_risk.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    high_risk.truncate(10);

    GlobalInsights {
        most_affected_components: most_affected,
        high_risk_releases: high_risk.into_iter().map(|(label, _)| label).collect(),
    }
}

fn canonical_hash<T: serde::Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).expect("feed documents always serialize");
    Sha256Hex::compute_str(&json).to_string()
}

/// Assemble the v1 (legacy) feed document for `platform` from its retained releases.
pub fn assemble_v1(platform: Platform, releases: Vec<ReleaseRecord>) -> V1FeedDocument {
    let blocks = group_by_os_version(platform, releases);
    let os_versions: Vec<V1OsVersionBlock> = blocks
        .into_iter()
        .map(|(label, group)| {
            let days = days_since_previous(&group);
            let security_releases: Vec<V1Release> = group
                .iter()
                .zip(days.iter())
                .map(|(r, d)| to_v1_release(r, *d))
                .collect();
            let latest = security_releases.first().cloned().expect("group is never empty");
            V1OsVersionBlock {
                os_version: label,
                latest,
                security_releases,
            }
        })
        .collect();

    let mut doc = V1FeedDocument {
        update_hash: String::new(),
        os_versions,
        xprotect_payloads: None,
        xprotect_plist_config_data: None,
        models: None,
        installation_apps: None,
    };
    doc.update_hash = canonical_hash(&doc);
    doc
}

/// Assemble the v2 (enhanced) feed document for `platform` from its retained releases.
pub fn assemble_v2(platform: Platform, releases: Vec<ReleaseRecord>) -> V2FeedDocument {
    let blocks = group_by_os_version(platform, releases);
    let mut stats_blocks = Vec::with_capacity(blocks.len());
    let mut os_versions = Vec::with_capacity(blocks.len());

    for (label, group) in blocks {
        let stats = statistics(&group);
        let days = days_since_previous(&group);
        let security_releases: Vec<V2Release> = group
            .iter()
            .zip(days.iter())
            .map(|(r, d)| to_v2_release(r, *d))
            .collect();
        let latest = security_releases.first().cloned().expect("group is never empty");
        os_versions.push(V2OsVersionBlock {
            os_version: label.clone(),
            latest,
            security_releases,
            statistics: stats.clone(),
        });
        stats_blocks.push((label, group, stats));
    }

    let global_insights = global_insights(&stats_blocks);

    let mut doc = V2FeedDocument {
        schema_version: "2.0".to_string(),
        generated_at: String::new(),
        update_hash: String::new(),
        os_versions,
        global_insights,
        xprotect_payloads: None,
        xprotect_plist_config_data: None,
        models: None,
        installation_apps: None,
    };
    doc.update_hash = canonical_hash(&doc);
    doc.generated_at = chrono::Utc::now().to_rfc3339();
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use sofa_schema::{CveDetail, CveId, ExploitationInfo, PackagingVersion, ReleaseType};

    fn release(version: &str, build: &str, days_ago: i64, title: &str) -> ReleaseRecord {
        ReleaseRecord {
            platform: Platform::MacOs,
            version: PackagingVersion::new(version),
            build: build.to_string(),
            title: title.to_string(),
            release_date: chrono::Utc::now() - chrono::Duration::days(days_ago),
            url: "https://support.apple.com/en-us/100000".to_string(),
            cves: Vec::new(),
            cve_details: BTreeMap::new(),
            supported_devices: Vec::new(),
            all_builds: vec![build.to_string()],
            expiration_date: None,
            release_type: ReleaseType::Os,
            days_since_previous: None,
            is_pinned: false,
        }
    }

    #[test]
    fn groups_by_macos_marketing_name_and_major() {
        let r = release("15.3", "24D60", 0, "macOS Sequoia 15.3");
        assert_eq!(os_version_label(Platform::MacOs, &r), "Sequoia 15");
    }

    #[test]
    fn non_macos_label_is_bare_major_version() {
        let r = release("18.2", "22D63", 0, "iOS 18.2");
        assert_eq!(os_version_label(Platform::Ios, &r), "18");
    }

    #[test]
    fn latest_is_first_of_security_releases_and_update_hash_is_stable() {
        let releases = vec![
            release("15.3", "24D60", 0, "macOS Sequoia 15.3"),
            release("15.2", "24C101", 20, "macOS Sequoia 15.2"),
        ];
        let doc_a = assemble_v1(Platform::MacOs, releases.clone());
        let doc_b = assemble_v1(Platform::MacOs, releases);
        assert_eq!(doc_a.update_hash, doc_b.update_hash);
        assert_eq!(doc_a.os_versions[0].latest.product_version, doc_a.os_versions[0].security_releases[0].product_version);
        assert_eq!(doc_a.os_versions[0].security_releases[0].product_version, "15.3");
        assert_eq!(doc_a.os_versions[0].security_releases[0].days_since_previous_release, 20);
        assert_eq!(doc_a.os_versions[0].security_releases[1].days_since_previous_release, 0);
    }

    #[test]
    fn device_layering_inherits_from_nearest_newer_release() {
        let mut newer = release("15.3", "24D60", 0, "macOS Sequoia 15.3");
        newer.supported_devices = vec!["Mac16,1".to_string()];
        let older = release("15.2", "24C101", 20, "macOS Sequoia 15.2");
        let doc = assemble_v1(Platform::MacOs, vec![newer, older]);
        let block = &doc.os_versions[0];
        assert_eq!(block.security_releases[1].supported_devices, vec!["Mac16,1"]);
    }

    #[test]
    fn v2_component_breakdown_and_metrics_reflect_cve_details() {
        let mut r = release("15.3", "24D60", 0, "macOS Sequoia 15.3");
        let cve = CveId::from("CVE-2025-1000");
        r.cves.push(cve.clone());
        let mut exploitation = ExploitationInfo::none(cve.clone());
        exploitation.is_exploited = true;
        exploitation.sources.push(sofa_schema::ExploitationSource::AppleDirect);
        r.cve_details.insert(
            cve.as_str().to_string(),
            CveDetail {
                exploitation,
                component: ComponentCategory::WebKit,
                component_raw: "WebKit".to_string(),
                impact: Some("Processing malicious web content may lead to arbitrary code execution".to_string()),
                description: None,
            },
        );

        let doc = assemble_v2(Platform::MacOs, vec![r]);
        let release = &doc.os_versions[0].security_releases[0];
        assert_eq!(release.component_breakdown.get("WebKit"), Some(&1));
        assert_eq!(release.cve_metrics.total_cves, 1);
        assert_eq!(release.cve_metrics.exploited_cves, 1);
        assert_eq!(doc.os_versions[0].statistics.total_kevs, 1);
    }
}
