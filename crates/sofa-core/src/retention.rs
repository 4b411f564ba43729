//! Retention & Pinning (§4.7): trims the full history of [`ReleaseRecord`]s kept
//! per platform down to the window a [`RetentionPolicy`] allows, with
//! [`PinnedVersions`] surviving outside that window when explicitly pinned.
//!
//! Pins are applied first (marking `ReleaseRecord::is_pinned`), then the
//! retention filter runs; a pinned release is kept regardless of the filter
//! unless `allow_pins_outside_window` is false, in which case a pin only
//! protects a release that the filter would have kept anyway.

use sofa_schema::{Platform, PinnedVersions, ReleaseRecord, RetentionPolicy};
use std::collections::BTreeSet;

/// Mark every release pinned for `platform` via `pins`, mutating `is_pinned` in place.
pub fn apply_pins(releases: &mut [ReleaseRecord], platform: Platform, pins: &PinnedVersions) {
    for release in releases.iter_mut() {
        release.is_pinned = pins.is_pinned(platform, release.version.as_str(), &release.build);
    }
}

/// Parses the leading dot-separated component of a version string as its major number.
pub(crate) fn major_version_of(version: &str) -> u32 {
    version.split('.').next().and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn major_version(release: &ReleaseRecord) -> u32 {
    major_version_of(release.version.as_str())
}

/// Apply a [`RetentionPolicy`] to `releases`, keeping pinned releases regardless
/// (subject to `allow_pins_outside_window`). Releases are assumed to already
/// carry `is_pinned` set via [`apply_pins`].
pub fn apply_retention(
    releases: Vec<ReleaseRecord>,
    policy: &RetentionPolicy,
    allow_pins_outside_window: bool,
) -> Vec<ReleaseRecord> {
    let kept_majors: Option<BTreeSet<u32>> = match policy {
        RetentionPolicy::All => None,
        RetentionPolicy::LastNMajor { last_n } => {
            let mut majors: BTreeSet<u32> = releases.iter().map(major_version).collect();
            while majors.len() > *last_n as usize {
                let Some(&smallest) = majors.iter().next() else {
                    break;
                };
                majors.remove(&smallest);
            }
            Some(majors)
        }
        RetentionPolicy::Whitelist { majors } => Some(majors.iter().copied().collect()),
    };

    let Some(kept_majors) = kept_majors else {
        return releases;
    };

    releases
        .into_iter()
        .filter(|r| {
            if kept_majors.contains(&major_version(r)) {
                return true;
            }
            r.is_pinned && allow_pins_outside_window
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sofa_schema::{CveId, PackagingVersion, ReleaseType};
    use std::collections::BTreeMap;

    fn release(version: &str, build: &str) -> ReleaseRecord {
        ReleaseRecord {
            platform: Platform::MacOs,
            version: PackagingVersion::new(version),
            build: build.to_string(),
            title: format!("macOS {version}"),
            release_date: chrono::Utc::now(),
            url: "https://support.apple.com/en-us/100000".to_string(),
            cves: Vec::<CveId>::new(),
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
    fn major_version_of_parses_the_leading_component() {
        assert_eq!(major_version_of("15.3.1"), 15);
        assert_eq!(major_version_of("8"), 8);
        assert_eq!(major_version_of("not-a-version"), 0);
    }

    #[test]
    fn last_n_major_keeps_only_the_newest_majors() {
        let releases = vec![release("13.0", "A"), release("14.0", "B"), release("15.0", "C")];
        let kept = apply_retention(releases, &RetentionPolicy::LastNMajor { last_n: 2 }, true);
        let versions: Vec<_> = kept.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["14.0", "15.0"]);
    }

    #[test]
    fn whitelist_keeps_only_listed_majors() {
        let releases = vec![release("13.0", "A"), release("14.0", "B"), release("15.0", "C")];
        let kept = apply_retention(releases, &RetentionPolicy::Whitelist { majors: vec![13, 15] }, true);
        let versions: Vec<_> = kept.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["13.0", "15.0"]);
    }

    #[test]
    fn pinned_release_survives_outside_the_window() {
        let mut releases = vec![release("12.0", "OLD"), release("14.0", "B"), release("15.0", "C")];
        let mut pins = PinnedVersions::default();
        pins.pins.insert("macos".to_string(), vec!["12.0".to_string()]);
        apply_pins(&mut releases, Platform::MacOs, &pins);

        let kept = apply_retention(releases, &RetentionPolicy::LastNMajor { last_n: 2 }, true);
        let versions: Vec<_> = kept.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["12.0", "14.0", "15.0"]);
    }

    #[test]
    fn pin_does_not_escape_window_when_disallowed() {
        let mut releases = vec![release("12.0", "OLD"), release("14.0", "B"), release("15.0", "C")];
        let mut pins = PinnedVersions::default();
        pins.pins.insert("macos".to_string(), vec!["12.0".to_string()]);
        apply_pins(&mut releases, Platform::MacOs, &pins);

        let kept = apply_retention(releases, &RetentionPolicy::LastNMajor { last_n: 2 }, false);
        let versions: Vec<_> = kept.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["14.0", "15.0"]);
    }

    #[test]
    fn all_policy_keeps_everything() {
        let releases = vec![release("10.0", "A"), release("15.0", "B")];
        let kept = apply_retention(releases, &RetentionPolicy::All, true);
        assert_eq!(kept.len(), 2);
    }
}
