//! GDMF Merger (§4.5): folds Apple's Global Device Management Feed asset
//! manifest into a release's device list and build manifest.
//!
//! GDMF nests watchOS and tvOS assets inside the "iOS" key rather than giving
//! them their own top-level entry, distinguished only by a `SupportedDevices`
//! prefix ("Watch…" / "AppleTV…"). iOS and iPadOS share the same "iOS" bucket
//! too, undistinguished from each other, so the remaining (non-watch,
//! non-tvOS) entries serve both.

use crate::fetch::GdmfSnapshot;
use sofa_schema::Platform;

/// The GDMF top-level asset-set key a platform's builds are nested under.
fn gdmf_key(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::MacOs => Some("macOS"),
        Platform::Ios | Platform::IPadOs | Platform::WatchOs | Platform::TvOs => Some("iOS"),
        Platform::VisionOs => Some("visionOS"),
        Platform::Safari => None,
    }
}

fn device_prefix(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::WatchOs => Some("Watch"),
        Platform::TvOs => Some("AppleTV"),
        _ => None,
    }
}

/// Normalize a device name for consistency (mirrors the reference project's
/// `normalize_device_name`): collapse internal whitespace, then standardize a
/// handful of Apple's own inconsistent naming variants.
fn normalize_device_name(device: &str) -> String {
    let collapsed = device.split_whitespace().collect::<Vec<_>>().join(" ");
    const REPLACEMENTS: &[(&str, &str)] = &[
        ("iPhone ", "iPhone"),
        ("iPad ", "iPad"),
        ("Mac ", "Mac"),
        ("Apple Watch", "Watch"),
        ("Apple TV", "AppleTV"),
        ("HomePod ", "HomePod"),
    ];
    let mut device = collapsed;
    for (old, new) in REPLACEMENTS {
        device = device.replace(old, new);
    }
    device
}

/// Merge multiple device lists, deduplicating while preserving first-seen order
/// (mirrors the reference project's `merge_device_lists`). Each device name is
/// normalized before dedup so equivalent spellings collapse to one entry.
pub fn merge_device_lists(lists: impl IntoIterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for device in list {
            let device = normalize_device_name(&device);
            if !device.is_empty() && seen.insert(device.clone()) {
                merged.push(device);
            }
        }
    }
    merged
}

/// Aggregate GDMF facts for one (platform, product_version).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GdmfMatch {
    pub supported_devices: Vec<String>,
    pub all_builds: Vec<String>,
    /// First of `all_builds` once sorted ascending -- the representative build (§4.5).
    pub representative_build: Option<String>,
    /// `ExpirationDate` carried from the first matching asset, verbatim.
    pub expiration_date: Option<String>,
}

/// Find every GDMF asset whose `ProductVersion` exactly equals `product_version`
/// for `platform`, and merge their device lists and build numbers.
pub fn find_gdmf_match(snapshot: &GdmfSnapshot, platform: Platform, product_version: &str) -> GdmfMatch {
    let Some(key) = gdmf_key(platform) else {
        return GdmfMatch::default();
    };
    let Some(assets) = snapshot.asset_sets.get(key) else {
        return GdmfMatch::default();
    };

    let wanted_prefix = device_prefix(platform);
    let mut device_lists = Vec::new();
    let mut builds = std::collections::BTreeSet::new();
    let mut expiration_date = None;

    for asset in assets {
        if asset.product_version != product_version {
            continue;
        }
        let is_nested_embedded = asset
            .supported_devices
            .iter()
            .any(|d| d.starts_with("Watch") || d.starts_with("AppleTV"));

        match wanted_prefix {
            // watchOS/tvOS: only assets whose devices carry our own prefix.
            Some(prefix) => {
                if !asset.supported_devices.iter().any(|d| d.starts_with(prefix)) {
                    continue;
                }
                device_lists.push(
                    asset
                        .supported_devices
                        .iter()
                        .filter(|d| d.starts_with(prefix))
                        .cloned()
                        .collect(),
                );
            }
            // iOS/iPadOS/macOS/visionOS: skip assets that are really nested
            // watchOS/tvOS entries borrowing the "iOS" key.
            None => {
                if is_nested_embedded {
                    continue;
                }
                device_lists.push(asset.supported_devices.clone());
            }
        }
        builds.insert(asset.build.clone());
        if expiration_date.is_none() {
            expiration_date = asset.expiration_date.clone();
        }
    }

    let all_builds: Vec<String> = builds.into_iter().collect();
    GdmfMatch {
        supported_devices: merge_device_lists(device_lists),
        representative_build: all_builds.first().cloned(),
        all_builds,
        expiration_date,
    }
}
