//! Maps free-text Apple component names to the fixed [`ComponentCategory`]
//! taxonomy (§4.6). Three tiers, checked in order: exact keyword membership,
//! ordered regex pattern scan, then a handful of suffix/prefix heuristics for
//! drivers, applications, and frameworks. Anything that falls through all
//! three lands in `ComponentCategory::System`.

use regex::Regex;
use sofa_schema::ComponentCategory;
use std::sync::LazyLock;

struct CategoryRule {
    category: ComponentCategory,
    keywords: &'static [&'static str],
    patterns: &'static [&'static str],
}

const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: ComponentCategory::WebKit,
        keywords: &["webkit", "javascript", "webrtc", "web content", "web inspector"],
        patterns: &[r"webkit", r"javascriptcore", r"web\s*content", r"web\s*inspector", r"safari\s*pdf"],
    },
    CategoryRule {
        category: ComponentCategory::Kernel,
        keywords: &["kernel", "xnu", "mach", "bsd kernel"],
        patterns: &[r"kernel", r"xnu", r"mach", r"bsd"],
    },
    CategoryRule {
        category: ComponentCategory::Networking,
        keywords: &["network", "cfnetwork", "curl", "wifi", "bluetooth", "bonjour", "airplay", "airdrop"],
        patterns: &[r"network", r"cfnetwork", r"curl", r"wi-?fi", r"bluetooth", r"bonjour"],
    },
    CategoryRule {
        category: ComponentCategory::Security,
        keywords: &[
            "security", "sandbox", "gatekeeper", "codesigning", "keychain",
            "applemobilefileintegrity", "amfi",
        ],
        patterns: &[r"security", r"sandbox", r"gatekeeper", r"codesign", r"keychain", r"filevault"],
    },
    CategoryRule {
        category: ComponentCategory::Media,
        keywords: &["coremedia", "coreaudio", "avfoundation", "imageio", "coreimage", "photos", "camera"],
        patterns: &[r"core\s*media", r"audio", r"video", r"av\s*foundation", r"image\s*io", r"core\s*image"],
    },
    CategoryRule {
        category: ComponentCategory::Graphics,
        keywords: &["coregraphics", "metal", "gpu", "opengl", "display", "windowserver"],
        patterns: &[r"graphics", r"metal", r"core\s*graphics", r"opengl", r"gpu", r"display"],
    },
    CategoryRule {
        category: ComponentCategory::SystemServices,
        keywords: &["launchd", "systemconfiguration", "directoryservice", "spotlight", "timemachine", "coreservices"],
        patterns: &[r"launchd", r"systemconfig", r"directory\s*service", r"spotlight", r"time\s*machine"],
    },
    CategoryRule {
        category: ComponentCategory::FileSystem,
        keywords: &["filesystem", "apfs", "hfs", "diskarbitration", "diskimages", "archive utility", "sharedfilelist"],
        patterns: &[r"file\s*system", r"apfs", r"hfs", r"disk", r"storage", r"archive"],
    },
    CategoryRule {
        category: ComponentCategory::Drivers,
        keywords: &["driver", "kext", "iokit", "usb", "thunderbolt", "intel", "amd", "broadcom"],
        patterns: &[r"driver", r"kext", r"iokit", r"usb", r"thunderbolt", r"pci"],
    },
    CategoryRule {
        category: ComponentCategory::Applications,
        keywords: &["mail", "messages", "facetime", "safari", "finder", "notes", "calendar", "reminders", "shortcuts"],
        patterns: &[r"mail", r"messages", r"facetime", r"safari(?!\s*pdf)", r"finder", r"notes", r"calendar"],
    },
    CategoryRule {
        category: ComponentCategory::Accessibility,
        keywords: &["accessibility", "voiceover", "assistive", "speech", "siri"],
        patterns: &[r"accessibility", r"voiceover", r"assistive", r"speech"],
    },
    CategoryRule {
        category: ComponentCategory::Virtualization,
        keywords: &["virtualization", "hypervisor", "rosetta", "bootcamp"],
        patterns: &[r"virtualization", r"hypervisor", r"rosetta", r"boot\s*camp"],
    },
    CategoryRule {
        category: ComponentCategory::PackageManagement,
        keywords: &["installer", "packagekit", "softwareupdate", "appstore"],
        patterns: &[r"installer", r"package", r"software\s*update", r"app\s*store"],
    },
    CategoryRule {
        category: ComponentCategory::DeveloperTools,
        keywords: &["xcode", "instruments", "dtrace", "lldb", "swift", "modelio", "model i/o"],
        patterns: &[r"xcode", r"instruments", r"dtrace", r"lldb", r"swift"],
    },
    CategoryRule {
        category: ComponentCategory::Privacy,
        keywords: &["privacy", "tcc", "transparency", "location", "contacts", "calendar access"],
        patterns: &[r"privacy", r"tcc", r"transparency", r"location\s*services", r"contacts"],
    },
];

struct CompiledRule {
    category: ComponentCategory,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
}

static COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| CompiledRule {
            category: rule.category,
            keywords: rule.keywords,
            patterns: rule
                .patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern"))
                .collect(),
        })
        .collect()
});

const DRIVER_SUFFIXES: &[&str] = &["driver", "kext", ".kext", "controller"];
const DRIVER_VENDOR_PREFIXES: &[&str] = &["intel", "amd", "nvidia", "broadcom", "qualcomm"];
const APP_SUFFIXES: &[&str] = &[".app", "app", "application"];
const FRAMEWORK_PATTERNS: &[&str] = &["framework", ".framework", "kit", "core", "foundation"];

/// Normalize a raw component string to its [`ComponentCategory`].
pub fn normalize(component: &str) -> ComponentCategory {
    let trimmed = component.trim();
    if trimmed.is_empty() {
        return ComponentCategory::System;
    }
    let lower = trimmed.to_lowercase();

    for rule in COMPILED.iter() {
        if rule.keywords.contains(&lower.as_str()) {
            return rule.category;
        }
    }

    for rule in COMPILED.iter() {
        if rule.patterns.iter().any(|p| p.is_match(&lower)) {
            return rule.category;
        }
    }

    if is_driver_component(&lower) {
        ComponentCategory::Drivers
    } else if is_app_component(&lower) {
        ComponentCategory::Applications
    } else if is_framework_component(&lower) {
        ComponentCategory::SystemServices
    } else {
        ComponentCategory::System
    }
}

fn is_driver_component(component: &str) -> bool {
    DRIVER_SUFFIXES.iter().any(|s| component.ends_with(s))
        || DRIVER_VENDOR_PREFIXES.iter().any(|p| component.starts_with(p))
}

fn is_app_component(component: &str) -> bool {
    APP_SUFFIXES.iter().any(|s| component.ends_with(s))
}

fn is_framework_component(component: &str) -> bool {
    FRAMEWORK_PATTERNS.iter().any(|p| component.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_wins_before_pattern_scan() {
        assert_eq!(normalize("WebKit"), ComponentCategory::WebKit);
        assert_eq!(normalize("JavaScriptCore"), ComponentCategory::WebKit);
    }

    #[test]
    fn safari_pdf_is_webkit_not_applications() {
        assert_eq!(normalize("Safari PDF"), ComponentCategory::WebKit);
        assert_eq!(normalize("Safari"), ComponentCategory::Applications);
    }

    #[test]
    fn graphics_pattern_outranks_driver_heuristic() {
        // Both contain a Graphics-category pattern word ("graphics"/"display"), which is
        // checked in tier 2 before the driver suffix/prefix heuristic ever runs in tier 3.
        assert_eq!(normalize("Intel Graphics Driver"), ComponentCategory::Graphics);
        assert_eq!(normalize("AMD Display Driver"), ComponentCategory::Graphics);
    }

    #[test]
    fn driver_heuristic_fires_when_no_pattern_matches() {
        assert_eq!(normalize("Broadcom Wireless Controller"), ComponentCategory::Drivers);
        assert_eq!(normalize("Qualcomm Modem"), ComponentCategory::Drivers);
    }

    #[test]
    fn unmatched_component_falls_back_to_system() {
        assert_eq!(normalize("Unknown Component XYZ"), ComponentCategory::System);
        assert_eq!(normalize(""), ComponentCategory::System);
    }

    #[test]
    fn model_io_is_a_developer_tools_keyword() {
        assert_eq!(normalize("Model I/O"), ComponentCategory::DeveloperTools);
    }

    #[test]
    fn framework_heuristic_catches_unmatched_kit_suffix() {
        assert_eq!(normalize("libxpc"), ComponentCategory::System);
    }
}
