//! KEV Detector & Enricher (§4.4): turns Apple's in-page "Impact:" prose plus
//! the CISA KEV catalog into [`ExploitationInfo`] per CVE, including the
//! cross-platform warning case (exploited elsewhere, not confirmed here).
//!
//! The ordered pattern table below is checked top to bottom against the
//! surrounding text for each CVE; later patterns are allowed to run even
//! after an earlier one matched; the comments the real Apple HT pages use
//! for each bucket don't overlap, so this is a formality more than a
//! necessity, but it keeps the behavior close to its Python predecessor.

use regex::Regex;
use sofa_schema::{CveId, ExploitationConfidence, ExploitationInfo, ExploitationSource, Platform};
use std::collections::HashMap;
use std::sync::LazyLock;

struct PatternRule {
    regex: &'static str,
    source: ExploitationSource,
    confidence: ExploitationConfidence,
    targeted_attack: bool,
    physical_attack: bool,
    notes: Option<&'static str>,
    extract_version: bool,
}

const RULE_SPECS: &[PatternRule] = &[
    PatternRule {
        regex: r"(?is)Apple is aware of a report that this issue may have been exploited",
        source: ExploitationSource::AppleDirect,
        confidence: ExploitationConfidence::Confirmed,
        targeted_attack: false,
        physical_attack: false,
        notes: None,
        extract_version: false,
    },
    PatternRule {
        regex: r"(?is)Apple is aware of a report that this issue may have been actively exploited",
        source: ExploitationSource::AppleDirect,
        confidence: ExploitationConfidence::Confirmed,
        targeted_attack: false,
        physical_attack: false,
        notes: None,
        extract_version: false,
    },
    PatternRule {
        regex: r"(?is)exploited in an extremely sophisticated attack against specific targeted individuals",
        source: ExploitationSource::AppleTargeted,
        confidence: ExploitationConfidence::Confirmed,
        targeted_attack: true,
        physical_attack: false,
        notes: None,
        extract_version: false,
    },
    PatternRule {
        regex: r"(?is)actively exploited against versions of (iOS|iPadOS|macOS|watchOS|tvOS|visionOS) (?:released )?before (?:iOS |iPadOS |macOS |watchOS |tvOS |visionOS )?([\d.]+)",
        source: ExploitationSource::AppleVersionSpecific,
        confidence: ExploitationConfidence::Confirmed,
        targeted_attack: false,
        physical_attack: false,
        notes: None,
        extract_version: true,
    },
    PatternRule {
        regex: r"(?is)A physical attack may.*Apple is aware of a report that this issue may have been exploited",
        source: ExploitationSource::AppleDirect,
        confidence: ExploitationConfidence::Confirmed,
        targeted_attack: false,
        physical_attack: true,
        notes: None,
        extract_version: false,
    },
    PatternRule {
        regex: r"(?is)This is a supplementary fix for an attack that was blocked",
        source: ExploitationSource::AppleDirect,
        confidence: ExploitationConfidence::High,
        targeted_attack: false,
        physical_attack: false,
        notes: Some("Supplementary fix for previously blocked attack"),
        extract_version: false,
    },
];

struct CompiledRule {
    regex: Regex,
    spec: &'static PatternRule,
}

static RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    RULE_SPECS
        .iter()
        .map(|spec| CompiledRule {
            regex: Regex::new(spec.regex).expect("static pattern"),
            spec,
        })
        .collect()
});

/// Scan `text` for Apple's own exploitation language for `cve_id` on `platform`.
/// Returns `None` when nothing matched (callers should not record a non-exploited
/// entry just because no pattern fired -- that's the caller's default, not this fn's).
pub fn detect_apple_text(cve_id: &CveId, text: &str, platform: Platform) -> Option<ExploitationInfo> {
    let mut info = ExploitationInfo::none(cve_id.clone());
    info.affected_platforms.push(platform);

    let mut matched = false;
    for rule in RULES.iter() {
        let Some(captures) = rule.regex.captures(text) else {
            continue;
        };
        matched = true;
        info.is_exploited = true;
        info.confidence = rule.spec.confidence;
        if !info.sources.contains(&rule.spec.source) {
            info.sources.push(rule.spec.source);
        }
        info.is_targeted_attack = info.is_targeted_attack || rule.spec.targeted_attack;
        info.is_physical_attack = info.is_physical_attack || rule.spec.physical_attack;
        if let Some(notes) = rule.spec.notes {
            info.notes = Some(notes.to_string());
        }

        if rule.spec.extract_version {
            if let (Some(os), Some(version)) = (captures.get(1), captures.get(2)) {
                info.targeted_versions = Some(format!("{} {}", os.as_str(), version.as_str()));
                if let Some(extra_platform) = Platform::detect(os.as_str()) {
                    if !info.affected_platforms.contains(&extra_platform) {
                        info.affected_platforms.push(extra_platform);
                    }
                }
            }
        }
    }

    matched.then_some(info)
}

/// Stateful enricher tracking exploitation evidence seen so far across platforms,
/// so a later call for the same CVE on a different platform can emit a
/// cross-platform warning (§4.4, cross-platform rule: never qualifies alone).
#[derive(Debug, Default)]
pub struct KevDetector {
    apple_exploited: HashMap<CveId, ExploitationInfo>,
}

impl KevDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine Apple in-page text, the CISA KEV catalog, and prior cross-platform
    /// evidence into one [`ExploitationInfo`] for `cve_id` on `platform`.
    pub fn get_exploitation_status(
        &mut self,
        cve_id: &CveId,
        apple_text: Option<&str>,
        platform: Platform,
        kev_contains: bool,
    ) -> ExploitationInfo {
        let mut info = apple_text
            .and_then(|text| detect_apple_text(cve_id, text, platform))
            .unwrap_or_else(|| {
                let mut base = ExploitationInfo::none(cve_id.clone());
                base.affected_platforms.push(platform);
                base
            });

        if info.is_exploited {
            self.apple_exploited.insert(cve_id.clone(), info.clone());
        }

        if kev_contains {
            info.is_exploited = true;
            if !info.sources.contains(&ExploitationSource::CisaKev) {
                info.sources.push(ExploitationSource::CisaKev);
            }
            if info.confidence != ExploitationConfidence::Confirmed {
                info.confidence = ExploitationConfidence::High;
            }
        }

        if !info.is_exploited {
            if let Some(cross) = self.check_cross_platform(cve_id, platform) {
                return cross;
            }
        }

        info
    }

    fn check_cross_platform(&self, cve_id: &CveId, platform: Platform) -> Option<ExploitationInfo> {
        let existing = self.apple_exploited.get(cve_id)?;
        if existing.affected_platforms.contains(&platform) {
            return None;
        }
        let mut info = ExploitationInfo::none(cve_id.clone());
        info.confidence = ExploitationConfidence::Medium;
        info.sources.push(ExploitationSource::CrossPlatform);
        info.affected_platforms.push(platform);
        let seen: Vec<_> = existing.affected_platforms.iter().map(Platform::label).collect();
        info.notes = Some(format!("Known exploited on: {}", seen.join(", ")));
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_exploitation_phrase_is_detected() {
        let cve = CveId::from("CVE-2025-1001");
        let text = "Impact: Apple is aware of a report that this issue may have been exploited.";
        let info = detect_apple_text(&cve, text, Platform::Ios).unwrap();
        assert!(info.is_exploited);
        assert_eq!(info.confidence, ExploitationConfidence::Confirmed);
        assert_eq!(info.sources, vec![ExploitationSource::AppleDirect]);
    }

    #[test]
    fn version_specific_pattern_extracts_os_and_version() {
        let cve = CveId::from("CVE-2024-44308");
        let text = "actively exploited against versions of iOS released before iOS 17.2";
        let info = detect_apple_text(&cve, text, Platform::Ios).unwrap();
        assert_eq!(info.targeted_versions.as_deref(), Some("iOS 17.2"));
        assert_eq!(info.sources, vec![ExploitationSource::AppleVersionSpecific]);
    }

    #[test]
    fn no_match_returns_none() {
        let cve = CveId::from("CVE-2025-1");
        assert!(detect_apple_text(&cve, "A routine memory corruption issue was addressed.", Platform::MacOs).is_none());
    }

    #[test]
    fn cross_platform_alone_never_sets_is_exploited() {
        let mut detector = KevDetector::new();
        let cve = CveId::from("CVE-2024-44308");
        let ios_info = detector.get_exploitation_status(
            &cve,
            Some("Apple is aware of a report that this issue may have been actively exploited"),
            Platform::Ios,
            false,
        );
        assert!(ios_info.is_exploited);

        let macos_info = detector.get_exploitation_status(&cve, None, Platform::MacOs, false);
        assert!(!macos_info.is_exploited, "cross-platform evidence alone must not mark exploited");
        assert_eq!(macos_info.sources, vec![ExploitationSource::CrossPlatform]);
        assert!(!macos_info.qualifies_for_exploited_list());
    }

    #[test]
    fn cisa_kev_upgrades_confidence_and_marks_exploited() {
        let mut detector = KevDetector::new();
        let cve = CveId::from("CVE-2025-5");
        let info = detector.get_exploitation_status(&cve, None, Platform::MacOs, true);
        assert!(info.is_exploited);
        assert_eq!(info.confidence, ExploitationConfidence::High);
        assert!(info.sources.contains(&ExploitationSource::CisaKev));
        assert!(info.qualifies_for_exploited_list());
    }
}
