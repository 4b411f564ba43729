use crate::cache::{GetOptions, HttpCache};
use crate::config::XProtectConfig;
use crate::error::FetchError;
use regex::Regex;

/// Versions parsed out of Apple's merged software-update catalog for the
/// XProtect and XProtectRemediator packages. This fetcher is config-gated and
/// disabled by default (§4.2, §10.1) — the upstream project this pipeline is
/// modeled on never shipped it either, so this mirrors that unimplemented
/// posture rather than inventing a contract nothing downstream relies on yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XProtectSnapshot {
    pub xprotect_version: Option<String>,
    pub plist_config_version: Option<String>,
}

/// Fetches and best-effort parses the sucatalog XML for XProtect package versions.
#[derive(Debug, Default)]
pub struct XProtectClient;

impl XProtectClient {
    pub async fn fetch(
        cache: &HttpCache,
        config: &XProtectConfig,
    ) -> Result<XProtectSnapshot, FetchError> {
        if !config.enabled {
            return Ok(XProtectSnapshot::default());
        }

        let entry = cache.get(&config.sucatalog_url, GetOptions::default()).await?;
        let snapshot = parse_sucatalog(&entry.body);
        cache.put_parsed(&config.sucatalog_url, &snapshot)?;
        Ok(snapshot)
    }
}

impl serde::Serialize for XProtectSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("XProtectSnapshot", 2)?;
        s.serialize_field("xprotect_version", &self.xprotect_version)?;
        s.serialize_field("plist_config_version", &self.plist_config_version)?;
        s.end()
    }
}

impl<'de> serde::Deserialize<'de> for XProtectSnapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            xprotect_version: Option<String>,
            plist_config_version: Option<String>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(XProtectSnapshot {
            xprotect_version: raw.xprotect_version,
            plist_config_version: raw.plist_config_version,
        })
    }
}

/// Best-effort version extraction from raw sucatalog XML. Apple's catalog does
/// not expose these versions as plain attributes, so full fidelity would
/// require unpacking each referenced `.pkm`/`.dist` archive; since this source
/// is disabled by default, a regex scan over the known key names is a
/// deliberate simplification rather than a full catalog parser.
fn parse_sucatalog(xml: &str) -> XProtectSnapshot {
    let xprotect_re = Regex::new(r"XProtectPlistConfigData[^<]*?(\d+\.\d+(?:\.\d+)?)")
        .expect("static regex");
    let remediator_re =
        Regex::new(r"XProtectPayloads[^<]*?(\d+\.\d+(?:\.\d+)?)").expect("static regex");

    XProtectSnapshot {
        xprotect_version: remediator_re
            .captures(xml)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
        plist_config_version: xprotect_re
            .captures(xml)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        assert!(!XProtectConfig::default().enabled);
    }

    #[test]
    fn extracts_versions_from_known_key_names() {
        let xml = "<dict><key>XProtectPayloads</key><string>2166</string>\
                   <key>XProtectPlistConfigData</key><string>5273</string></dict>";
        let snapshot = parse_sucatalog(xml);
        assert_eq!(snapshot.xprotect_version.as_deref(), Some("2166"));
        assert_eq!(snapshot.plist_config_version.as_deref(), Some("5273"));
    }

    #[tokio::test]
    async fn fetch_short_circuits_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(
            dir.path().join("urls"),
            dir.path().join("raw"),
            dir.path().join("parsed"),
            &crate::config::HttpConfig::default(),
        );
        let config = XProtectConfig {
            enabled: false,
            ..XProtectConfig::default()
        };
        let snapshot = XProtectClient::fetch(&cache, &config).await.unwrap();
        assert_eq!(snapshot, XProtectSnapshot::default());
    }
}
