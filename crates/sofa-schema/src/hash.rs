use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A SHA-256 digest rendered as a lowercase hex string.
///
/// Used for `CachedResource::content_hash` and `FeedDocument::update_hash`; both are
/// computed over normalized text, never over the raw wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hex(String);

impl Sha256Hex {
    /// Hash arbitrary bytes.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    /// Hash a UTF-8 string directly, without re-encoding.
    pub fn compute_str(data: &str) -> Self {
        Self::compute(data.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sha256Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Hex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// SHA-1 of a URL, used only as a cache key -- never for content integrity.
pub fn sha1_hex(data: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_stable_and_distinct() {
        let a = Sha256Hex::compute_str("hello");
        let b = Sha256Hex::compute_str("hello");
        let c = Sha256Hex::compute_str("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn sha1_matches_known_vectors() {
        assert_eq!(sha1_hex(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            sha1_hex("https://support.apple.com/en-us/100100"),
            sha1_hex("https://support.apple.com/en-us/100100")
        );
        assert_ne!(
            sha1_hex("https://support.apple.com/en-us/100100"),
            sha1_hex("https://support.apple.com/en-ca/100100")
        );
    }
}
