//! Shared data model for the SOFA security-release feed pipeline.
//!
//! This crate defines the canonical types used across all SOFA components: the
//! fetchers, the release extractor, the KEV/GDMF enrichers, and the feed
//! assembler. It has no I/O of its own; everything here is plain data plus the
//! small amount of logic (version/CVE ordering, hashing) that the invariants in
//! the design document require to live next to the types they govern.

/// On-disk metadata shape for HTTP Cache entries.
pub mod cache;
/// Emitted v1/v2 feed document shapes.
pub mod feed;
/// Typed wrappers for content hashes (SHA-256) and cache-key hashing (SHA-1).
pub mod hash;
/// Core domain types: platforms, release records, exploitation info, retention policy.
pub mod types;

pub use cache::{CachedResourceMeta, FailedUrl};
pub use hash::{Sha256Hex, sha1_hex};
pub use types::*;
