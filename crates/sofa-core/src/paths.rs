use std::path::PathBuf;

/// Returns the data root directory, or `None` if it cannot be resolved.
///
/// `SOFA_CACHE_DIR` (despite the name) overrides the whole data root, matching
/// the reference project's own environment contract: the cache directory was the
/// one knob operators reached for, so it doubles as the root override here too.
pub fn try_data_root() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("SOFA_CACHE_DIR") {
        return Some(PathBuf::from(val));
    }
    dirs::data_local_dir().map(|d| d.join("sofa"))
}

/// Returns the canonical data root directory.
///
/// # Panics
///
/// Panics if `SOFA_CACHE_DIR` is unset and the platform data-local directory
/// cannot be resolved. Set `SOFA_CACHE_DIR` explicitly in that environment.
pub fn data_root() -> PathBuf {
    try_data_root().expect("Could not determine data directory. Set SOFA_CACHE_DIR to override.")
}

/// HTTP Cache root: `data/cache`
pub fn cache_dir() -> PathBuf {
    data_root().join("data").join("cache")
}

/// Cache metadata keyspace: `data/cache/urls`
pub fn cache_urls_dir() -> PathBuf {
    cache_dir().join("urls")
}

/// Cache raw-body keyspace: `data/cache/raw`
pub fn cache_raw_dir() -> PathBuf {
    cache_dir().join("raw")
}

/// Cache parsed-derivative keyspace: `data/cache/parsed`
pub fn cache_parsed_dir() -> PathBuf {
    cache_dir().join("parsed")
}

/// Sidecar of detail URLs that failed to fetch, for next-run recovery.
pub fn failed_detail_urls_path() -> PathBuf {
    cache_dir().join("failed_detail_urls.json")
}

/// Upstream snapshot resources: `data/resources`
pub fn resources_dir() -> PathBuf {
    data_root().join("data").join("resources")
}

/// Emitted feed tree root: `data/feeds`
pub fn feeds_dir() -> PathBuf {
    data_root().join("data").join("feeds")
}

/// v1 feed output directory.
pub fn feeds_v1_dir() -> PathBuf {
    feeds_dir().join("v1")
}

/// v2 feed output directory.
pub fn feeds_v2_dir() -> PathBuf {
    feeds_dir().join("v2")
}

/// Per-platform change-detection marker file.
pub fn timestamp_path() -> PathBuf {
    feeds_dir().join("timestamp.json")
}

/// Configuration directory: `config`
pub fn config_dir() -> PathBuf {
    data_root().join("config")
}

/// Path to the typed configuration file, unless overridden by `--config`.
pub fn config_path() -> PathBuf {
    config_dir().join("sofa.toml")
}

/// Path to the explicit version/build pin file.
pub fn pinned_versions_path() -> PathBuf {
    config_dir().join("pinned.json")
}

/// Path to the pinned Apple root certificate used by the GDMF client.
pub fn apple_root_pem_path() -> PathBuf {
    config_dir().join("AppleRoot.pem")
}

/// Ensure every directory the pipeline writes to exists.
pub fn ensure_layout() -> std::io::Result<()> {
    for dir in [
        cache_urls_dir(),
        cache_raw_dir(),
        cache_parsed_dir(),
        resources_dir(),
        feeds_v1_dir(),
        feeds_v2_dir(),
        config_dir(),
    ] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
