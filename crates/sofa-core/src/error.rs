//! Error taxonomy shared by every pipeline stage.

/// Errors raised by the HTTP Cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("network unavailable and no cached entry exists for {url}")]
    NetworkUnavailable { url: String },

    #[error("cache metadata for {key} was corrupt and has been discarded: {reason}")]
    CacheCorrupt { key: String, reason: String },

    #[error("failed to write cache entry for {key}: {source}")]
    CacheWriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while fetching or parsing a single source.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("failed to parse {url}: {reason}")]
    ParseError { url: String, reason: String },

    #[error("fetch stage failed: no security-release index page could be fetched or read from cache")]
    FetchStageFailed,

    #[error("{url} could not be reached and the cached copy is {age_hours}h old, past the {window_hours}h staleness window")]
    StaleCacheExpired {
        url: String,
        age_hours: i64,
        window_hours: u64,
    },
}

/// Errors raised while extracting/enriching releases (Process stage). Never I/O.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("release record failed validation: {reason}")]
    ValidationFailed { reason: String },
}

/// Errors raised while assembling or writing feeds (Emit stage).
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while loading or validating configuration. Always fatal at startup.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse pinned-versions file {path}: {source}")]
    PinsParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
