use thiserror::Error;

/// Unified error type for the crawler
#[derive(Error, Debug)]
pub enum CrawlError {
    // Proxy errors
    #[error("no proxies available")]
    NoProxiesAvailable,

    #[error("proxy source fetch failed: {0}")]
    ProxySourceFailed(String),

    #[error("unsupported proxy source: {0}")]
    UnsupportedSource(String),

    // HTTP / transport errors
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected API error code {code}: {msg}")]
    PermanentApi { code: i64, msg: String },

    // Pool persistence errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Configuration errors
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;
