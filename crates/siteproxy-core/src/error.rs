//! Error types for siteproxy

use thiserror::Error;

/// Main error type for siteproxy
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The registry holds no sites to choose from
    #[error("No sites available")]
    NoSites,

    /// A site was requested by name but is not registered
    #[error("Site not found: {0}")]
    SiteNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for siteproxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

impl From<serde_yaml::Error> for ProxyError {
    fn from(err: serde_yaml::Error) -> Self {
        ProxyError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for ProxyError {
    fn from(err: toml::de::Error) -> Self {
        ProxyError::Config(err.to_string())
    }
}
