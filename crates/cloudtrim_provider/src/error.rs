//! Error types for provider API calls.

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to a provider API.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("{service} API error: {message}")]
    Api { service: String, message: String },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ProviderError {
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn api(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.into(),
            message: message.into(),
        }
    }
}
