//! Error types for the core module.

use thiserror::Error;

use crate::model::ResourceKind;
use cloudtrim_provider::ProviderError;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Collection failure scoped to one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFailure {
    pub kind: ResourceKind,
    pub message: String,
}

impl std::fmt::Display for KindFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} collection failed: {}", self.kind, self.message)
    }
}

fn join_failures(failures: &[KindFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during cost analysis.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{}", join_failures(.0))]
    Collection(Vec<KindFailure>),

    #[error("Telemetry unavailable for {resource_id}: {message}")]
    TelemetryUnavailable { resource_id: String, message: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Resource kinds whose collection failed, if this is a collection error.
    pub fn failed_kinds(&self) -> Vec<ResourceKind> {
        match self {
            CoreError::Collection(failures) => failures.iter().map(|f| f.kind).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
