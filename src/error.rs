//! Error types for the Resonance Engine

use thiserror::Error;

/// Errors that can occur during inference or configuration loading.
///
/// Expected empty-input conditions (empty window, short history, unknown
/// state identifiers) are not errors; they resolve to documented defaults.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to parse event payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid event batch: {0}")]
    InvalidBatch(String),

    #[error("Malformed outcome record: {0}")]
    ReportError(String),
}
