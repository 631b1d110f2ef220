//! RigVoice Error Types
//!
//! Centralized error handling for the voice-to-rig pipeline.

use thiserror::Error;

/// Central error type for RigVoice
#[derive(Error, Debug)]
pub enum RigError {
    /// Non-2xx or transport failure from a model provider
    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// Connect or stream-inactivity timeout, distinct from transport errors
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Model returned an empty (or whitespace-only) response
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Unparseable structured output where JSON was required
    #[error("Malformed model output: {0}")]
    Format(String),

    /// Generated markup failed well-formedness validation
    #[error("Markup validation error: {0}")]
    Validation(String),

    /// Generation succeeded but the output was unusable
    #[error("Markup generation failed: {0}")]
    GenerationFailed(String),

    /// Classifier output could not be parsed as an intent object
    #[error("Unparseable classification (cleaned: {cleaned:?})")]
    ClassificationFormat { raw: String, cleaned: String },

    /// Cluster operation attempted without a live session
    #[error("Not connected to the display cluster")]
    NotConnected,

    /// Remote command execution failure
    #[error("Cluster command error: {0}")]
    Command(String),

    /// File transfer failure
    #[error("Upload error: {0}")]
    Upload(String),

    /// Missing or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RigVoice operations
pub type RigResult<T> = Result<T, RigError>;
