// Typed errors with thiserror. Surface meaningful messages to JS.
// Cleanup failures never become a MediaError; they are logged and dropped.

use thiserror::Error;

/// Media orchestrator error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("Media engine is not loaded; call loadEngine() and wait for it to finish")]
    NotLoaded,

    #[error("Engine source {source_url} failed: {message}")]
    SourceUnavailable { source_url: String, message: String },

    #[error("Failed to load media engine from all {attempted} sources (last error: {last_error})")]
    LoadExhausted { attempted: usize, last_error: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} failed: engine exited with code {code}")]
    ExecFailed { operation: &'static str, code: i32 },

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Could not read {name} from engine: {message}")]
    ReadFailed { name: String, message: String },

    #[error("Malformed engine output: {0}")]
    MalformedOutput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MediaError {
    /// True for the not-ready error, as opposed to an operation-level failure.
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, MediaError::NotLoaded)
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::Serialization(err.to_string())
    }
}
