use thiserror::Error;

/// Errors returned by the generation client and loop controller.
#[derive(Error, Debug)]
pub enum LoopError {
    /// The generation backend returned a non-success HTTP status.
    #[error("Generation backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response from the backend was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a local file for upload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for LoopError {
    fn from(err: anyhow::Error) -> Self {
        LoopError::Other(err.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LoopError>;
