use std::time::Duration;
use thiserror::Error;

/// Errors produced by the generation boundary, configuration, and shell.
///
/// The question bank never surfaces these to its callers: generation
/// failures are logged and downgraded to an empty batch there.
#[derive(Error, Debug)]
pub enum ExamError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code. The `retry_after` field
    /// is populated from the `Retry-After` response header when present.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 401, 429, 529).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The provider answered but the payload had no usable text.
    #[error("provider '{provider}' returned an empty completion")]
    EmptyCompletion { provider: &'static str },

    /// Invalid configuration detected at load time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration source could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),

    /// Terminal or file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ExamError {
    fn from(err: anyhow::Error) -> Self {
        ExamError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExamError>;
