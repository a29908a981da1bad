//! Error types for the research assistant.
//!
//! Library crates use [`AssistantError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all research assistant operations.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to arXiv, the PDF store, or a keep-alive target.
    #[error("network error: {0}")]
    Network(String),

    /// Feed or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// PDF loading or text extraction error.
    #[error("document error: {0}")]
    Document(String),

    /// Language-model provider error (transport, HTTP status, or response shape).
    #[error("provider error: {0}")]
    Provider(String),

    /// Step journal / database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad event payload, unknown run, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AssistantError>;

impl AssistantError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AssistantError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = AssistantError::Provider("HTTP 429".into());
        assert_eq!(err.to_string(), "provider error: HTTP 429");

        let err = AssistantError::validation("unknown event name");
        assert!(err.to_string().contains("unknown event name"));
    }
}
