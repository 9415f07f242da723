//! Error types for EventFeed.
//!
//! Library crates use [`EventFeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all EventFeed operations.
#[derive(Debug, thiserror::Error)]
pub enum EventFeedError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a period page.
    #[error("network error: {0}")]
    Network(String),

    /// HTML, URL, or date parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (out-of-range period, bad selector, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Feed document serialization error.
    #[error("feed error: {0}")]
    Feed(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EventFeedError>;

impl EventFeedError {
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
        let err = EventFeedError::config("base_url is empty");
        assert_eq!(err.to_string(), "config error: base_url is empty");

        let err = EventFeedError::validation("month 13 out of range");
        assert!(err.to_string().contains("month 13"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = EventFeedError::io(
            "/tmp/missing.html",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.html"));
    }
}
