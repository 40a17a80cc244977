//! Error types for kbrowse-client.
//!
//! Fallible library and CLI operations return [`KbrowseError`]. Errors that
//! happen *inside* a streaming session (transport failures, server-reported
//! errors, malformed frames) are delivered to the session callbacks instead;
//! see [`crate::session`].

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for kbrowse-client operations.
#[derive(Error, Debug)]
pub enum KbrowseError {
    /// HTTP transport failed.
    #[error("HTTP request failed: {context}")]
    Http {
        /// Context describing the request that failed.
        context: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// A server or request URL could not be built.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Reason why the URL is invalid.
        reason: String,
    },

    /// The server answered with its error sentinel.
    #[error("Server reported an error: {message}")]
    ServerError {
        /// Server-provided error message.
        message: String,
    },

    /// A shared link could not be decoded.
    #[error("Invalid shared link: {reason}")]
    InvalidLink {
        /// Reason why the link is invalid.
        reason: String,
    },

    /// Invalid argument.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Name of the invalid argument.
        name: String,
        /// Reason why the argument is invalid.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Human-readable error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable error message.
        message: String,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// I/O error.
    #[error("I/O error: {context}")]
    IoError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {context}")]
    SerializationError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying serde_json error.
        #[source]
        source: serde_json::Error,
    },

    /// Search was cancelled by the user.
    #[error("Search cancelled")]
    Interrupted,

    /// Timeout error.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        /// Duration in milliseconds before timeout.
        duration_ms: u64,
    },

    /// Unsupported operation or feature.
    #[error("Unsupported: {feature}")]
    Unsupported {
        /// Name of the unsupported feature.
        feature: String,
    },
}

impl KbrowseError {
    /// Create a new HTTP error with context.
    #[must_use]
    pub fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            context: context.into(),
            source,
        }
    }

    /// Create a new I/O error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            context: context.into(),
            source,
        }
    }

    /// Create a new invalid argument error.
    #[must_use]
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid link error.
    #[must_use]
    pub fn invalid_link(reason: impl Into<String>) -> Self {
        Self::InvalidLink {
            reason: reason.into(),
        }
    }

    /// Create a new unsupported error.
    #[must_use]
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } => exit_codes::EXIT_FILE_NOT_FOUND,
            Self::ConfigError { .. } | Self::InvalidConfig { .. } => exit_codes::EXIT_CONFIG_ERROR,
            Self::ServerError { .. } => exit_codes::EXIT_SEARCH_ERROR,
            Self::InvalidArgument { .. } | Self::InvalidUrl { .. } => exit_codes::EXIT_USAGE_ERROR,
            Self::InvalidLink { .. } => exit_codes::EXIT_DATA_ERROR,
            Self::Http { .. } | Self::Timeout { .. } => exit_codes::EXIT_UNAVAILABLE,
            Self::IoError { .. } => exit_codes::EXIT_IO_ERROR,
            Self::Interrupted => exit_codes::EXIT_INTERRUPTED,
            _ => exit_codes::EXIT_GENERAL_ERROR,
        }
    }

    /// Check if retrying the same request could succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for kbrowse-client operations.
pub type Result<T> = std::result::Result<T, KbrowseError>;

impl From<std::io::Error> for KbrowseError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            context: "I/O operation failed".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for KbrowseError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            context: "JSON operation failed".to_string(),
            source: err,
        }
    }
}

impl From<reqwest::Error> for KbrowseError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            context: "request failed".to_string(),
            source: err,
        }
    }
}

/// Exit codes for CLI operations.
pub mod exit_codes {
    /// Operation completed successfully.
    pub const EXIT_SUCCESS: i32 = 0;
    /// General/unspecified error.
    pub const EXIT_GENERAL_ERROR: i32 = 1;
    /// Specified file not found.
    pub const EXIT_FILE_NOT_FOUND: i32 = 3;
    /// Invalid configuration.
    pub const EXIT_CONFIG_ERROR: i32 = 5;
    /// The server reported a search error.
    pub const EXIT_SEARCH_ERROR: i32 = 7;
    /// Invalid command-line usage (BSD standard).
    pub const EXIT_USAGE_ERROR: i32 = 64;
    /// Input data format error (BSD standard).
    pub const EXIT_DATA_ERROR: i32 = 65;
    /// Service unavailable (BSD standard).
    pub const EXIT_UNAVAILABLE: i32 = 69;
    /// I/O error (BSD standard).
    pub const EXIT_IO_ERROR: i32 = 74;
    /// Terminated by Ctrl+C (128 + SIGINT).
    pub const EXIT_INTERRUPTED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let server = KbrowseError::ServerError {
            message: "topic not found".into(),
        };
        assert_eq!(server.exit_code(), 7);

        let arg = KbrowseError::invalid_argument("key", "required");
        assert_eq!(arg.exit_code(), 64);

        assert_eq!(KbrowseError::Interrupted.exit_code(), 130);
        assert_eq!(KbrowseError::invalid_link("bad").exit_code(), 65);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(KbrowseError::Timeout { duration_ms: 10 }.is_recoverable());
        assert!(!KbrowseError::Interrupted.is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = KbrowseError::invalid_argument("key", "a key is required");
        assert_eq!(err.to_string(), "Invalid argument 'key': a key is required");
    }
}
