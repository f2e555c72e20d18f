//! Error types for the conversion pipeline with context and recovery information

use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting a modlist
///
/// Recoverable conditions of the pipeline itself (no search hits, no release, no file,
/// operator abandonment) are modelled as data in [`crate::core::Resolution`] and never
/// show up here.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// HTTP transport errors with the request URL
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Network timeout
    #[error("Request to '{url}' timed out (check network or increase the timeout)")]
    NetworkTimeout { url: String },

    /// Non-success status returned by the remote API
    #[error("Remote API returned {status} for '{url}'")]
    ApiStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// The remote API answered with a body we could not decode
    #[error("Failed to decode response from '{url}'")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The modlist document does not exist
    #[error("The file does not exist: {}", path.display())]
    InputMissing { path: PathBuf },

    /// File system I/O errors with file context
    #[error("File operation failed on '{}' while {operation}", path.display())]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Manifest (de)serialization errors
    #[error("Manifest JSON error")]
    Manifest(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },

    /// Reading operator input failed
    #[error("Prompt failed: {message}")]
    Prompt {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A manifest entry addressed by the operator does not exist or is not a placeholder
    #[error("Manifest entry {entry} is not a pending placeholder")]
    EntryNotFound { entry: usize },
}

/// Types of file operations for error context
#[derive(Debug, Clone, PartialEq)]
pub enum FileOperation {
    Read,
    Write,
    Hash,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Hash => write!(f, "hashing"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Check if error is transient and the request may be retried
    pub fn is_recoverable(&self) -> bool {
        match self {
            ConvertError::HttpRequest { source, .. } => {
                // Only transport-level failures, not client errors (4xx)
                source.status().is_none_or(|status| status.is_server_error())
            }
            ConvertError::NetworkTimeout { .. } => true,
            ConvertError::ApiStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ConvertError::HttpRequest { .. } => "http_request",
            ConvertError::NetworkTimeout { .. } => "network_timeout",
            ConvertError::ApiStatus { .. } => "api_status",
            ConvertError::Decode { .. } => "decode",
            ConvertError::InputMissing { .. } => "input_missing",
            ConvertError::FileSystem { .. } => "file_system",
            ConvertError::Manifest(_) => "manifest",
            ConvertError::InvalidUrl { .. } => "invalid_url",
            ConvertError::Configuration { .. } => "configuration",
            ConvertError::Prompt { .. } => "prompt",
            ConvertError::EntryNotFound { .. } => "entry_not_found",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ConvertError::NetworkTimeout { .. } => {
                Some("Check your internet connection or try increasing the timeout value")
            }
            ConvertError::ApiStatus { status: 429, .. } => {
                Some("The Modrinth rate limit was hit; lower --chunk-size or use --pacing quota")
            }
            ConvertError::InputMissing { .. } => {
                Some("Export the modlist from CurseForge and pass its path with --path")
            }
            ConvertError::Configuration { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Create a detailed error report for debugging
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));
        report.push_str(&format!("Recoverable: {}\n", self.is_recoverable()));

        if let Some(suggestion) = self.suggestion() {
            report.push_str(&format!("Suggestion: {}\n", suggestion));
        }

        if let Some(source) = self.source() {
            report.push_str(&format!("Root cause: {}\n", source));
        }

        report
    }

    pub(crate) fn file_system(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        ConvertError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(error: reqwest::Error) -> Self {
        let url = error.url().map(|u| u.to_string()).unwrap_or_else(|| "<unknown>".to_string());

        if error.is_timeout() {
            ConvertError::NetworkTimeout { url }
        } else {
            ConvertError::HttpRequest { url, source: error }
        }
    }
}
