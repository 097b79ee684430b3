//! Error types module
//!
//! All failures in the workspace are unified under [`AppError`]. Variants fall
//! into three families: input validation (reported immediately, operation
//! aborted, no partial output), external service failures (reported with the
//! upstream message, operation aborted) and not-found lookups (rendered as a
//! warning next to partial results). Nothing is retried automatically.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for degraded results such as missing provider info
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - defines how an error should be presented
/// to the person running the tool.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "COMPRESSION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether running the same action again may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the user
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Process exit code used by the CLI
    fn exit_code(&self) -> i32;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing required files for: {}", .missing.join(", "))]
    MissingAssets { missing: Vec<String> },

    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("{service} request timed out")]
    Timeout { service: String },

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("Invalid sheet: {0}")]
    InvalidSheet(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result alias used across the workspace
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for an upstream failure reported by a named collaborator
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// True for failures caused by what the user supplied
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_) | AppError::MissingField(_) | AppError::MissingAssets { .. }
        )
    }

    /// Display text followed by one "Caused by:" line per source, at most five
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, sensitive, log_level, exit_code).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, bool, LogLevel, i32) {
    match err {
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the supplied files and arguments"),
            false,
            LogLevel::Debug,
            2,
        ),
        AppError::MissingField(_) => (
            "MISSING_FIELD",
            false,
            Some("Fill in every required field"),
            false,
            LogLevel::Debug,
            2,
        ),
        AppError::MissingAssets { .. } => (
            "MISSING_ASSETS",
            false,
            Some("Upload one file per required role, e.g. portrait.jpg and box.jpg"),
            false,
            LogLevel::Debug,
            2,
        ),
        AppError::ExternalService { .. } => (
            "EXTERNAL_SERVICE_ERROR",
            true,
            Some("Check credentials and try the action again"),
            false,
            LogLevel::Error,
            3,
        ),
        AppError::Timeout { .. } => (
            "TIMEOUT",
            true,
            Some("Try the action again later"),
            false,
            LogLevel::Error,
            3,
        ),
        AppError::CompressionFailed(_) => (
            "COMPRESSION_FAILED",
            true,
            Some("Check the compression quota and the uploaded image"),
            false,
            LogLevel::Error,
            3,
        ),
        AppError::InvalidImageData(_) => (
            "INVALID_IMAGE_DATA",
            false,
            Some("Check image format and try a different file"),
            false,
            LogLevel::Warn,
            4,
        ),
        AppError::InvalidSheet(_) => (
            "INVALID_SHEET",
            false,
            Some("Check the spreadsheet header row"),
            false,
            LogLevel::Warn,
            4,
        ),
        AppError::Archive(_) => (
            "ARCHIVE_ERROR",
            false,
            None,
            true,
            LogLevel::Error,
            1,
        ),
        AppError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Add the missing entry to the spreadsheet"),
            false,
            LogLevel::Warn,
            5,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check environment variables or the .env file"),
            false,
            LogLevel::Error,
            6,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Try again; report the problem if it persists"),
            true,
            LogLevel::Error,
            1,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn exit_code(&self) -> i32 {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::MissingField(ref field) => format!("{} is required", field),
            AppError::MissingAssets { missing } => {
                format!("Please upload files for: {}", missing.join(", "))
            }
            AppError::ExternalService { service, message } => {
                format!("{} failed: {}", service, message)
            }
            AppError::Timeout { service } => format!("{} did not respond in time", service),
            AppError::CompressionFailed(ref msg) => format!("Image compression failed: {}", msg),
            AppError::InvalidImageData(ref msg) => msg.clone(),
            AppError::InvalidSheet(ref msg) => msg.clone(),
            AppError::Archive(_) => "Failed to build the zip bundle".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Config(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_missing_assets() {
        let err = AppError::MissingAssets {
            missing: vec!["box".to_string(), "portrait".to_string()],
        };
        assert_eq!(err.error_code(), "MISSING_ASSETS");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("box, portrait"));
        assert!(err.is_input_error());
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_error_metadata_external_service() {
        let err = AppError::external("Linear", "401 Unauthorized");
        assert_eq!(err.error_code(), "EXTERNAL_SERVICE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Linear failed: 401 Unauthorized");
        assert!(!err.is_input_error());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_found_is_warning() {
        let err = AppError::NotFound("No provider info found for: acme".to_string());
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.client_message(), "No provider info found for: acme");
    }

    #[test]
    fn test_internal_errors_are_sensitive() {
        let err = AppError::Internal("stack details".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal error");
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let inner = anyhow::anyhow!("connection reset").context("token exchange");
        let err = AppError::from(inner);
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("Caused by: token exchange"));
        assert!(details.contains("Caused by: connection reset"));
    }

    #[test]
    fn test_detailed_message_truncates_long_chains() {
        let mut inner = anyhow::anyhow!("root cause");
        for layer in 0..8 {
            inner = inner.context(format!("layer {}", layer));
        }
        let details = AppError::from(inner).detailed_message();
        assert_eq!(details.matches("Caused by:").count(), 5);
        assert!(details.ends_with("... (truncated)"));
    }

    #[test]
    fn test_display_messages() {
        let err = AppError::CompressionFailed("Your monthly limit has been exceeded".to_string());
        assert_eq!(
            err.to_string(),
            "Compression failed: Your monthly limit has been exceeded"
        );

        let err = AppError::Timeout {
            service: "Google Sheets".to_string(),
        };
        assert_eq!(err.to_string(), "Google Sheets request timed out");
    }
}
