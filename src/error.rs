//! Error types for the nickcloud library.

use thiserror::Error;

/// Generic text shown for every transport-level failure.
pub const CONNECTION_MESSAGE: &str = "Unable to reach the server";

/// Main error type for nickcloud operations.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Local input validation failed before any request was made.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The server answered with `success: false`.
    #[error("API error: {message}")]
    Api { message: String },

    /// HTTP request failed with status code and no readable body.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// Network request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unexpected response from server.
    #[error("Invalid response from server")]
    InvalidResponse,

    /// Candidate file is above the absolute upload cap.
    #[error("File too large: {size_mb:.2}MB (max {max_mb:.0}MB)")]
    FileTooLarge { size_mb: f64, max_mb: f64 },

    /// Candidate file does not fit in the space still available.
    #[error(
        "Insufficient space: available {available_mb:.2}MB, file {file_mb:.2}MB, deficit {deficit_mb:.2}MB"
    )]
    InsufficientSpace {
        available_mb: f64,
        file_mb: f64,
        deficit_mb: f64,
    },

    /// Upload would push usage over the volume limit.
    #[error("Quota exceeded: limit {limit_mb:.2}MB, new total {new_total_mb:.2}MB")]
    QuotaExceeded { limit_mb: f64, new_total_mb: f64 },

    /// Operation needs a logged-in volume.
    #[error("Not logged in")]
    NotAuthenticated,

    /// Invalid serialized state.
    #[error("Invalid state format: {0}")]
    InvalidState(String),

    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

impl CloudError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CloudError::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn api(message: Option<String>, fallback: &str) -> Self {
        CloudError::Api {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        }
    }

    /// True for failures where no server message is available
    /// (network unreachable, timeout, unreadable body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CloudError::Http(_)
                | CloudError::Request(_)
                | CloudError::Json(_)
                | CloudError::InvalidResponse
        )
    }

    /// True for the Quota Guard rejections.
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            CloudError::FileTooLarge { .. }
                | CloudError::InsufficientSpace { .. }
                | CloudError::QuotaExceeded { .. }
        )
    }

    /// Text suitable for an inline form message or a notification.
    pub fn user_message(&self) -> String {
        match self {
            e if e.is_transport() => CONNECTION_MESSAGE.to_string(),
            CloudError::Validation { message, .. } => message.clone(),
            CloudError::Api { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for nickcloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
