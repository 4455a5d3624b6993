//! Error types for the scheduler client

use thiserror::Error;

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur while talking to the job scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Scheduler returned an error status code
    #[error("Scheduler error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the scheduler
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Registration rejected before it reached the scheduler
    #[error("Invalid registration: {0}")]
    InvalidRequest(String),
}

impl SchedulerError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SchedulerError::api_error(404, "missing").is_not_found());
        assert!(!SchedulerError::api_error(404, "missing").is_server_error());
        assert!(SchedulerError::api_error(503, "down").is_server_error());
        assert!(!SchedulerError::InvalidRequest("empty".into()).is_not_found());
    }
}
