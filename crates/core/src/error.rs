// Central Error Type for the SDK

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    #[error("We can't guess the language. Please specify it using the `language` option.")]
    Classification,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Polling of execution {execution_id} failed after {attempts} attempts: {message}")]
    PollingFailed {
        execution_id: String,
        attempts: u32,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 404-class failures are the only ones callers have a documented fallback for
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Transport {
            status,
            message: message.into(),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_with_and_without_status() {
        let with = AppError::transport(Some(502), "bad gateway");
        assert_eq!(with.to_string(), "Transport error (502): bad gateway");

        let without = AppError::transport(None, "connection reset");
        assert_eq!(without.to_string(), "Transport error: connection reset");
    }

    #[test]
    fn test_is_not_found() {
        assert!(AppError::NotFound("x".into()).is_not_found());
        assert!(!AppError::Internal("x".into()).is_not_found());
    }
}
