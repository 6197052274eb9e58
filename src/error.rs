/// Error types for focus-insights
///
/// This module defines all possible errors that can occur in the engine.
/// Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Main error type for focus-insights operations
#[derive(Error, Debug)]
pub enum InsightError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied something we refuse to process
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Event failed validation before reaching the log
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Responding to a suggestion that was never stored
    #[error("Suggestion not found: {0}")]
    SuggestionNotFound(i64),

    /// A stored row could not be mapped back into a domain value
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for focus-insights operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Convert InsightError to a user-friendly error message
impl InsightError {
    pub fn user_message(&self) -> String {
        match self {
            InsightError::Database(e) => {
                format!("Database error occurred. Please try again. Details: {}", e)
            }
            InsightError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            InsightError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            InsightError::ConfigParse(e) => {
                format!("Could not read config file: {}", e)
            }
            InsightError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
            InsightError::InvalidInput(reason) => {
                format!("Invalid input: {}", reason)
            }
            InsightError::InvalidEvent(reason) => {
                format!("Event rejected: {}", reason)
            }
            InsightError::SuggestionNotFound(id) => {
                format!("No suggestion with id {}", id)
            }
            InsightError::CorruptRecord(msg) => {
                format!("Stored data is unreadable: {}", msg)
            }
            InsightError::Generic(msg) => msg.clone(),
        }
    }
}
