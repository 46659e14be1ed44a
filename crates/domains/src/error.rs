//! # DomainError
//!
//! Centralized error handling for the comment engine.
//! Maps storage and validation failures to actionable error types.

use thiserror::Error;

/// The primary error type for all comment operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Submitted input is empty, oversized or contains forbidden characters
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A reply points at a comment that does not exist on the page
    #[error("reply target {0} not found")]
    DanglingReply(String),

    /// Directory or file operation failed
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record is malformed
    #[error("parse error: {0}")]
    Parse(String),

    /// Page identifier would escape the storage root
    #[error("invalid page id: {0}")]
    InvalidPageId(String),
}

/// A specialized Result type for comment logic.
pub type Result<T> = std::result::Result<T, DomainError>;
