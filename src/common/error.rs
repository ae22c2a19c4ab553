//! Error types for bptdb.

use thiserror::Error as ThisError;

use crate::common::Offset;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in bptdb.
///
/// Structural invariant breaches found while a mutation is in progress are
/// engine bugs and panic instead of returning one of these.
#[derive(Debug, ThisError)]
pub enum Error {
    /// I/O error from the backing file. Never retried.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is not present (`search`, `update`, `remove`).
    #[error("key not found")]
    NotFound,

    /// The key is already present (`insert`).
    #[error("duplicate key")]
    Duplicate,

    /// `search_range` was called with `left > right`.
    #[error("invalid range: left bound is greater than right bound")]
    InvalidRange,

    /// The meta block failed validation.
    ///
    /// Only surfaced under `RecoveryPolicy::FailFast`.
    #[error("corrupt meta block: {0}")]
    CorruptMeta(String),

    /// A node block decoded to an impossible shape.
    #[error("corrupt node at {offset}: {reason}")]
    CorruptNode { offset: Offset, reason: String },

    /// The key is empty, too long, or contains a NUL byte.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The configured order is outside the supported range.
    #[error("invalid tree order: {0}")]
    InvalidOrder(usize),

    /// `verify()` found a broken structural invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", Error::NotFound), "key not found");
        assert_eq!(format!("{}", Error::Duplicate), "duplicate key");
        assert_eq!(format!("{}", Error::InvalidOrder(2)), "invalid tree order: 2");

        let err = Error::CorruptNode {
            offset: Offset::new(200),
            reason: "n = 9 exceeds order 4".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "corrupt node at Offset(200): n = 9 exceeds order 4"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(err.source().is_some());
        assert!(Error::NotFound.source().is_none());
    }
}
