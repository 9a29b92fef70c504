//! # Error Types
//!
//! Errors raised while parsing shared value types.

use thiserror::Error;

/// Failure to parse an [`Identity`](crate::Identity) from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdentityError {
    /// Input was not valid hex.
    #[error("identity is not valid hex: {0}")]
    InvalidHex(String),

    /// Input decoded to the wrong number of bytes.
    #[error("identity must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
