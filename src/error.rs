//! Error types for privacy loss computations.

/// Errors raised by privacy loss distribution operations.
///
/// Every error is a synchronous domain-precondition failure; there are
/// no retries and no partial results.
#[derive(Debug, thiserror::Error)]
pub enum AccountingError {
    /// A parameter failed domain validation.
    #[error("invalid parameter: {msg}")]
    InvalidParameters {
        /// Human-readable error description.
        msg: String,
    },

    /// Two privacy loss distributions cannot be composed with each other.
    #[error("incompatible distributions: {msg}")]
    IncompatibleComposition {
        /// Human-readable error description.
        msg: String,
    },
}

/// Result type for privacy loss distribution operations.
pub type Result<T> = std::result::Result<T, AccountingError>;

impl AccountingError {
    /// Create an invalid parameter error.
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameters { msg: msg.into() }
    }

    /// Create an incompatible composition error.
    pub fn incompatible<S: Into<String>>(msg: S) -> Self {
        Self::IncompatibleComposition { msg: msg.into() }
    }
}
