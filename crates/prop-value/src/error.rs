//! Error types for prop-value

/// Result type for prop-value operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when mutating a property value tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The value (or one of its ancestors) has been frozen
    #[error("Property value '{key}' is immutable")]
    Immutable { key: String },

    /// An operation was applied to the wrong variant
    #[error("Property value '{key}' is not a {expected}")]
    WrongKind { key: String, expected: &'static str },
}
