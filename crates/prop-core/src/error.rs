//! Error types for prop-core

/// Result type for prop-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a context or converting values
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No converter produced a value for the requested type
    #[error(
        "Cannot convert '{value}' for key '{key_name}' to {target}; supported formats: [{formats}]",
        key_name = .key.as_deref().unwrap_or("<unnamed>"),
        formats = .supported_formats.join(", ")
    )]
    Unconvertible {
        key: Option<String>,
        target: String,
        value: String,
        supported_formats: Vec<String>,
    },

    /// A builder was mutated after `build()`
    #[error("Configuration context builder has already been built")]
    BuilderBuilt,

    /// A referenced property source is not registered
    #[error("Property source not found: {name}")]
    SourceNotFound { name: String },

    /// A referenced property filter is not registered
    #[error("Property filter not found: {name}")]
    FilterNotFound { name: String },

    /// Value tree error from prop-value
    #[error(transparent)]
    Value(#[from] prop_value::Error),
}

/// Failure reported by a property filter
///
/// Filter failures never reach callers of the configuration; the pipeline
/// logs them and continues with the unfiltered value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FilterError {
    message: String,
}

impl FilterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by a property converter
///
/// The converter registry logs these and moves on to the next converter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConverterError {
    message: String,
}

impl ConverterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
