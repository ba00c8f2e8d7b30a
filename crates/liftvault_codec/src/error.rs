//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding a single record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A required field is absent or null.
    #[error("missing field `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A field holds a value of the wrong type.
    #[error("field `{field}` should be {expected}, found {found}")]
    TypeMismatch {
        /// Name of the field.
        field: String,
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        found: &'static str,
    },

    /// A field holds a value outside its domain.
    #[error("invalid value for `{field}`: {message}")]
    InvalidValue {
        /// Name of the field.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// The record's kind does not match what the decoder expected.
    #[error("unexpected record kind `{kind}`")]
    UnexpectedKind {
        /// The kind found on the record.
        kind: String,
    },

    /// The stored record could not be parsed at all.
    #[error("unreadable record: {message}")]
    Unreadable {
        /// The parser's message.
        message: String,
    },

    /// Wire encoding failed.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },
}

impl CodecError {
    /// Create a missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unreadable record error.
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::Unreadable {
            message: message.into(),
        }
    }

    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }
}
