//! Unified error type for the generic DAO layer.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for business objects, row mappers and DAOs.
///
/// Absence of a match (nothing to fetch, update or delete) is never an
/// error; DAO operations report it as a zero count or `None`.
#[derive(Error, Debug)]
pub enum GendaoError {
    // ============ Integrity Errors ============
    /// Write rejected because the entry/key already exists.
    #[error("data integrity violation: duplicated entry/key")]
    DuplicatedEntry,

    // ============ Translation Errors ============
    /// A filter, sorting or row value is not in a recognised shape.
    #[error("Translation error: {0}")]
    Translation(String),

    /// An attribute could not be coerced to the requested type.
    #[error("Cannot convert attribute '{name}' to {target}: {reason}")]
    TypeConversion {
        name: String,
        target: &'static str,
        reason: String,
    },

    /// A safe accessor was used on a missing attribute.
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    /// JSON encoding/decoding failed.
    #[error("Decode error: {0}")]
    Decode(String),

    // ============ Infrastructure Errors ============
    /// Opaque failure reported by the backend driver.
    #[error("Backend error: {0}")]
    Backend(#[source] anyhow::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend session lacks a required capability.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl GendaoError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicatedEntry => "DUPLICATED_ENTRY",
            Self::Translation(_) => "TRANSLATION_ERROR",
            Self::TypeConversion { .. } => "TYPE_CONVERSION_ERROR",
            Self::AttributeNotFound(_) => "ATTRIBUTE_NOT_FOUND",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Unsupported(_) => "UNSUPPORTED",
        }
    }

    /// Creates a translation error.
    #[must_use]
    pub fn translation<T: Into<String>>(message: T) -> Self {
        Self::Translation(message.into())
    }

    /// Creates a type conversion error for an attribute.
    #[must_use]
    pub fn type_conversion<N: Into<String>, R: ToString>(
        name: N,
        target: &'static str,
        reason: R,
    ) -> Self {
        Self::TypeConversion {
            name: name.into(),
            target,
            reason: reason.to_string(),
        }
    }

    /// Wraps a driver error without interpreting it.
    #[must_use]
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Backend(err.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Checks if this error is an integrity violation.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicatedEntry)
    }

    /// Checks if this error comes from an unrecognised input shape.
    #[must_use]
    pub const fn is_translation(&self) -> bool {
        matches!(self, Self::Translation(_))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for GendaoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::DuplicatedEntry;
            }
            // MySQL reports duplicate keys with 1062, PostgreSQL with 23505
            if let Some(code) = db_err.code() {
                if code == "23505" || code == "1062" || code == "2067" || code == "1555" {
                    return Self::DuplicatedEntry;
                }
            }
        }
        Self::Backend(err.into())
    }
}

impl From<serde_json::Error> for GendaoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
