//! Result type aliases for the generic DAO layer.

use crate::GendaoError;

/// A specialized `Result` type for gendao operations.
pub type GendaoResult<T> = Result<T, GendaoError>;
