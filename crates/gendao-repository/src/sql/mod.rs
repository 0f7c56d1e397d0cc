//! Relational backend.

pub mod schema;
mod session;
pub mod statement;

pub use schema::{ColumnKind, TableSchema};
pub use session::SqlSession;
