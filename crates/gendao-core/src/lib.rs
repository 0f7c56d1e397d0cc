//! # Gendao Core
//!
//! Storage-agnostic building blocks of the generic DAO layer: the
//! [`GenericBo`] attribute bag, backend [`Row`] encodings, canonical
//! [`Filter`]/[`Sorting`] shapes, [`RowMapper`] implementations, the
//! [`BackendSession`] collaborator contract and the [`GenericDao`] contract
//! with its [`DaoBase`] orchestration.

pub mod bo;
pub mod coerce;
pub mod dao;
pub mod error;
pub mod mapper;
pub mod query;
pub mod result;
pub mod row;
pub mod session;
pub mod telemetry;

pub use bo::GenericBo;
pub use coerce::{coerce, FromAttr};
pub use dao::{sort_rows, DaoBase, GenericDao};
pub use error::*;
pub use mapper::{
    DocumentRowMapper, GenericRowMapper, NameTransformation, RowMapper, TranslationTable, ALL_COLUMNS,
    WILDCARD_STORAGE,
};
pub use query::{compare_values, values_equal, Filter, FilterInput, SortOrder, Sorting, SortingInput};
pub use result::*;
pub use row::Row;
pub use session::{BackendSession, Capabilities, Query};
pub use telemetry::{init_tracing, TelemetryConfig};

// Re-export shaku for dependency injection
pub use shaku::Interface;
