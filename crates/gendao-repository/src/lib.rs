//! # Gendao Repository
//!
//! Backends and ready-made DAOs for the generic DAO layer:
//!
//! ```text
//! Application
//!   ↓  Arc<dyn GenericDao>      (storage-agnostic contract)
//! KeyedDao                      (primary keys + table mapping from config)
//!   ↓  DaoBase                  (create strategy, paging, tx flag)
//!   ↓  Arc<dyn BackendSession>
//! SqlSession | DocumentStore
//!   ↓
//! PostgreSQL / MySQL / SQLite | memory
//! ```

pub mod dao;
pub mod memory;
pub mod pool;
pub mod sql;

pub use dao::KeyedDao;
pub use memory::DocumentStore;
pub use pool::*;
pub use sql::SqlSession;
