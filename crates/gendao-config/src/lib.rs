//! # Gendao Config
//!
//! Configuration for the generic DAO layer: database connection, row mapper
//! translation tables, storage layout and logging. Supports layered
//! configuration from files, environment variables, and runtime refresh.

mod app_config;
mod flavor;
mod loader;
mod validation;

pub use app_config::*;
pub use flavor::*;
pub use loader::*;
pub use validation::*;
