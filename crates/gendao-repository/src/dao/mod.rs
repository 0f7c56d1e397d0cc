//! Ready-made DAOs.

mod keyed_dao;

pub use keyed_dao::KeyedDao;
