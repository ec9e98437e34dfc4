//! Database repository layer

pub mod catalog_repo;
pub mod role_repo;

pub use catalog_repo::*;
pub use role_repo::*;
