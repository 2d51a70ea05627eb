//! Database layer: schema migrations and the repository.

pub mod repo;
pub mod schema;

pub use repo::Database;
