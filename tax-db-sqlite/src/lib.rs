//! SQLite storage for documents and tax tables.
//!
//! Register [`SqliteRepositoryFactory`] with a
//! [`tax_core::db::RepositoryRegistry`] to enable the `sqlite` backend.

mod decimal;
mod factory;
mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
