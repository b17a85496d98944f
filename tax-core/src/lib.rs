pub mod calculations;
pub mod db;
pub mod engine;
pub mod forms;
pub mod models;
pub mod summary;
pub mod validation;

pub use db::{DbConfig, InMemoryRepository, RepositoryError, RepositoryRegistry, TaxRepository};
pub use engine::{EngineConfig, EngineError, LiabilityBreakdown, TaxCalculationEngine};
pub use models::*;
pub use validation::{FieldValidator, ValidationReport};
