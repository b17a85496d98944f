use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BracketSchedule, Document, NewDocument, StateTaxInfo, TaxYearConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Stored tax table failed validation when it was loaded.
    #[error("Invalid tax table: {0}")]
    InvalidTable(String),
}

/// Storage for documents and tax tables.
///
/// Lookups that find nothing return [`RepositoryError::NotFound`].
#[async_trait]
pub trait TaxRepository: Send + Sync {
    // Documents
    async fn find_documents(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<Document>, RepositoryError>;

    async fn insert_document(
        &self,
        document: NewDocument,
    ) -> Result<Document, RepositoryError>;

    // Tax year config
    async fn get_tax_year_config(
        &self,
        year: i32,
    ) -> Result<TaxYearConfig, RepositoryError>;

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    async fn upsert_tax_year_config(
        &self,
        config: &TaxYearConfig,
    ) -> Result<(), RepositoryError>;

    // Federal brackets
    async fn get_federal_brackets(
        &self,
        year: i32,
    ) -> Result<BracketSchedule, RepositoryError>;

    async fn replace_federal_brackets(
        &self,
        year: i32,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError>;

    // State tables
    async fn get_state_tax_info(
        &self,
        state_code: &str,
    ) -> Result<StateTaxInfo, RepositoryError>;

    async fn list_states(&self) -> Result<Vec<String>, RepositoryError>;

    async fn upsert_state_tax_info(
        &self,
        info: &StateTaxInfo,
    ) -> Result<(), RepositoryError>;
}
