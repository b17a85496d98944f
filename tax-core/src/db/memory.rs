//! In-process [`TaxRepository`] backed by maps behind a `tokio` lock.
//!
//! Useful for tests and for running the engine without a database. Nothing
//! is persisted; every [`InMemoryRepositoryFactory::create`] call returns an
//! empty store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{RepositoryError, TaxRepository};
use crate::models::{BracketSchedule, Document, NewDocument, StateTaxInfo, TaxYearConfig};

#[derive(Debug, Default)]
struct Tables {
    documents: Vec<Document>,
    next_document_id: i64,
    years: BTreeMap<i32, TaxYearConfig>,
    federal: HashMap<i32, BracketSchedule>,
    states: BTreeMap<String, StateTaxInfo>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a year's configuration and federal schedule.
    pub fn with_tax_year(
        mut self,
        config: TaxYearConfig,
        federal: BracketSchedule,
    ) -> Self {
        let tables = self.tables.get_mut();
        tables.federal.insert(config.tax_year, federal);
        tables.years.insert(config.tax_year, config);
        self
    }

    pub fn with_state(
        mut self,
        info: StateTaxInfo,
    ) -> Self {
        let code = StateTaxInfo::normalize_code(&info.state_code);
        self.tables
            .get_mut()
            .states
            .insert(code.clone(), StateTaxInfo { state_code: code, ..info });
        self
    }
}

#[async_trait]
impl TaxRepository for InMemoryRepository {
    async fn find_documents(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<Document>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .iter()
            .filter(|d| d.user_id == user_id && d.year == year)
            .cloned()
            .collect())
    }

    async fn insert_document(
        &self,
        document: NewDocument,
    ) -> Result<Document, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.next_document_id += 1;
        let stored = Document {
            id: tables.next_document_id,
            user_id: document.user_id,
            doc_type: document.doc_type,
            year: document.year,
            content: document.content,
            file_name: document.file_name,
            created_at: Utc::now(),
        };
        tables.documents.push(stored.clone());
        Ok(stored)
    }

    async fn get_tax_year_config(
        &self,
        year: i32,
    ) -> Result<TaxYearConfig, RepositoryError> {
        self.tables
            .read()
            .await
            .years
            .get(&year)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        Ok(self.tables.read().await.years.keys().copied().collect())
    }

    async fn upsert_tax_year_config(
        &self,
        config: &TaxYearConfig,
    ) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .years
            .insert(config.tax_year, config.clone());
        Ok(())
    }

    async fn get_federal_brackets(
        &self,
        year: i32,
    ) -> Result<BracketSchedule, RepositoryError> {
        self.tables
            .read()
            .await
            .federal
            .get(&year)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn replace_federal_brackets(
        &self,
        year: i32,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError> {
        self.tables.write().await.federal.insert(year, schedule.clone());
        Ok(())
    }

    async fn get_state_tax_info(
        &self,
        state_code: &str,
    ) -> Result<StateTaxInfo, RepositoryError> {
        self.tables
            .read()
            .await
            .states
            .get(&StateTaxInfo::normalize_code(state_code))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_states(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.tables.read().await.states.keys().cloned().collect())
    }

    async fn upsert_state_tax_info(
        &self,
        info: &StateTaxInfo,
    ) -> Result<(), RepositoryError> {
        let code = StateTaxInfo::normalize_code(&info.state_code);
        let stored = StateTaxInfo {
            state_code: code.clone(),
            ..info.clone()
        };
        self.tables.write().await.states.insert(code, stored);
        Ok(())
    }
}

/// Registers the `memory` backend.
pub struct InMemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for InMemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Arc<dyn TaxRepository>, RepositoryError> {
        Ok(Arc::new(InMemoryRepository::new()))
    }
}
