//! Integration tests for tax table loading using the SQLite backend.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tax_core::calculations::UnimplementedCredits;
use tax_core::db::{DbConfig, RepositoryRegistry};
use tax_core::{
    EngineConfig, ExtractedFormData, FieldMap, FieldValue, TaxCalculationEngine, TaxRepository,
};
use tax_data::{BracketLoader, BracketLoaderError, TaxYearConfigLoader};
use tax_db_sqlite::SqliteRepositoryFactory;

const TAX_YEARS_2024: &str = include_str!("../test-data/tax_years_2024.csv");
const BRACKETS_2024: &str = include_str!("../test-data/brackets_2024.csv");

/// Migrated and seeded in-memory database (2021-2023 tables only).
async fn setup_test_db() -> Arc<dyn TaxRepository> {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
        .create(&DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        })
        .await
        .expect("Failed to create in-memory database")
}

async fn load_2024(repo: &dyn TaxRepository) {
    let configs =
        TaxYearConfigLoader::parse(TAX_YEARS_2024.as_bytes()).expect("Failed to parse years");
    TaxYearConfigLoader::load(repo, &configs)
        .await
        .expect("Failed to load years");
    let records = BracketLoader::parse(BRACKETS_2024.as_bytes()).expect("Failed to parse CSV");
    BracketLoader::load(repo, &records)
        .await
        .expect("Failed to load brackets");
}

#[tokio::test]
async fn test_load_new_year_into_sqlite() {
    let repo = setup_test_db().await;

    load_2024(&*repo).await;

    assert_eq!(
        repo.list_tax_years().await.expect("years"),
        vec![2021, 2022, 2023, 2024]
    );
    let config = repo.get_tax_year_config(2024).await.expect("config");
    assert_eq!(config.standard_deduction, dec!(14600));
    assert_eq!(config.ss_wage_base, dec!(168600));

    let brackets = repo.get_federal_brackets(2024).await.expect("brackets");
    assert_eq!(brackets.len(), 7);
    assert_eq!(brackets.brackets()[0].max_income, Some(dec!(11600)));
    assert_eq!(brackets.brackets()[6].min_income, dec!(609350));
    assert_eq!(brackets.brackets()[6].max_income, None);
    assert_eq!(brackets.brackets()[6].rate, dec!(0.37));
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let repo = setup_test_db().await;

    load_2024(&*repo).await;
    load_2024(&*repo).await;

    assert_eq!(repo.get_federal_brackets(2024).await.expect("brackets").len(), 7);
    let states = repo.list_states().await.expect("states");
    assert_eq!(states, vec!["CA", "CO", "GA", "IL", "NY", "PA", "TX"]);
}

#[tokio::test]
async fn test_loaded_state_replaces_seeded_table() {
    let repo = setup_test_db().await;
    let csv = "jurisdiction,tax_year,min_income,max_income,rate\nIL,,0,,0.05";
    let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    BracketLoader::load(&*repo, &records)
        .await
        .expect("Failed to load");

    let illinois = repo.get_state_tax_info("IL").await.expect("state");
    assert_eq!(illinois.state_name, "Illinois");
    assert_eq!(illinois.brackets.len(), 1);
    assert_eq!(illinois.brackets.brackets()[0].rate, dec!(0.05));
}

#[tokio::test]
async fn test_brackets_for_unconfigured_year_are_rejected() {
    let repo = setup_test_db().await;
    let records = BracketLoader::parse(BRACKETS_2024.as_bytes()).expect("Failed to parse CSV");

    let result = BracketLoader::load(&*repo, &records).await;

    assert!(matches!(result, Err(BracketLoaderError::TaxYearNotFound(2024))));
    assert!(repo.get_federal_brackets(2024).await.is_err());
}

#[tokio::test]
async fn test_engine_uses_loaded_year() {
    let repo = setup_test_db().await;
    load_2024(&*repo).await;
    let engine = TaxCalculationEngine::new(
        repo,
        Arc::new(UnimplementedCredits::default()),
        EngineConfig::default(),
    );
    let mut fields = FieldMap::new();
    fields.insert("wages".to_string(), FieldValue::Number(dec!(50000)));
    engine
        .save_processed_document(
            "user-1",
            ExtractedFormData {
                form_type: "w2".to_string(),
                year: 2024,
                fields,
            },
            None,
        )
        .await
        .expect("save document");

    let liability = engine
        .calculate_tax_liability("user-1", 2024, "CO")
        .await
        .expect("liability");

    // taxable 50,000 - 14,600 = 35,400
    assert_eq!(liability.federal_tax, dec!(4016.00));
    assert_eq!(liability.state_tax, dec!(1557.60));
    assert_eq!(liability.medicare, dec!(725.00));
    assert_eq!(liability.social_security, dec!(3100.00));
    assert_eq!(liability.total, dec!(9398.60));
}
