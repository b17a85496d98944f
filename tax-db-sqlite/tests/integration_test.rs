use std::sync::Arc;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tax_core::calculations::UnimplementedCredits;
use tax_core::db::{DbConfig, RepositoryFactory, RepositoryRegistry};
use tax_core::{
    EngineConfig, EngineError, ExtractedFormData, FieldMap, FieldValue, TaxCalculationEngine,
    TaxRepository,
};
use tax_db_sqlite::SqliteRepositoryFactory;

async fn seeded_repository() -> Arc<dyn TaxRepository> {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
        .create(&DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        })
        .await
        .expect("Failed to create seeded repository")
}

fn engine(
    repo: Arc<dyn TaxRepository>,
    config: EngineConfig,
) -> TaxCalculationEngine {
    TaxCalculationEngine::new(repo, Arc::new(UnimplementedCredits::default()), config)
}

fn w2(wages: Decimal) -> ExtractedFormData {
    let mut fields = FieldMap::new();
    fields.insert("employerName".to_string(), FieldValue::from("Acme Corp"));
    fields.insert("wages".to_string(), FieldValue::Number(wages));
    ExtractedFormData {
        form_type: "w2".to_string(),
        year: 2023,
        fields,
    }
}

#[tokio::test]
async fn seeded_tables_pass_validation() {
    let repo = seeded_repository().await;

    for year in [2021, 2022, 2023] {
        let brackets = repo
            .get_federal_brackets(year)
            .await
            .unwrap_or_else(|e| panic!("federal brackets for {year}: {e}"));
        assert_eq!(brackets.len(), 7);
    }
    for state in repo.list_states().await.expect("list states") {
        repo.get_state_tax_info(&state)
            .await
            .unwrap_or_else(|e| panic!("state table {state}: {e}"));
    }
}

#[tokio::test]
async fn seeded_wage_base_follows_the_year() {
    let repo = seeded_repository().await;

    let mut bases = Vec::new();
    for year in [2021, 2022, 2023] {
        bases.push(repo.get_tax_year_config(year).await.expect("config").ss_wage_base);
    }

    assert_eq!(bases, vec![dec!(142800), dec!(147000), dec!(160200)]);
}

#[tokio::test]
async fn wages_scenario_against_sqlite() {
    let engine = engine(seeded_repository().await, EngineConfig::default());
    engine
        .save_processed_document("user-1", w2(dec!(30000)), Some("w2-2023.pdf"))
        .await
        .expect("save document");

    let liability = engine
        .calculate_tax_liability("user-1", 2023, "IL")
        .await
        .expect("liability");

    assert_eq!(liability.federal_tax, dec!(1718.00));
    assert_eq!(liability.state_tax, dec!(799.43));
    assert_eq!(liability.medicare, dec!(435.00));
    assert_eq!(liability.social_security, dec!(1860.00));
    assert_eq!(liability.total, dec!(4812.43));
}

#[tokio::test]
async fn social_security_cap_uses_seeded_year() {
    let engine = engine(seeded_repository().await, EngineConfig::default());
    let mut data = w2(dec!(500000));
    data.year = 2021;
    engine
        .save_processed_document("user-1", data, None)
        .await
        .expect("save document");

    let liability = engine
        .calculate_tax_liability("user-1", 2021, "TX")
        .await
        .expect("liability");

    // 142,800 × 6.2%
    assert_eq!(liability.social_security, dec!(8853.60));
}

#[tokio::test]
async fn unknown_state_and_year_are_reported() {
    let engine = engine(seeded_repository().await, EngineConfig::default());

    assert_eq!(
        engine.calculate_tax_liability("user-1", 2023, "ZZ").await,
        Err(EngineError::StateNotFound("ZZ".to_string()))
    );
    assert_eq!(
        engine.calculate_tax_liability("user-1", 2019, "TX").await,
        Err(EngineError::YearNotConfigured(2019))
    );
}

#[tokio::test]
async fn factory_reports_bad_location_as_connection_error() {
    let config = DbConfig {
        backend: "sqlite".to_string(),
        connection_string: "/nonexistent-dir/for/sure/taxes.db".to_string(),
    };

    let result = SqliteRepositoryFactory.create(&config).await;

    assert!(matches!(result.err(), Some(tax_core::RepositoryError::Connection(_))));
}
