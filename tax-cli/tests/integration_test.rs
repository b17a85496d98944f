use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tax_cli::Settings;
use tax_cli::app::{build_engine, build_registry, prepare_document};
use tax_core::EngineError;

fn sqlite_settings() -> Settings {
    let mut settings = Settings::default();
    settings.database.connection = ":memory:".to_string();
    settings
}

#[tokio::test]
async fn import_then_calculate() {
    let settings = sqlite_settings();
    let repo = build_registry()
        .create(&settings.db_config())
        .await
        .expect("repository");
    let engine = build_engine(repo.clone(), settings.engine.clone());

    let data = prepare_document(
        r#"{"employerName": "Acme Corp", "wages": 30000, "taxYear": "2023"}"#,
        None,
        None,
        2024,
    )
    .expect("document");
    assert_eq!((data.form_type.as_str(), data.year), ("w2", 2023));
    engine
        .save_processed_document("user-1", data, Some("acme-w2.json"))
        .await
        .expect("saved");

    let liability = engine
        .calculate_tax_liability("user-1", 2023, "il")
        .await
        .expect("liability");
    assert_eq!(liability.total, dec!(4812.43));

    let summary = engine
        .generate_tax_summary("user-1", 2023, "IL")
        .await
        .expect("summary");
    assert!(summary.contains("Total Tax Liability: $4,812.43"));
    let documents = repo.find_documents("user-1", 2023).await.expect("docs");
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].file_name.as_deref(), Some("acme-w2.json"));
}

#[tokio::test]
async fn brokerage_and_misc_forms_count_as_income() {
    let settings = sqlite_settings();
    let repo = build_registry()
        .create(&settings.db_config())
        .await
        .expect("repository");
    let engine = build_engine(repo, settings.engine.clone());

    for (json, form_type) in [
        (r#"{"proceedsFromBroker": 5000}"#, "1099-B"),
        (r#"{"otherIncome": 700}"#, "1099-MISC"),
    ] {
        let data = prepare_document(json, Some(form_type.to_string()), Some(2023), 2024)
            .expect("document");
        engine
            .save_processed_document("user-1", data, None)
            .await
            .expect("saved");
    }

    let breakdown = engine
        .calculate_breakdown("user-1", 2023, "TX")
        .await
        .expect("breakdown");
    assert_eq!(breakdown.income.investments, dec!(5000));
    assert_eq!(breakdown.income.other, dec!(700));
    assert_eq!(breakdown.agi, dec!(5700));
}

#[tokio::test]
async fn settings_fallback_reaches_the_engine() {
    let mut settings = sqlite_settings();
    settings.engine.year_fallback = Some(2023);
    let repo = build_registry()
        .create(&settings.db_config())
        .await
        .expect("repository");

    let strict = build_engine(repo.clone(), Default::default());
    let lenient = build_engine(repo, settings.engine.clone());

    assert_eq!(
        strict.calculate_tax_liability("user-1", 2030, "TX").await,
        Err(EngineError::YearNotConfigured(2030))
    );
    assert_eq!(
        lenient
            .calculate_tax_liability("user-1", 2030, "TX")
            .await
            .map(|l| l.total),
        Ok(dec!(0))
    );
}

#[tokio::test]
async fn memory_backend_starts_empty() {
    let mut settings = Settings::default();
    settings.database.backend = "memory".to_string();

    let repo = build_registry()
        .create(&settings.db_config())
        .await
        .expect("repository");

    assert!(repo.list_tax_years().await.expect("years").is_empty());
}

#[tokio::test]
async fn unknown_backend_is_a_configuration_error() {
    let mut settings = Settings::default();
    settings.database.backend = "postgres".to_string();

    let result = build_registry().create(&settings.db_config()).await;

    assert!(matches!(
        result.err(),
        Some(tax_core::RepositoryError::Configuration(msg)) if msg.contains("sqlite")
    ));
}
