use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tax_core::calculations::UnimplementedCredits;
use tax_core::db::{InMemoryRepositoryFactory, RepositoryRegistry};
use tax_core::forms;
use tax_core::summary::format_currency;
use tax_core::{
    DocumentType, EngineConfig, ExtractedFormData, FieldMap, TaxCalculationEngine, TaxLiability,
    TaxRepository,
};
use tax_db_sqlite::SqliteRepositoryFactory;
use tracing::debug;

/// Build a [`RepositoryRegistry`] with every backend compiled into this binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(InMemoryRepositoryFactory));
    registry
}

pub fn build_engine(
    repo: Arc<dyn TaxRepository>,
    config: EngineConfig,
) -> TaxCalculationEngine {
    TaxCalculationEngine::new(repo, Arc::new(UnimplementedCredits::default()), config)
}

/// A document file: either `{"formType", "year", "fields"}` with the first
/// two optional, or a bare object of fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Wrapped {
        #[serde(rename = "formType")]
        form_type: Option<String>,
        year: Option<i32>,
        fields: FieldMap,
    },
    Bare(FieldMap),
}

/// Parses a document file and fills in whatever it leaves out.
///
/// Explicit overrides win over the file; anything still missing is detected
/// from the fields. Known form types are stored under their canonical name.
pub fn prepare_document(
    json: &str,
    form_type: Option<String>,
    year: Option<i32>,
    current_year: i32,
) -> Result<ExtractedFormData> {
    let file: DocumentFile =
        serde_json::from_str(json).context("document is not a JSON object of fields")?;
    let (file_form, file_year, fields) = match file {
        DocumentFile::Wrapped {
            form_type,
            year,
            fields,
        } => (form_type, year, fields),
        DocumentFile::Bare(fields) => (None, None, fields),
    };

    let detected = forms::classify(fields, current_year);
    let form_type = form_type.or(file_form).unwrap_or(detected.form_type);
    let year = year.or(file_year).unwrap_or(detected.year);
    debug!(%form_type, year, "document prepared");

    Ok(ExtractedFormData {
        form_type: DocumentType::parse(&form_type).as_str().to_string(),
        year,
        fields: detected.fields,
    })
}

/// Plain-text listing of a liability, one component per line.
pub fn format_liability(liability: &TaxLiability) -> String {
    let mut out = String::new();
    for (label, amount) in [
        ("Federal Tax", liability.federal_tax),
        ("State Tax", liability.state_tax),
        ("Self-Employment Tax", liability.self_employment_tax),
        ("Medicare", liability.medicare),
        ("Social Security", liability.social_security),
        ("Total", liability.total),
    ] {
        let _ = writeln!(out, "{label:<20} {:>14}", format_currency(amount));
    }
    out
}
