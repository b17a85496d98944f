//! Liability composition for one (user, year, state) request.
//!
//! ```text
//! documents ─► aggregate ─► income, itemized
//!                              │
//! year tables ─► standard ─► resolve deduction ─► taxable income
//!                                                    │
//!                      federal brackets ◄────────────┤
//!                      state brackets   ◄────────────┘
//! income ─► payroll (SE, Medicare, SS)
//! credit source ─► total credits
//!                                 ─► TaxLiability::compose
//! ```
//!
//! The engine holds no mutable state. Every collaborator is injected at
//! construction, so one engine can serve concurrent requests and tests can
//! swap in an [`InMemoryRepository`](crate::db::InMemoryRepository) or fixed
//! credits.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::calculations::common::{non_negative, round_half_up};
use crate::calculations::{
    BracketTaxCalculator, CreditSource, DocumentAggregator, PayrollConfig, PayrollTaxCalculator,
    ResolvedDeduction, resolve_deduction, total_credits,
};
use crate::db::{RepositoryError, TaxRepository};
use crate::summary::render_summary;
use crate::validation::{FieldValidator, ValidationReport};
use crate::{
    BracketSchedule, Credits, Deductions, Document, ExtractedFormData, StateTaxInfo, TaxLiability,
    TaxYearConfig, TaxableIncome,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no income tax table for state '{0}'")]
    StateNotFound(String),

    #[error("tax year {0} is not configured")]
    YearNotConfigured(i32),

    #[error("invalid tax configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Engine behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Year whose tables stand in for an unconfigured year.
    ///
    /// `None` makes a missing year an error. Any fallback is logged at `warn`.
    #[serde(default)]
    pub year_fallback: Option<i32>,
}

/// Every intermediate figure of one liability calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiabilityBreakdown {
    pub year: i32,
    /// Year whose tables were used; differs from `year` only after a fallback.
    pub effective_year: i32,
    pub state: String,
    pub income: TaxableIncome,
    pub deductions: Deductions,
    pub resolved_deduction: ResolvedDeduction,
    pub agi: Decimal,
    pub taxable_income: Decimal,
    /// Federal rate on the next dollar of taxable income.
    pub federal_marginal_rate: Decimal,
    /// Federal tax divided by taxable income; zero without taxable income.
    pub federal_effective_rate: Decimal,
    pub credits: Credits,
    pub total_credits: Decimal,
    pub liability: TaxLiability,
}

struct YearTables {
    effective_year: i32,
    config: TaxYearConfig,
    federal: BracketSchedule,
}

#[derive(Clone)]
pub struct TaxCalculationEngine {
    repo: Arc<dyn TaxRepository>,
    credits: Arc<dyn CreditSource>,
    validator: FieldValidator,
    config: EngineConfig,
}

impl TaxCalculationEngine {
    pub fn new(
        repo: Arc<dyn TaxRepository>,
        credits: Arc<dyn CreditSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repo,
            credits,
            validator: FieldValidator::new(),
            config,
        }
    }

    /// Replaces the default validator, e.g. to pin the current year.
    pub fn with_validator(
        mut self,
        validator: FieldValidator,
    ) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Computes the liability for one user, year and state.
    ///
    /// # Errors
    /// * [`EngineError::YearNotConfigured`] when the year has no tables and
    ///   no fallback applies.
    /// * [`EngineError::StateNotFound`] for an unknown state code.
    /// * [`EngineError::Repository`] for storage failures.
    pub async fn calculate_tax_liability(
        &self,
        user_id: &str,
        year: i32,
        state: &str,
    ) -> Result<TaxLiability, EngineError> {
        Ok(self.calculate_breakdown(user_id, year, state).await?.liability)
    }

    /// Same as [`calculate_tax_liability`](Self::calculate_tax_liability),
    /// keeping every intermediate value.
    #[instrument(name = "calculate_liability", skip(self))]
    pub async fn calculate_breakdown(
        &self,
        user_id: &str,
        year: i32,
        state: &str,
    ) -> Result<LiabilityBreakdown, EngineError> {
        let tables = self.year_tables(year).await?;

        let documents: Vec<Document> = self.repo.find_documents(user_id, year).await?;
        let aggregation = DocumentAggregator::aggregate(&documents, year);
        debug!(
            documents = documents.len(),
            used = aggregation.documents_used,
            "documents aggregated"
        );

        let deductions = Deductions {
            standard: tables.config.standard_deduction,
            itemized: aggregation.itemized,
        };
        let resolved_deduction = resolve_deduction(&deductions);

        let income = aggregation.income;
        let agi = round_half_up(income.total());
        let taxable_income = non_negative(agi - resolved_deduction.amount);

        let federal = BracketTaxCalculator::new(&tables.federal);
        let federal_tax = federal.calculate(taxable_income);
        let federal_marginal_rate = tables.federal.marginal_rate(taxable_income);
        let federal_effective_rate = federal.effective_rate(taxable_income);
        let state_tax = self.calculate_state_tax(taxable_income, state).await?;

        let payroll = PayrollTaxCalculator::new(PayrollConfig::from_tax_year_config(&tables.config))
            .calculate(&income)
            .map_err(|e| EngineError::InvalidConfiguration(format!("tax year {}: {e}", tables.effective_year)))?;

        let credits = self.credits.credits_for(user_id, year).await?;
        let total_credits = total_credits(&credits);

        let liability = TaxLiability::compose(
            federal_tax,
            state_tax,
            payroll.self_employment_tax,
            payroll.medicare,
            payroll.social_security,
            total_credits,
        );

        info!(
            effective_year = tables.effective_year,
            agi = %agi,
            taxable_income = %taxable_income,
            total = %liability.total,
            "liability calculated"
        );

        Ok(LiabilityBreakdown {
            year,
            effective_year: tables.effective_year,
            state: StateTaxInfo::normalize_code(state),
            income,
            deductions,
            resolved_deduction,
            agi,
            taxable_income,
            federal_marginal_rate,
            federal_effective_rate,
            credits,
            total_credits,
            liability,
        })
    }

    /// State income tax on `taxable_income` using that state's brackets.
    ///
    /// An unknown state is [`EngineError::StateNotFound`], never zero.
    pub async fn calculate_state_tax(
        &self,
        taxable_income: Decimal,
        state: &str,
    ) -> Result<Decimal, EngineError> {
        let info = self
            .repo
            .get_state_tax_info(state)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => EngineError::StateNotFound(StateTaxInfo::normalize_code(state)),
                RepositoryError::InvalidTable(msg) => EngineError::InvalidConfiguration(msg),
                other => EngineError::Repository(other),
            })?;

        Ok(BracketTaxCalculator::new(&info.brackets).calculate(taxable_income))
    }

    /// Text summary of the calculation. Figures come from the same
    /// [`LiabilityBreakdown`] the structured result is built from.
    pub async fn generate_tax_summary(
        &self,
        user_id: &str,
        year: i32,
        state: &str,
    ) -> Result<String, EngineError> {
        let breakdown = self.calculate_breakdown(user_id, year, state).await?;
        Ok(render_summary(&breakdown))
    }

    /// Recomputes several years in parallel, one task per year.
    ///
    /// Results are sorted by year. A failing year does not affect the others;
    /// a task cancelled by runtime shutdown leaves its year out.
    pub async fn recalculate_years(
        &self,
        user_id: &str,
        years: &[i32],
        state: &str,
    ) -> Vec<(i32, Result<TaxLiability, EngineError>)> {
        let mut join_set = JoinSet::new();

        for &year in years {
            let engine = self.clone();
            let user_id = user_id.to_string();
            let state = state.to_string();
            join_set.spawn(async move {
                let result = engine.calculate_tax_liability(&user_id, year, &state).await;
                (year, result)
            });
        }

        let mut results = Vec::with_capacity(years.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => warn!(error = %e, "recalculation task cancelled"),
            }
        }
        results.sort_by_key(|(year, _)| *year);
        results
    }

    pub fn validate_extracted_data(
        &self,
        data: &ExtractedFormData,
    ) -> ValidationReport {
        self.validator.validate(data)
    }

    /// Stores extracted form data as a document of its form type and year,
    /// remembering the file it came from when known.
    #[instrument(skip(self, data), fields(form_type = %data.form_type, year = data.year))]
    pub async fn save_processed_document(
        &self,
        user_id: &str,
        data: ExtractedFormData,
        file_name: Option<&str>,
    ) -> Result<Document, EngineError> {
        let mut new_document = data.into_new_document(user_id);
        new_document.file_name = file_name.map(str::to_string);
        let document = self.repo.insert_document(new_document).await?;
        info!(id = document.id, "document saved");
        Ok(document)
    }

    /// Loads the year's configuration and federal brackets, applying the
    /// configured fallback when the year is missing.
    async fn year_tables(
        &self,
        year: i32,
    ) -> Result<YearTables, EngineError> {
        match self.load_year(year).await {
            Err(EngineError::YearNotConfigured(_)) => match self.config.year_fallback {
                Some(fallback) if fallback != year => {
                    warn!(year, fallback, "tax year not configured; using fallback year tables");
                    self.load_year(fallback).await
                }
                _ => Err(EngineError::YearNotConfigured(year)),
            },
            other => other,
        }
    }

    async fn load_year(
        &self,
        year: i32,
    ) -> Result<YearTables, EngineError> {
        let not_configured = |e: RepositoryError| match e {
            RepositoryError::NotFound => EngineError::YearNotConfigured(year),
            RepositoryError::InvalidTable(msg) => EngineError::InvalidConfiguration(msg),
            other => EngineError::Repository(other),
        };

        let config = self.repo.get_tax_year_config(year).await.map_err(not_configured)?;
        let federal = self.repo.get_federal_brackets(year).await.map_err(not_configured)?;

        Ok(YearTables {
            effective_year: year,
            config,
            federal,
        })
    }
}
