use std::collections::BTreeMap;
use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{
    BracketError, BracketSchedule, RepositoryError, StateTaxInfo, TaxBracket, TaxRepository,
    TaxYearConfig,
};
use thiserror::Error;
use tracing::{debug, info};

/// Jurisdiction value that marks a federal bracket row.
pub const FEDERAL: &str = "FEDERAL";

/// Errors that can occur when loading tax table data.
#[derive(Debug, Error)]
pub enum BracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Federal bracket row for {min_income} has no tax_year")]
    MissingTaxYear { min_income: Decimal },

    #[error("Tax year {0} not found in database (load the tax year config first)")]
    TaxYearNotFound(i32),

    #[error("Invalid bracket table for {jurisdiction}: {source}")]
    InvalidTable {
        jurisdiction: String,
        #[source]
        source: BracketError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for BracketLoaderError {
    fn from(err: csv::Error) -> Self {
        BracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the brackets CSV file.
///
/// - `jurisdiction`: `FEDERAL` or a two-letter state code
/// - `tax_year`: required for federal rows; state tables are not per-year
/// - `min_income`: the lower bound of the bracket
/// - `max_income`: the upper bound (empty for unlimited)
/// - `rate`: the marginal rate as a fraction (e.g., 0.10 for 10%)
/// - `name`: optional state name; the first non-empty value of a state wins
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub jurisdiction: String,
    #[serde(default)]
    pub tax_year: Option<i32>,
    pub min_income: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub rate: Decimal,
    #[serde(default)]
    pub name: Option<String>,
}

impl BracketRecord {
    fn is_federal(&self) -> bool {
        self.jurisdiction.trim().eq_ignore_ascii_case(FEDERAL)
    }

    fn bracket(&self) -> TaxBracket {
        TaxBracket::new(self.min_income, self.max_income, self.rate)
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// What a [`BracketLoader::load`] call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub federal_years: Vec<i32>,
    pub states: Vec<String>,
    pub brackets: usize,
}

/// Loader for federal and state bracket tables from CSV files.
///
/// Rows are grouped per table (a federal year or a state), sorted by
/// `min_income` and checked with [`BracketSchedule::new`] before anything
/// is written. A table in the file replaces the stored table as a whole, so
/// loading the same file twice gives the same result.
pub struct BracketLoader;

impl BracketLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<BracketRecord>, BracketLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Validate every table in `records` and write them through `repo`.
    ///
    /// Validation happens for all tables first; a bad table means nothing
    /// is written.
    pub async fn load(
        repo: &dyn TaxRepository,
        records: &[BracketRecord],
    ) -> Result<LoadSummary, BracketLoaderError> {
        let (federal, states) = group(records)?;

        let mut federal_tables = Vec::with_capacity(federal.len());
        for (year, rows) in federal {
            let schedule = schedule_for(&format!("{FEDERAL} {year}"), &rows)?;
            federal_tables.push((year, schedule));
        }
        let mut state_tables = Vec::with_capacity(states.len());
        for (code, rows) in states {
            let schedule = schedule_for(&code, &rows)?;
            let name = rows
                .iter()
                .filter_map(|r| r.name.as_deref().map(str::trim))
                .find(|n| !n.is_empty())
                .map(str::to_string);
            let state_name = match name {
                Some(name) => name,
                None => existing_state_name(repo, &code).await?,
            };
            state_tables.push((code, state_name, schedule));
        }

        // Every federal year must be configured before anything is written.
        for (year, _) in &federal_tables {
            repo.get_tax_year_config(*year).await.map_err(|e| match e {
                RepositoryError::NotFound => BracketLoaderError::TaxYearNotFound(*year),
                other => BracketLoaderError::Repository(other),
            })?;
        }

        let mut summary = LoadSummary::default();

        for (year, schedule) in federal_tables {
            repo.replace_federal_brackets(year, &schedule).await?;
            debug!(year, brackets = schedule.len(), "federal brackets replaced");
            summary.brackets += schedule.len();
            summary.federal_years.push(year);
        }

        for (code, state_name, schedule) in state_tables {
            summary.brackets += schedule.len();
            repo.upsert_state_tax_info(&StateTaxInfo {
                state_code: code.clone(),
                state_name,
                brackets: schedule,
            })
            .await?;
            debug!(state = %code, "state table replaced");
            summary.states.push(code);
        }

        info!(
            federal_years = summary.federal_years.len(),
            states = summary.states.len(),
            brackets = summary.brackets,
            "bracket tables loaded"
        );
        Ok(summary)
    }
}

type FederalGroups<'a> = BTreeMap<i32, Vec<&'a BracketRecord>>;
type StateGroups<'a> = BTreeMap<String, Vec<&'a BracketRecord>>;

fn group(
    records: &[BracketRecord]
) -> Result<(FederalGroups<'_>, StateGroups<'_>), BracketLoaderError> {
    let mut federal: FederalGroups<'_> = BTreeMap::new();
    let mut states: StateGroups<'_> = BTreeMap::new();

    for record in records {
        if record.is_federal() {
            let year = record.tax_year.ok_or(BracketLoaderError::MissingTaxYear {
                min_income: record.min_income,
            })?;
            federal.entry(year).or_default().push(record);
        } else {
            states
                .entry(StateTaxInfo::normalize_code(&record.jurisdiction))
                .or_default()
                .push(record);
        }
    }

    Ok((federal, states))
}

fn schedule_for(
    jurisdiction: &str,
    rows: &[&BracketRecord],
) -> Result<BracketSchedule, BracketLoaderError> {
    let mut brackets: Vec<TaxBracket> = rows.iter().map(|r| r.bracket()).collect();
    brackets.sort_by(|a, b| a.min_income.cmp(&b.min_income));
    BracketSchedule::new(brackets).map_err(|source| BracketLoaderError::InvalidTable {
        jurisdiction: jurisdiction.to_string(),
        source,
    })
}

async fn existing_state_name(
    repo: &dyn TaxRepository,
    code: &str,
) -> Result<String, BracketLoaderError> {
    match repo.get_state_tax_info(code).await {
        Ok(info) => Ok(info.state_name),
        Err(RepositoryError::NotFound) => Ok(code.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Loader for per-year constants from CSV files.
///
/// Columns match the [`TaxYearConfig`] field names. Existing years are
/// overwritten.
pub struct TaxYearConfigLoader;

impl TaxYearConfigLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxYearConfig>, BracketLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut configs = Vec::new();

        for result in csv_reader.deserialize() {
            let config: TaxYearConfig = result?;
            configs.push(config);
        }

        Ok(configs)
    }

    pub async fn load(
        repo: &dyn TaxRepository,
        configs: &[TaxYearConfig],
    ) -> Result<usize, BracketLoaderError> {
        for config in configs {
            repo.upsert_tax_year_config(config).await?;
            debug!(year = config.tax_year, "tax year config stored");
        }
        Ok(configs.len())
    }
}
