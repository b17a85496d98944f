use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tax_core::db::{DbConfig, RepositoryRegistry};
use tax_data::{BracketLoader, TaxYearConfigLoader};
use tax_db_sqlite::SqliteRepositoryFactory;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load tax tables from CSV files into the database.
///
/// Tax year constants are loaded before brackets so a new year can be added
/// with one invocation.
///
/// The tax years CSV has one column per `TaxYearConfig` field:
/// tax_year, standard_deduction, ss_wage_base, ss_tax_rate, medicare_tax_rate,
/// additional_medicare_rate, additional_medicare_threshold, se_tax_rate.
///
/// The brackets CSV has the columns:
/// - jurisdiction: `FEDERAL` or a state code (e.g., IL)
/// - tax_year: The tax year for federal rows (empty for states)
/// - min_income: The minimum income for this bracket
/// - max_income: The maximum income (empty for unlimited)
/// - rate: The marginal tax rate as a decimal (e.g., 0.10)
/// - name: Optional state name
#[derive(Parser, Debug)]
#[command(name = "tax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a CSV file of per-year tax constants
    #[arg(short, long)]
    tax_years: Option<PathBuf>,

    /// Path to a CSV file of federal and state brackets
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// SQLite database path, or `:memory:` for a dry run
    #[arg(short, long, default_value = "taxes.db")]
    database: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    if args.tax_years.is_none() && args.brackets.is_none() {
        bail!("nothing to load: pass --tax-years and/or --brackets");
    }

    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    let repo = registry
        .create(&DbConfig {
            backend: "sqlite".to_string(),
            connection_string: args.database.clone(),
        })
        .await
        .with_context(|| format!("Failed to open database: {}", args.database))?;

    if let Some(path) = &args.tax_years {
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let configs = TaxYearConfigLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        let stored = TaxYearConfigLoader::load(&*repo, &configs)
            .await
            .context("Failed to store tax year config")?;
        info!(years = stored, file = %path.display(), "tax year config loaded");
    }

    if let Some(path) = &args.brackets {
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = BracketLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        info!("Parsed {} records from {}", records.len(), path.display());

        let summary = BracketLoader::load(&*repo, &records)
            .await
            .context("Failed to load bracket tables into database")?;
        info!(
            "Loaded {} brackets (federal years {:?}, states {:?})",
            summary.brackets, summary.federal_years, summary.states
        );
    }

    Ok(())
}
