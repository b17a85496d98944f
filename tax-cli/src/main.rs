use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use tax_cli::Settings;
use tax_cli::app;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Tax liability engine.
///
/// Aggregates a user's stored documents for a year and computes federal,
/// state and payroll taxes from the tax tables in the configured database.
#[derive(Debug, Parser)]
#[command(name = "tax-engine", version)]
struct Cli {
    /// Settings file. Defaults to `tax-engine.toml` in the working directory
    /// when it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend to use (overrides the settings file).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string (overrides the settings file).
    /// For SQLite this is a file path (e.g. `taxes.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Year whose tables stand in for an unconfigured year.
    #[arg(long, global = true)]
    year_fallback: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the liability for one year.
    Liability {
        #[arg(long)]
        user: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        state: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print a text summary with every intermediate figure.
    Summary {
        #[arg(long)]
        user: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        state: String,
    },
    /// Recompute several years at once.
    Recalculate {
        #[arg(long)]
        user: String,
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<i32>,
        #[arg(long)]
        state: String,
    },
    /// Check a document file against the rules for its form type.
    Validate {
        /// JSON file of fields, optionally wrapped with formType and year.
        file: PathBuf,
        #[arg(long)]
        form_type: Option<String>,
    },
    /// Validate a document file and store it for a user.
    ImportDocument {
        #[arg(long)]
        user: String,
        file: PathBuf,
        #[arg(long)]
        form_type: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// Store the document even when validation reports errors.
        #[arg(long)]
        force: bool,
    },
    /// List configured tax years and states.
    Tables,
}

// ─── tracing ─────────────────────────────────────────────────────────────────

/// Initialise the tracing subscriber.
///
/// * Honours `RUST_LOG` when set.
/// * Falls back to the settings file level so normal runs are quiet.
/// * Strips timestamps and target names to keep CLI output clean.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::from("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

fn read_document(
    file: &Path,
    form_type: Option<String>,
    year: Option<i32>,
) -> anyhow::Result<tax_core::ExtractedFormData> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read: {}", file.display()))?;
    app::prepare_document(&json, form_type, year, Utc::now().year())
        .with_context(|| format!("Failed to parse document: {}", file.display()))
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        settings.database.backend = backend;
    }
    if let Some(db) = cli.db {
        settings.database.connection = db;
    }
    if cli.year_fallback.is_some() {
        settings.engine.year_fallback = cli.year_fallback;
    }

    init_tracing(&settings.logging.level);

    let db_config = settings.db_config();
    debug!("connecting to {} backend", db_config.backend);
    let registry = app::build_registry();
    let repo = registry.create(&db_config).await?;
    let engine = app::build_engine(repo.clone(), settings.engine.clone());

    match cli.command {
        Command::Liability {
            user,
            year,
            state,
            json,
        } => {
            let liability = engine.calculate_tax_liability(&user, year, &state).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&liability)?);
            } else {
                print!("{}", app::format_liability(&liability));
            }
        }
        Command::Summary { user, year, state } => {
            print!("{}", engine.generate_tax_summary(&user, year, &state).await?);
        }
        Command::Recalculate { user, years, state } => {
            for (year, result) in engine.recalculate_years(&user, &years, &state).await {
                match result {
                    Ok(liability) => println!(
                        "{year}: {}",
                        tax_core::summary::format_currency(liability.total)
                    ),
                    Err(e) => println!("{year}: error: {e}"),
                }
            }
        }
        Command::Validate { file, form_type } => {
            let data = read_document(&file, form_type, None)?;
            let report = engine.validate_extracted_data(&data);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_valid {
                bail!("{} has {} validation error(s)", file.display(), report.errors.len());
            }
        }
        Command::ImportDocument {
            user,
            file,
            form_type,
            year,
            force,
        } => {
            let data = read_document(&file, form_type, year)?;
            let report = engine.validate_extracted_data(&data);
            for warning in &report.warnings {
                warn!("{warning}");
            }
            if !report.is_valid {
                if !force {
                    bail!(
                        "{} was not imported: {}",
                        file.display(),
                        report.errors.join("; ")
                    );
                }
                warn!(errors = ?report.errors, "importing despite validation errors");
            }
            let file_name = file.file_name().and_then(|name| name.to_str());
            let document = engine.save_processed_document(&user, data, file_name).await?;
            info!(
                "Imported {} as document {} ({} {})",
                file.display(),
                document.id,
                document.doc_type.as_str(),
                document.year
            );
        }
        Command::Tables => {
            println!("Tax years: {:?}", repo.list_tax_years().await?);
            println!("States: {:?}", repo.list_states().await?);
        }
    }

    Ok(())
}
