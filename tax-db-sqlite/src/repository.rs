use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tax_core::{
    BracketSchedule, Document, DocumentType, FieldMap, NewDocument, RepositoryError,
    StateTaxInfo, TaxBracket, TaxRepository, TaxYearConfig,
};
use tracing::{debug, warn};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Maps a bare path or `:memory:` to a sqlx connection URL.
fn connection_url(connection_string: &str) -> String {
    match connection_string {
        ":memory:" | "sqlite::memory:" => "sqlite::memory:".to_string(),
        s if s.starts_with("sqlite:") => s.to_string(),
        path => format!("sqlite:{path}"),
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

impl SqliteRepository {
    /// Opens (creating if needed) the database at `connection_string`.
    ///
    /// An in-memory database lives as long as its single pooled connection.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let url = connection_url(connection_string);
        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("Invalid database location: {}", connection_string))?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        if url == "sqlite::memory:" {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", connection_string))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "seed file applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(db_err)?;
    let doc_type: String = row.try_get("doc_type").map_err(db_err)?;
    let raw_content: String = row.try_get("content").map_err(db_err)?;

    // A corrupt content blob must not make the user's other documents
    // unreadable.
    let content = serde_json::from_str::<FieldMap>(&raw_content).unwrap_or_else(|e| {
        warn!(id, error = %e, "document content is not a field map; reading as empty");
        FieldMap::new()
    });

    Ok(Document {
        id,
        user_id: row.try_get("user_id").map_err(db_err)?,
        doc_type: DocumentType::parse(&doc_type),
        year: row.try_get("year").map_err(db_err)?,
        content,
        file_name: row.try_get("file_name").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn rows_to_brackets(rows: &[SqliteRow]) -> Result<Vec<TaxBracket>, RepositoryError> {
    rows.iter()
        .map(|row| {
            Ok(TaxBracket::new(
                get_decimal(row, "min_income")?,
                get_optional_decimal(row, "max_income")?,
                get_decimal(row, "rate")?,
            ))
        })
        .collect()
}

async fn insert_brackets(
    tx: &mut Transaction<'_, Sqlite>,
    table_sql: &str,
    key: impl ToString,
    schedule: &BracketSchedule,
) -> Result<(), RepositoryError> {
    let key = key.to_string();
    for (seq, bracket) in schedule.brackets().iter().enumerate() {
        sqlx::query(table_sql)
            .bind(&key)
            .bind(seq as i64)
            .bind(decimal_to_text(bracket.min_income))
            .bind(bracket.max_income.map(decimal_to_text))
            .bind(decimal_to_text(bracket.rate))
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

#[async_trait]
impl TaxRepository for SqliteRepository {
    async fn find_documents(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, doc_type, year, content, file_name, created_at
             FROM documents
             WHERE user_id = ? AND year = ?
             ORDER BY id",
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_document).collect()
    }

    async fn insert_document(
        &self,
        document: NewDocument,
    ) -> Result<Document, RepositoryError> {
        let content = serde_json::to_string(&document.content)
            .map_err(|e| RepositoryError::Database(format!("Failed to encode content: {}", e)))?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO documents (user_id, doc_type, year, content, file_name, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&document.user_id)
        .bind(document.doc_type.as_str())
        .bind(document.year)
        .bind(content)
        .bind(&document.file_name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Document {
            id: result.last_insert_rowid(),
            user_id: document.user_id,
            doc_type: document.doc_type,
            year: document.year,
            content: document.content,
            file_name: document.file_name,
            created_at: now,
        })
    }

    async fn get_tax_year_config(
        &self,
        year: i32,
    ) -> Result<TaxYearConfig, RepositoryError> {
        let row = sqlx::query(
            "SELECT tax_year, standard_deduction, ss_wage_base, ss_tax_rate,
                    medicare_tax_rate, additional_medicare_rate,
                    additional_medicare_threshold, se_tax_rate
             FROM tax_year_config WHERE tax_year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxYearConfig {
            tax_year: row.try_get("tax_year").map_err(db_err)?,
            standard_deduction: get_decimal(&row, "standard_deduction")?,
            ss_wage_base: get_decimal(&row, "ss_wage_base")?,
            ss_tax_rate: get_decimal(&row, "ss_tax_rate")?,
            medicare_tax_rate: get_decimal(&row, "medicare_tax_rate")?,
            additional_medicare_rate: get_decimal(&row, "additional_medicare_rate")?,
            additional_medicare_threshold: get_decimal(&row, "additional_medicare_threshold")?,
            se_tax_rate: get_decimal(&row, "se_tax_rate")?,
        })
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT tax_year FROM tax_year_config ORDER BY tax_year")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get("tax_year").map_err(db_err))
            .collect()
    }

    async fn upsert_tax_year_config(
        &self,
        config: &TaxYearConfig,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_year_config (
                tax_year, standard_deduction, ss_wage_base, ss_tax_rate,
                medicare_tax_rate, additional_medicare_rate,
                additional_medicare_threshold, se_tax_rate
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tax_year) DO UPDATE SET
                standard_deduction = excluded.standard_deduction,
                ss_wage_base = excluded.ss_wage_base,
                ss_tax_rate = excluded.ss_tax_rate,
                medicare_tax_rate = excluded.medicare_tax_rate,
                additional_medicare_rate = excluded.additional_medicare_rate,
                additional_medicare_threshold = excluded.additional_medicare_threshold,
                se_tax_rate = excluded.se_tax_rate",
        )
        .bind(config.tax_year)
        .bind(decimal_to_text(config.standard_deduction))
        .bind(decimal_to_text(config.ss_wage_base))
        .bind(decimal_to_text(config.ss_tax_rate))
        .bind(decimal_to_text(config.medicare_tax_rate))
        .bind(decimal_to_text(config.additional_medicare_rate))
        .bind(decimal_to_text(config.additional_medicare_threshold))
        .bind(decimal_to_text(config.se_tax_rate))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_federal_brackets(
        &self,
        year: i32,
    ) -> Result<BracketSchedule, RepositoryError> {
        let rows = sqlx::query(
            "SELECT min_income, max_income, rate
             FROM federal_brackets
             WHERE tax_year = ?
             ORDER BY seq",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        if rows.is_empty() {
            return Err(RepositoryError::NotFound);
        }

        BracketSchedule::new(rows_to_brackets(&rows)?)
            .map_err(|e| RepositoryError::InvalidTable(format!("federal brackets for {}: {}", year, e)))
    }

    async fn replace_federal_brackets(
        &self,
        year: i32,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM federal_brackets WHERE tax_year = ?")
            .bind(year)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        insert_brackets(
            &mut tx,
            "INSERT INTO federal_brackets (tax_year, seq, min_income, max_income, rate)
             VALUES (?, ?, ?, ?, ?)",
            year,
            schedule,
        )
        .await?;

        tx.commit().await.map_err(db_err)
    }

    async fn get_state_tax_info(
        &self,
        state_code: &str,
    ) -> Result<StateTaxInfo, RepositoryError> {
        let code = StateTaxInfo::normalize_code(state_code);

        let row = sqlx::query("SELECT state_code, state_name FROM state_tax_info WHERE state_code = ?")
            .bind(&code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        let rows = sqlx::query(
            "SELECT min_income, max_income, rate
             FROM state_brackets
             WHERE state_code = ?
             ORDER BY seq",
        )
        .bind(&code)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let brackets = BracketSchedule::new(rows_to_brackets(&rows)?)
            .map_err(|e| RepositoryError::InvalidTable(format!("state brackets for {}: {}", code, e)))?;

        Ok(StateTaxInfo {
            state_code: row.try_get("state_code").map_err(db_err)?,
            state_name: row.try_get("state_name").map_err(db_err)?,
            brackets,
        })
    }

    async fn list_states(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT state_code FROM state_tax_info ORDER BY state_code")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get("state_code").map_err(db_err))
            .collect()
    }

    async fn upsert_state_tax_info(
        &self,
        info: &StateTaxInfo,
    ) -> Result<(), RepositoryError> {
        let code = StateTaxInfo::normalize_code(&info.state_code);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO state_tax_info (state_code, state_name) VALUES (?, ?)
             ON CONFLICT(state_code) DO UPDATE SET state_name = excluded.state_name",
        )
        .bind(&code)
        .bind(&info.state_name)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("DELETE FROM state_brackets WHERE state_code = ?")
            .bind(&code)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        insert_brackets(
            &mut tx,
            "INSERT INTO state_brackets (state_code, seq, min_income, max_income, rate)
             VALUES (?, ?, ?, ?, ?)",
            &code,
            &info.brackets,
        )
        .await?;

        tx.commit().await.map_err(db_err)
    }
}
