//! Relational store abstraction
//!
//! The ingestion pipeline only talks to a [`SchemaStore`]: create a table,
//! read its definition back, apply a foreign-key diff, run a statement and
//! insert rows. Two backends implement it:
//! - SQLite: embedded file or in-memory database (default)
//! - PostgreSQL: server deployments

use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "sqlite-backend")]
pub mod sqlite;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod config;
pub mod diff;
pub mod sql;

#[cfg(feature = "sqlite-backend")]
pub use self::sqlite::SqliteStore;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresStore;

pub use config::{IngestConfig, StoreBackendType, sample_config};
pub use diff::TableDiff;

use crate::models::{DescriptorError, TableDescriptor, TypedValue};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or reach the database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Table creation or alteration failed
    #[error("Schema operation failed: {0}")]
    SchemaFailed(String),

    /// Existing rows violate a constraint being added
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Requested change cannot be expressed as an alteration
    #[error("Unsupported alteration: {0}")]
    UnsupportedAlteration(String),

    /// A stored table does not map onto a table descriptor
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<DescriptorError> for StoreError {
    fn from(err: DescriptorError) -> Self {
        StoreError::InvalidSchema(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    pub rows_affected: Option<u64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: 0,
        }
    }

    /// Result of a statement that returns no rows
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: Some(rows_affected),
            execution_time_ms: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Relational schema and data operations used by the ingestion pipeline
///
/// All methods take `&self`; backends guard their connection internally.
/// The trait is object safe so the pipeline can hold a `Box<dyn SchemaStore>`
/// chosen from configuration at runtime.
pub trait SchemaStore {
    /// Drop `table` if it exists, then create it
    fn create_or_replace(&self, table: &TableDescriptor) -> StoreResult<()>;

    /// Read a table definition back, `None` when the table does not exist
    fn get_table(&self, name: &str) -> StoreResult<Option<TableDescriptor>>;

    /// Apply a foreign-key diff to an existing table
    fn alter_table(&self, diff: &TableDiff) -> StoreResult<()>;

    /// Diff two descriptors of the same table and apply the result
    ///
    /// Returns `false` when there was nothing to apply.
    fn diff_and_apply(&self, before: &TableDescriptor, after: &TableDescriptor) -> StoreResult<bool> {
        match TableDiff::between(before, after)? {
            Some(diff) => {
                self.alter_table(&diff)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Execute a statement, returning the number of affected rows
    fn execute(&self, sql: &str) -> StoreResult<u64>;

    /// Insert one row; `values` are in column order
    fn insert(&self, table: &TableDescriptor, values: &[TypedValue]) -> StoreResult<u64>;

    /// Insert rows in order, stopping at the first failure
    fn insert_rows(&self, table: &TableDescriptor, rows: &[Vec<TypedValue>]) -> StoreResult<u64> {
        let mut inserted = 0;
        for row in rows {
            inserted += self.insert(table, row)?;
        }
        Ok(inserted)
    }

    /// Run an arbitrary query and collect its rows as JSON objects
    fn query(&self, sql: &str) -> StoreResult<QueryResult>;

    /// Backend type name ("sqlite" or "postgres")
    fn backend_type(&self) -> &'static str;
}

/// Open the store described by `config`
///
/// Relative SQLite paths resolve against `root`, the input directory.
pub fn open_store(config: &IngestConfig, root: &Path) -> StoreResult<Box<dyn SchemaStore>> {
    match config.database.backend {
        StoreBackendType::Sqlite => open_sqlite(config, root),
        StoreBackendType::Postgres => open_postgres(config),
    }
}

#[cfg(feature = "sqlite-backend")]
fn open_sqlite(config: &IngestConfig, root: &Path) -> StoreResult<Box<dyn SchemaStore>> {
    let path = config.sqlite_path(root);
    tracing::debug!("Opening SQLite store at {}", path.display());
    Ok(Box::new(SqliteStore::new(path)?))
}

#[cfg(not(feature = "sqlite-backend"))]
fn open_sqlite(_config: &IngestConfig, _root: &Path) -> StoreResult<Box<dyn SchemaStore>> {
    Err(StoreError::ConfigError(
        "SQLite backend not available. Rebuild with --features sqlite-backend".to_string(),
    ))
}

#[cfg(feature = "postgres-backend")]
fn open_postgres(config: &IngestConfig) -> StoreResult<Box<dyn SchemaStore>> {
    let connection_string = config.postgres_connection_string().ok_or_else(|| {
        StoreError::ConfigError(
            "PostgreSQL backend selected but no connection string configured".to_string(),
        )
    })?;
    Ok(Box::new(PostgresStore::new(connection_string)?))
}

#[cfg(not(feature = "postgres-backend"))]
fn open_postgres(_config: &IngestConfig) -> StoreResult<Box<dyn SchemaStore>> {
    Err(StoreError::ConfigError(
        "PostgreSQL backend not available. Rebuild with --features postgres-backend".to_string(),
    ))
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    if result.columns.is_empty()
        && let Some(affected) = result.rows_affected
    {
        return format!("({} rows affected)", affected);
    }

    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => format_as_table(result),
    }
}

/// Display text of one cell; NULL renders as `null` in tables and empty in CSV
fn cell_text(row: &QueryRow, column: &str, null: &str) -> String {
    match row.get(column) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => null.to_string(),
        Some(other) => other.to_string(),
    }
}

fn format_as_csv(result: &QueryResult) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut records = Vec::with_capacity(result.rows.len() + 1);
    records.push(result.columns.clone());
    for row in &result.rows {
        records.push(
            result
                .columns
                .iter()
                .map(|col| cell_text(row, col, ""))
                .collect(),
        );
    }

    for record in &records {
        if writer.write_record(record).is_err() {
            return String::new();
        }
    }

    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|col| cell_text(row, col, "null"))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:width$}", value, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = Vec::with_capacity(cells.len() + 3);
    lines.push(render(&result.columns));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    lines.extend(cells.iter().map(|row| render(row)));
    lines.push(format!("({} rows)", result.row_count()));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_str("yaml").is_err());
    }

    #[test]
    fn test_format_as_table() {
        let result = QueryResult::new(
            vec!["pk".to_string(), "name".to_string()],
            vec![
                serde_json::json!({"pk": 1, "name": "Aetheryte"}),
                serde_json::json!({"pk": 2, "name": null}),
            ],
        );

        let output = format_as_table(&result);
        assert!(output.starts_with("pk | name"));
        assert!(output.contains("Aetheryte"));
        assert!(output.contains("null"));
        assert!(output.ends_with("(2 rows)"));
        assert_eq!(format_as_table(&QueryResult::new(vec![], vec![])), "(0 rows)");
    }

    #[test]
    fn test_format_as_csv_quotes_commas() {
        let result = QueryResult::new(
            vec!["pk".to_string(), "description".to_string()],
            vec![
                serde_json::json!({"pk": 1, "description": "simple"}),
                serde_json::json!({"pk": 2, "description": "has, comma"}),
                serde_json::json!({"pk": 3, "description": null}),
            ],
        );

        let output = format_as_csv(&result);
        assert!(output.starts_with("pk,description\n"));
        assert!(output.contains("1,simple\n"));
        assert!(output.contains("2,\"has, comma\"\n"));
        assert!(output.contains("3,\n"));
    }

    #[test]
    fn test_affected_rows_summary() {
        let result = QueryResult::affected(3);
        assert_eq!(
            format_query_result(&result, OutputFormat::Table),
            "(3 rows affected)"
        );
    }

    #[test]
    fn test_descriptor_error_maps_to_invalid_schema() {
        let err: StoreError = DescriptorError::NoColumns("quest".to_string()).into();
        assert!(matches!(err, StoreError::InvalidSchema(_)));
    }
}
