//! SQL query CLI command
//!
//! Runs a statement against the store configured for an input directory.

use std::path::PathBuf;

use super::load_config;
use crate::cli::error::CliError;
use crate::database::{OutputFormat, format_query_result, open_store};

/// Query command arguments
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// SQL query to execute
    pub sql: String,
    /// Input directory whose store is queried
    pub input: PathBuf,
    /// Output format
    pub format: String,
    /// Backend override
    pub backend: Option<String>,
    /// SQLite path or PostgreSQL connection string override
    pub database: Option<String>,
}

/// Execute a SQL query and return the formatted result
pub fn handle_query(args: &QueryArgs) -> Result<String, CliError> {
    let output_format: OutputFormat = args
        .format
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;

    let config = load_config(&args.input, args.backend.as_deref(), args.database.as_deref())?;
    let store = open_store(&config, &args.input)?;

    let result = store.query(&args.sql)?;
    Ok(format_query_result(&result, output_format))
}

#[cfg(all(test, feature = "sqlite-backend"))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &TempDir, sql: &str, format: &str) -> QueryArgs {
        QueryArgs {
            sql: sql.to_string(),
            input: dir.path().to_path_buf(),
            format: format.to_string(),
            backend: None,
            database: Some(dir.path().join("query.sqlite").display().to_string()),
        }
    }

    #[test]
    fn test_query_formats_rows() {
        let dir = TempDir::new().unwrap();
        handle_query(&args(&dir, "CREATE TABLE t (pk INTEGER PRIMARY KEY, name VARCHAR(255))", "table")).unwrap();
        handle_query(&args(&dir, "INSERT INTO t VALUES (1, 'One')", "table")).unwrap();

        let csv = handle_query(&args(&dir, "SELECT pk, name FROM t", "csv")).unwrap();
        assert_eq!(csv.lines().collect::<Vec<_>>(), vec!["pk,name", "1,One"]);
    }

    #[test]
    fn test_unknown_format() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            handle_query(&args(&dir, "SELECT 1", "xml")),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
