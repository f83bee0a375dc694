//! SQLite store implementation
//!
//! Embedded store used by default. Foreign-key enforcement stays off so a
//! rerun can drop and recreate tables that other tables reference; every
//! constraint is instead verified once, when it is added.

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::sql::{
    Dialect, column_list, create_table_sql, drop_table_sql, insert_sql, parse_column_type,
    quote_ident,
};
use super::{QueryResult, SchemaStore, StoreError, StoreResult, TableDiff};
use crate::models::{
    ColumnSpec, ForeignKeyConstraint, PRIMARY_KEY_COLUMN, TableDescriptor, TypedValue, constraint_name,
};

/// Prefix of the shadow table used while a table is rebuilt
const REBUILD_PREFIX: &str = "__rebuild_";

/// SQLite store
///
/// Supports both file-based persistence and in-memory mode.
pub struct SqliteStore {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// SQLite connection (wrapped in Mutex for thread safety)
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a file-based database
    pub fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = Connection::open(&path).map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to open SQLite database: {}", e))
        })?;

        Self::configure(&connection)?;
        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory database
    ///
    /// Useful for testing; the contents are gone once the store is dropped.
    pub fn in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to create in-memory SQLite: {}", e))
        })?;

        Self::configure(&connection)?;
        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn configure(connection: &Connection) -> StoreResult<()> {
        connection
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .map_err(|e| StoreError::ConnectionFailed(format!("Failed to configure SQLite: {}", e)))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StoreError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    fn table_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .map_err(|e| StoreError::QueryFailed(format!("Table lookup failed: {}", e)))
    }

    /// Read a table definition through the schema pragmas
    fn read_table(conn: &Connection, name: &str) -> StoreResult<Option<TableDescriptor>> {
        if !Self::table_exists(conn, name)? {
            return Ok(None);
        }

        let query_err = |e: rusqlite::Error| StoreError::QueryFailed(format!("Schema read failed: {}", e));

        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(name)))
            .map_err(query_err)?;
        let raw_columns = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>("name")?,
                    row.get::<_, String>("type")?,
                    row.get::<_, i64>("notnull")?,
                    row.get::<_, i64>("pk")?,
                ))
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        let mut columns = Vec::with_capacity(raw_columns.len());
        for (column, declared, notnull, pk) in raw_columns {
            let storage_type = parse_column_type(&declared).ok_or_else(|| {
                StoreError::InvalidSchema(format!(
                    "column '{}.{}' has unsupported type '{}'",
                    name, column, declared
                ))
            })?;
            columns.push(ColumnSpec {
                name: column,
                storage_type,
                nullable: notnull == 0 && pk == 0,
                primary_key: pk > 0,
            });
        }

        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({})", quote_ident(name)))
            .map_err(query_err)?;
        let mut foreign_keys = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>("from")?,
                    row.get::<_, String>("table")?,
                    row.get::<_, Option<String>>("to")?,
                ))
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        // pragma order is unspecified; keep source column order
        foreign_keys.sort_by_key(|(from, _, _)| columns.iter().position(|c| &c.name == from));

        let mut table = TableDescriptor::new(name, columns)?;
        for (from, referenced_table, to) in foreign_keys {
            table.add_foreign_key(ForeignKeyConstraint {
                name: constraint_name(name, &from),
                column: from,
                referenced_table,
                referenced_column: to.unwrap_or_else(|| PRIMARY_KEY_COLUMN.to_string()),
            })?;
        }

        Ok(Some(table))
    }

    /// Number of rows of `table` violating its foreign keys
    fn count_violations(conn: &Connection, table: &str) -> StoreResult<usize> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_check({})", quote_ident(table)))
            .map_err(|e| StoreError::QueryFailed(format!("Foreign key check failed: {}", e)))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| StoreError::QueryFailed(format!("Foreign key check failed: {}", e)))?;

        let mut violations = 0;
        while rows
            .next()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?
            .is_some()
        {
            violations += 1;
        }
        Ok(violations)
    }

    /// Parameter for one cell of `column`
    fn bind_value(column: Option<&ColumnSpec>, value: &TypedValue) -> Value {
        match value {
            TypedValue::Null => Value::Null,
            TypedValue::Boolean(b) => Value::Integer(i64::from(*b)),
            TypedValue::Integer(n) => Value::Integer(*n),
            TypedValue::Key(s) => {
                let textual = column.is_some_and(|c| c.storage_type.is_variable_length());
                match s.trim().parse::<i64>() {
                    Ok(n) if !textual => Value::Integer(n),
                    _ => Value::Text(s.clone()),
                }
            }
            TypedValue::Text(s) => Value::Text(s.clone()),
        }
    }

    fn bind_row(table: &TableDescriptor, values: &[TypedValue]) -> Vec<Value> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| Self::bind_value(table.column_at(i), value))
            .collect()
    }

    fn value_ref_to_json(value: ValueRef<'_>) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
            ValueRef::Blob(bytes) => serde_json::Value::String(format!("<{} bytes>", bytes.len())),
        }
    }
}

impl SchemaStore for SqliteStore {
    fn create_or_replace(&self, table: &TableDescriptor) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let schema_err =
            |e: rusqlite::Error| StoreError::SchemaFailed(format!("Create table '{}' failed: {}", table.name(), e));

        let tx = conn.transaction().map_err(schema_err)?;
        tx.execute(&drop_table_sql(Dialect::Sqlite, table.name()), [])
            .map_err(schema_err)?;
        tx.execute(&create_table_sql(table.name(), table), [])
            .map_err(schema_err)?;
        tx.commit().map_err(schema_err)
    }

    fn get_table(&self, name: &str) -> StoreResult<Option<TableDescriptor>> {
        let conn = self.lock()?;
        Self::read_table(&conn, name)
    }

    /// Rebuild the table with its new constraint set
    ///
    /// SQLite cannot add a foreign key to an existing table, so the table is
    /// copied into a shadow table declaring the constraints, the original is
    /// dropped and the shadow renamed. The new constraints are checked before
    /// committing.
    fn alter_table(&self, diff: &TableDiff) -> StoreResult<()> {
        let mut conn = self.lock()?;

        let current = Self::read_table(&conn, &diff.table)?.ok_or_else(|| {
            StoreError::SchemaFailed(format!("Table '{}' does not exist", diff.table))
        })?;
        let mut next = TableDescriptor::new(current.name(), current.columns().to_vec())?;
        for foreign_key in diff.apply_to(&current) {
            next.add_foreign_key(foreign_key)?;
        }

        let shadow = format!("{}{}", REBUILD_PREFIX, diff.table);
        let columns = column_list(&next);
        let rebuild = format!(
            "{create};\nINSERT INTO {shadow} ({columns}) SELECT {columns} FROM {table};\nDROP TABLE {table};\nALTER TABLE {shadow} RENAME TO {table};",
            create = create_table_sql(&shadow, &next),
            shadow = quote_ident(&shadow),
            table = quote_ident(&diff.table),
        );

        let schema_err =
            |e: rusqlite::Error| StoreError::SchemaFailed(format!("Alter table '{}' failed: {}", diff.table, e));
        let tx = conn.transaction().map_err(schema_err)?;
        tx.execute_batch(&rebuild).map_err(schema_err)?;

        let violations = Self::count_violations(&tx, &diff.table)?;
        if violations > 0 {
            // dropping the transaction rolls the rebuild back
            return Err(StoreError::ConstraintViolation(format!(
                "{} row(s) of '{}' violate the new foreign key(s)",
                violations, diff.table
            )));
        }

        tx.commit().map_err(schema_err)
    }

    fn execute(&self, sql: &str) -> StoreResult<u64> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map(|n| n as u64)
            .map_err(|e| StoreError::QueryFailed(format!("Execute failed: {}", e)))
    }

    fn insert(&self, table: &TableDescriptor, values: &[TypedValue]) -> StoreResult<u64> {
        let conn = self.lock()?;
        let insert_err = |e: rusqlite::Error| {
            StoreError::QueryFailed(format!("Insert into '{}' failed: {}", table.name(), e))
        };

        let mut stmt = conn
            .prepare_cached(&insert_sql(Dialect::Sqlite, table))
            .map_err(insert_err)?;
        stmt.execute(params_from_iter(Self::bind_row(table, values)))
            .map(|n| n as u64)
            .map_err(insert_err)
    }

    /// Insert all rows in one transaction; nothing is kept if any row fails
    fn insert_rows(&self, table: &TableDescriptor, rows: &[Vec<TypedValue>]) -> StoreResult<u64> {
        let mut conn = self.lock()?;
        let insert_err = |e: rusqlite::Error| {
            StoreError::QueryFailed(format!("Insert into '{}' failed: {}", table.name(), e))
        };

        let tx = conn.transaction().map_err(insert_err)?;
        let mut inserted = 0u64;
        {
            let mut stmt = tx
                .prepare_cached(&insert_sql(Dialect::Sqlite, table))
                .map_err(insert_err)?;
            for (index, row) in rows.iter().enumerate() {
                inserted += stmt
                    .execute(params_from_iter(Self::bind_row(table, row)))
                    .map_err(|e| {
                        StoreError::QueryFailed(format!(
                            "Insert into '{}' failed at row {}: {}",
                            table.name(),
                            index + 1,
                            e
                        ))
                    })? as u64;
            }
        }
        tx.commit().map_err(insert_err)?;

        Ok(inserted)
    }

    fn query(&self, sql: &str) -> StoreResult<QueryResult> {
        let start = std::time::Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        if columns.is_empty() {
            let affected = stmt
                .execute([])
                .map_err(|e| StoreError::QueryFailed(format!("Execute failed: {}", e)))?;
            let mut result = QueryResult::affected(affected as u64);
            result.execution_time_ms = start.elapsed().as_millis() as u64;
            return Ok(result);
        }

        let mut result_rows = stmt
            .query([])
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?;

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            let mut map = serde_json::Map::new();
            for (i, column) in columns.iter().enumerate() {
                let value = row
                    .get_ref(i)
                    .map(Self::value_ref_to_json)
                    .unwrap_or(serde_json::Value::Null);
                map.insert(column.clone(), value);
            }
            rows.push(serde_json::Value::Object(map));
        }

        Ok(QueryResult {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}
