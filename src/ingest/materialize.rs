//! Table materialization for one sheet
//!
//! Building a table is split in two: [`PendingTable::build`] is a pure step
//! that turns a [`Sheet`] into a descriptor plus coerced rows, and
//! [`TableMaterializer`] persists the result. Nothing survives between files.

use std::path::Path;
use tracing::info;

use super::IngestError;
use crate::database::SchemaStore;
use crate::inference::{coerce_value, infer_column, is_fraction};
use crate::models::{DEFAULT_STRING_LENGTH, SourceFile, StorageType, TableDescriptor, TypedValue};
use crate::naming::{KEY_LABEL, sanitize_row};

/// Decoded sheet: name row, type row and data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Raw column labels
    pub names: Vec<String>,
    /// Raw declared-type tokens
    pub types: Vec<String>,
    /// Data rows as read
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Split rows read from `path` into the two header rows and data
    pub fn from_rows(path: &Path, rows: Vec<Vec<String>>) -> Result<Self, IngestError> {
        let mut rows = rows.into_iter();
        let names = rows.next().ok_or_else(|| IngestError::MissingHeader {
            path: path.to_path_buf(),
            row: "column name",
        })?;
        let types = rows.next().ok_or_else(|| IngestError::MissingHeader {
            path: path.to_path_buf(),
            row: "column type",
        })?;

        Ok(Self {
            names,
            types,
            rows: rows.collect(),
        })
    }

    /// Number of columns, as given by the name row
    pub fn column_count(&self) -> usize {
        self.names.len()
    }
}

/// A table ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTable {
    pub descriptor: TableDescriptor,
    /// Coerced rows, each exactly as long as the column list
    pub rows: Vec<Vec<TypedValue>>,
}

impl PendingTable {
    /// Infer the table definition of `sheet` and coerce its rows
    ///
    /// Rows are padded with empty cells or truncated to the column count.
    /// The primary key turns into a string column when any key looks like a
    /// decimal fraction, and all string columns are widened together when a
    /// value is longer than the default capacity.
    pub fn build(table_name: &str, sheet: &Sheet) -> Result<Self, IngestError> {
        let column_count = sheet.column_count();

        // position 0 is the key whatever its label says
        let labels: Vec<&str> = sheet
            .names
            .iter()
            .enumerate()
            .map(|(i, label)| if i == 0 { KEY_LABEL } else { label.as_str() })
            .collect();
        let names = sanitize_row(&labels);

        let mut columns = (0..column_count)
            .map(|i| {
                let token = sheet.types.get(i).map(String::as_str).unwrap_or_default();
                infer_column(&names, i, token)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<Vec<TypedValue>> = sheet
            .rows
            .iter()
            .map(|raw| {
                (0..column_count)
                    .map(|i| coerce_value(i, raw.get(i).map(String::as_str).unwrap_or_default()))
                    .collect()
            })
            .collect();

        if column_count > 1
            && let Some(pk) = columns.first_mut()
            && sheet
                .rows
                .iter()
                .any(|raw| raw.first().is_some_and(|key| is_fraction(key)))
        {
            pk.storage_type = StorageType::String;
        }

        let max_length = rows
            .iter()
            .flat_map(|row| row.iter().map(TypedValue::literal_len))
            .max()
            .unwrap_or(0);
        if max_length > DEFAULT_STRING_LENGTH as usize {
            let widened = u32::try_from(max_length + 1).unwrap_or(u32::MAX);
            for column in &mut columns {
                column.storage_type = column.storage_type.with_length(widened);
            }
        }

        Ok(Self {
            descriptor: TableDescriptor::new(table_name, columns)?,
            rows,
        })
    }
}

/// Summary of one persisted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedTable {
    pub name: String,
    pub rows_inserted: u64,
}

/// Creates and fills one table per sheet
pub struct TableMaterializer<'a> {
    store: &'a dyn SchemaStore,
}

impl<'a> TableMaterializer<'a> {
    pub fn new(store: &'a dyn SchemaStore) -> Self {
        Self { store }
    }

    /// Drop and recreate the table for `file`, then insert every row in order
    ///
    /// The first rejected insert aborts the file.
    pub fn materialize(&self, file: &SourceFile, sheet: &Sheet) -> Result<MaterializedTable, IngestError> {
        let pending = PendingTable::build(&file.table_name, sheet)?;

        self.store.create_or_replace(&pending.descriptor)?;
        let rows_inserted = self.store.insert_rows(&pending.descriptor, &pending.rows)?;

        info!(
            "Materialized {} as '{}' ({} columns, {} rows)",
            file.name,
            pending.descriptor.name(),
            pending.descriptor.columns().len(),
            rows_inserted
        );

        Ok(MaterializedTable {
            name: pending.descriptor.name().to_string(),
            rows_inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnSpec;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sheet(names: &[&str], types: &[&str], rows: &[&[&str]]) -> Sheet {
        Sheet {
            names: row(names),
            types: row(types),
            rows: rows.iter().map(|r| row(r)).collect(),
        }
    }

    #[test]
    fn test_sheet_needs_both_header_rows() {
        let err = Sheet::from_rows(Path::new("Quest.csv"), vec![row(&["#", "Name"])]).unwrap_err();
        assert!(matches!(err, IngestError::MissingHeader { row: "column type", .. }));

        let ok = Sheet::from_rows(
            Path::new("Quest.csv"),
            vec![row(&["#", "Name"]), row(&["int32", "str"])],
        )
        .unwrap();
        assert!(ok.rows.is_empty());
    }

    #[test]
    fn test_build_infers_columns_and_pads_rows() {
        let pending = PendingTable::build(
            "quest",
            &sheet(
                &["#", "Name", "Item[0]", ""],
                &["int32", "str", "Item", "bool"],
                &[&["1", "Welcome", "5"], &["2", "Back", "0", "True", "extra"]],
            ),
        )
        .unwrap();

        let names: Vec<_> = pending.descriptor.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pk", "name", "item_0", "column_3"]);
        assert_eq!(pending.descriptor.columns()[2].storage_type, StorageType::Integer);
        assert_eq!(pending.descriptor.columns()[3].storage_type, StorageType::Boolean);

        assert_eq!(
            pending.rows[0],
            vec![
                TypedValue::Key("1".into()),
                TypedValue::Text("Welcome".into()),
                TypedValue::Integer(5),
                TypedValue::Text(String::new()),
            ]
        );
        assert_eq!(pending.rows[1][2], TypedValue::Null);
        assert_eq!(pending.rows[1][3], TypedValue::Boolean(true));
        assert_eq!(pending.rows[1].len(), 4);
    }

    #[test]
    fn test_fractional_keys_widen_primary_key() {
        let pending = PendingTable::build(
            "ratio",
            &sheet(&["#", "Name"], &["int32", "str"], &[&["1"], &["1.5", "half"]]),
        )
        .unwrap();
        assert_eq!(pending.descriptor.primary_key_type(), StorageType::String);

        let single = PendingTable::build("ratio", &sheet(&["#"], &["int32"], &[&["1.5"]])).unwrap();
        assert_eq!(single.descriptor.primary_key_type(), StorageType::Integer);
    }

    #[test]
    fn test_long_values_widen_string_columns() {
        let long = "x".repeat(300);
        let pending = PendingTable::build(
            "text",
            &sheet(
                &["#", "Name", "Note", "Count"],
                &["int32", "str", "str", "int32"],
                &[&["1", long.as_str(), "short", "3"]],
            ),
        )
        .unwrap();

        let columns = pending.descriptor.columns();
        assert_eq!(columns[1].storage_type, StorageType::SizedString(301));
        assert_eq!(columns[2].storage_type, StorageType::SizedString(301));
        assert_eq!(columns[3].storage_type, StorageType::Integer);
        assert_eq!(columns[0], ColumnSpec::primary_key());
    }

    #[test]
    fn test_unknown_type_fails_the_sheet() {
        let err = PendingTable::build("bad", &sheet(&["#", "Rate"], &["int32", "float"], &[])).unwrap_err();
        assert!(matches!(err, IngestError::UnknownTypeToken { .. }));
    }

    #[test]
    fn test_duplicate_labels_stay_distinct() {
        let pending = PendingTable::build(
            "dup",
            &sheet(&["#", "Name", "Name", "PK"], &["int32", "str", "str", "int32"], &[]),
        )
        .unwrap();
        let names: Vec<_> = pending.descriptor.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pk", "name", "name_2", "pk_3"]);
    }
}
