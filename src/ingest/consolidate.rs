//! Sub-table consolidation
//!
//! A subdirectory holds many small sheets of the same `(key, slot 1, slot 2)`
//! shape. Instead of one table each, their rows are merged into a single
//! `<directory>_<suffix>` table where every row carries the stem of the file
//! it came from.

use tracing::info;

use super::IngestError;
use super::reader::TabularReader;
use crate::database::SchemaStore;
use crate::database::config::DEFAULT_SUB_TABLE_SUFFIX;
use crate::models::{ColumnSpec, ConsolidatedRecord, SourceFile, StorageType, TableDescriptor};
use crate::naming::to_snake_case;

/// Capacity of the second value slot
pub const SECOND_SLOT_LENGTH: u32 = 4096;

/// Header rows every member file starts with
const MEMBER_HEADER_ROWS: usize = 2;

/// Descriptor of a consolidated sub-table named `name`
pub fn sub_table_descriptor(name: &str) -> Result<TableDescriptor, IngestError> {
    Ok(TableDescriptor::new(
        name,
        vec![
            ColumnSpec::primary_key(),
            ColumnSpec::nullable("reference_id", StorageType::Integer),
            ColumnSpec::nullable("reference_table", StorageType::String),
            ColumnSpec::nullable("column1", StorageType::String),
            ColumnSpec::nullable("column2", StorageType::SizedString(SECOND_SLOT_LENGTH)),
        ],
    )?)
}

/// Outcome of consolidating one subdirectory
#[derive(Debug)]
pub struct Consolidation {
    /// Name of the consolidated table
    pub table: String,
    /// Members that could not be read; the rest were still consolidated
    pub member_failures: Vec<(SourceFile, IngestError)>,
    /// Rows inserted, or why the table could not be built
    pub result: Result<u64, IngestError>,
}

/// Merges the member files of a subdirectory into one table
pub struct SubTableConsolidator<'a> {
    store: &'a dyn SchemaStore,
    reader: &'a dyn TabularReader,
    suffix: String,
}

impl<'a> SubTableConsolidator<'a> {
    pub fn new(store: &'a dyn SchemaStore, reader: &'a dyn TabularReader) -> Self {
        Self {
            store,
            reader,
            suffix: DEFAULT_SUB_TABLE_SUFFIX.to_string(),
        }
    }

    /// Use `suffix` instead of the default table name suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Table name for a subdirectory
    pub fn table_name(&self, directory_name: &str) -> String {
        format!("{}_{}", to_snake_case(directory_name), self.suffix)
    }

    /// Read every member and number the rows, in member order
    ///
    /// Surrogate keys start at 1 and have no gaps across members.
    pub fn collect_records(&self, members: &[SourceFile]) -> (Vec<ConsolidatedRecord>, Vec<(SourceFile, IngestError)>) {
        let mut records = Vec::new();
        let mut failures = Vec::new();

        for member in members {
            let rows = match self.reader.read_rows(&member.path) {
                Ok(rows) => rows,
                Err(e) => {
                    failures.push((member.clone(), e));
                    continue;
                }
            };

            for row in rows.into_iter().skip(MEMBER_HEADER_ROWS) {
                let mut cells = row.into_iter();
                let mut next = || cells.next().unwrap_or_default();
                let (origin_key, slot_1, slot_2) = (next(), next(), next());

                records.push(ConsolidatedRecord {
                    surrogate_key: records.len() as i64 + 1,
                    origin_key,
                    origin_file: member.name.clone(),
                    slot_1,
                    slot_2,
                });
            }
        }

        (records, failures)
    }

    /// Recreate the sub-table for `directory_name` from `members`
    pub fn consolidate(&self, directory_name: &str, members: &[SourceFile]) -> Consolidation {
        let table = self.table_name(directory_name);
        let (records, member_failures) = self.collect_records(members);

        let result = if records.is_empty() {
            Err(IngestError::EmptySubTable { table: table.clone() })
        } else {
            self.persist(&table, records)
        };

        if let Ok(rows) = &result {
            info!(
                "Consolidated {} file(s) from '{}' into '{}' ({} rows)",
                members.len() - member_failures.len(),
                directory_name,
                table,
                rows
            );
        }

        Consolidation {
            table,
            member_failures,
            result,
        }
    }

    fn persist(&self, table: &str, records: Vec<ConsolidatedRecord>) -> Result<u64, IngestError> {
        let descriptor = sub_table_descriptor(table)?;
        let rows: Vec<_> = records.into_iter().map(ConsolidatedRecord::into_values).collect();

        self.store.create_or_replace(&descriptor)?;
        Ok(self.store.insert_rows(&descriptor, &rows)?)
    }
}
