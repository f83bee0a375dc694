//! Foreign-key discovery and creation between materialized tables
//!
//! A capitalized declared-type token such as `Quest[0]` says the column holds
//! keys of the `Quest` sheet. Once every table exists, each such column is
//! turned into a foreign key to the target's primary key, provided a chain of
//! gates holds. A candidate failing a gate is skipped quietly; only store
//! errors are failures.

use std::collections::HashSet;
use tracing::{debug, info};

use super::IngestError;
use crate::database::SchemaStore;
use crate::database::sql::clear_dangling_sql;
use crate::models::{ForeignKeyConstraint, ForeignKeyLink, SourceFile, StorageType};
use crate::naming::{extract_reference_target, is_first_letter_uppercase, to_snake_case};

/// Why a reference candidate was not linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSkip {
    /// No sheet with the candidate's table name was discovered
    UnknownTarget(String),
    /// A table involved does not exist in the store
    MissingTable(String),
    /// The referencing table has no column at the position
    MissingColumn(usize),
    /// Column type differs from the target's primary key type
    TypeMismatch {
        column: StorageType,
        primary_key: StorageType,
    },
    /// A foreign key already occupies the column
    AlreadyLinked(String),
}

impl std::fmt::Display for LinkSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkSkip::UnknownTarget(table) => write!(f, "no sheet named '{}'", table),
            LinkSkip::MissingTable(table) => write!(f, "table '{}' does not exist", table),
            LinkSkip::MissingColumn(index) => write!(f, "no column at position {}", index),
            LinkSkip::TypeMismatch {
                column,
                primary_key,
            } => write!(f, "column is {} but primary key is {}", column, primary_key),
            LinkSkip::AlreadyLinked(column) => write!(f, "column '{}' is already linked", column),
        }
    }
}

/// Result of one link attempt that did not hit a store error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Created {
        constraint: ForeignKeyConstraint,
        /// Referencing values set to NULL beforehand
        cleared: u64,
    },
    Skipped(LinkSkip),
}

/// Positions of a type row whose token names a candidate target sheet
///
/// Yields `(position, candidate)` for every token whose extracted target
/// starts with an ASCII uppercase letter.
pub fn reference_candidates(types: &[String]) -> Vec<(usize, &str)> {
    types
        .iter()
        .enumerate()
        .filter_map(|(i, token)| extract_reference_target(token).map(|target| (i, target)))
        .filter(|(_, target)| is_first_letter_uppercase(target))
        .collect()
}

/// Establishes foreign keys between tables already in the store
pub struct ForeignKeyLinker<'a> {
    store: &'a dyn SchemaStore,
    known_tables: HashSet<String>,
}

impl<'a> ForeignKeyLinker<'a> {
    /// Linker accepting targets among `known_tables` (sanitized table names)
    pub fn new(store: &'a dyn SchemaStore, known_tables: impl IntoIterator<Item = String>) -> Self {
        Self {
            store,
            known_tables: known_tables.into_iter().collect(),
        }
    }

    /// Try every reference candidate in the type row of `from`
    ///
    /// Returns one entry per candidate, in column order.
    pub fn link_file(
        &self,
        from: &SourceFile,
        types: &[String],
    ) -> Vec<(ForeignKeyLink, Result<LinkOutcome, IngestError>)> {
        reference_candidates(types)
            .into_iter()
            .map(|(column_index, candidate)| {
                let link = ForeignKeyLink {
                    from_table: from.table_name.clone(),
                    to_table: to_snake_case(candidate),
                    column_index,
                };
                let outcome = if self.known_tables.contains(&link.to_table) {
                    self.link(&link)
                } else {
                    Ok(LinkOutcome::Skipped(LinkSkip::UnknownTarget(link.to_table.clone())))
                };

                if let Ok(LinkOutcome::Skipped(reason)) = &outcome {
                    debug!(
                        "Skipped link {}[{}] -> {}: {}",
                        link.from_table, link.column_index, link.to_table, reason
                    );
                }
                (link, outcome)
            })
            .collect()
    }

    /// Establish one link, clearing dangling references first
    pub fn link(&self, link: &ForeignKeyLink) -> Result<LinkOutcome, IngestError> {
        let skip = |reason| Ok(LinkOutcome::Skipped(reason));

        let Some(from) = self.store.get_table(&link.from_table)? else {
            return skip(LinkSkip::MissingTable(link.from_table.clone()));
        };
        let Some(to) = self.store.get_table(&link.to_table)? else {
            return skip(LinkSkip::MissingTable(link.to_table.clone()));
        };
        let Some(column) = from.column_at(link.column_index) else {
            return skip(LinkSkip::MissingColumn(link.column_index));
        };

        if column.storage_type != to.primary_key_type() {
            return skip(LinkSkip::TypeMismatch {
                column: column.storage_type,
                primary_key: to.primary_key_type(),
            });
        }
        if from.has_foreign_key_on(&column.name) {
            return skip(LinkSkip::AlreadyLinked(column.name.clone()));
        }

        let target_key = &to.primary_key().name;
        let cleared = self.store.execute(&clear_dangling_sql(
            from.name(),
            &column.name,
            to.name(),
            target_key,
        ))?;

        let mut constraint = ForeignKeyConstraint::to_primary_key(from.name(), &column.name, to.name());
        constraint.referenced_column = target_key.clone();
        let linked = from.with_foreign_key(constraint.clone())?;
        self.store.diff_and_apply(&from, &linked)?;

        info!(
            "Linked {}.{} -> {}.{} ({} dangling value(s) cleared)",
            from.name(),
            column.name,
            to.name(),
            target_key,
            cleared
        );
        Ok(LinkOutcome::Created {
            constraint,
            cleared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_reference_candidates() {
        let row = types(&["int32", "str", "Quest[0]", "Item", "[0]", "HousingPlacement", "bit&01"]);
        assert_eq!(
            reference_candidates(&row),
            vec![(2, "Quest"), (3, "Item"), (5, "HousingPlacement")]
        );
    }

    #[test]
    fn test_skip_reasons_read_well() {
        assert_eq!(
            LinkSkip::TypeMismatch {
                column: StorageType::Integer,
                primary_key: StorageType::String,
            }
            .to_string(),
            "column is integer but primary key is string(255)"
        );
        assert_eq!(
            LinkSkip::UnknownTarget("image".into()).to_string(),
            "no sheet named 'image'"
        );
    }
}
