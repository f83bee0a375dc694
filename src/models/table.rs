//! Table model for materialized sheets

use super::column::{ColumnSpec, PRIMARY_KEY_COLUMN, StorageType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Longest identifier PostgreSQL keeps without truncating
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Name of the foreign-key constraint on `table.column`
///
/// `fk_<table>_<column>`, or a truncated prefix followed by a hash of both
/// names when that would exceed [`MAX_IDENTIFIER_LENGTH`] bytes.
pub fn constraint_name(table: &str, column: &str) -> String {
    let name = format!("fk_{}_{}", table, column);
    if name.len() <= MAX_IDENTIFIER_LENGTH {
        return name;
    }

    let mut hasher = Sha256::new();
    hasher.update(table.as_bytes());
    hasher.update([0u8]);
    hasher.update(column.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let suffix = &digest[..8];

    let mut end = MAX_IDENTIFIER_LENGTH - suffix.len() - 1;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}_{}", &name[..end], suffix)
}

/// Error raised when a descriptor would break its invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("table '{0}' has no columns")]
    NoColumns(String),

    #[error("first column of table '{table}' must be the primary key, found '{column}'")]
    PrimaryKeyNotFirst { table: String, column: String },

    #[error("table '{table}' declares more than one primary key column ('{column}')")]
    ExtraPrimaryKey { table: String, column: String },

    #[error("table '{table}' declares column '{column}' twice")]
    DuplicateColumn { table: String, column: String },

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
}

/// An established foreign-key constraint on a table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    /// Constraint name
    pub name: String,
    /// Referencing column in the owning table
    pub column: String,
    /// Referenced table
    pub referenced_table: String,
    /// Referenced column (always the target's primary key here)
    pub referenced_column: String,
}

impl ForeignKeyConstraint {
    /// Constraint from `table.column` to the primary key of `referenced_table`
    pub fn to_primary_key(table: &str, column: &str, referenced_table: &str) -> Self {
        Self {
            name: constraint_name(table, column),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: PRIMARY_KEY_COLUMN.to_string(),
        }
    }

    /// Whether two constraints describe the same reference, ignoring the name
    pub fn same_reference(&self, other: &ForeignKeyConstraint) -> bool {
        self.column == other.column
            && self.referenced_table == other.referenced_table
            && self.referenced_column == other.referenced_column
    }
}

/// A named, ordered set of columns whose first column is the primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<ColumnSpec>,
    foreign_keys: Vec<ForeignKeyConstraint>,
}

impl TableDescriptor {
    /// Build a descriptor, checking the primary-key and uniqueness invariants
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Result<Self, DescriptorError> {
        let name = name.into();

        let Some(first) = columns.first() else {
            return Err(DescriptorError::NoColumns(name));
        };
        if !first.primary_key {
            return Err(DescriptorError::PrimaryKeyNotFirst {
                table: name,
                column: first.name.clone(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DescriptorError::DuplicateColumn {
                    table: name,
                    column: column.name.clone(),
                });
            }
        }
        if let Some(extra) = columns.iter().skip(1).find(|c| c.primary_key) {
            return Err(DescriptorError::ExtraPrimaryKey {
                table: name,
                column: extra.name.clone(),
            });
        }

        Ok(Self {
            name,
            columns,
            foreign_keys: Vec::new(),
        })
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in source order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Established foreign keys
    pub fn foreign_keys(&self) -> &[ForeignKeyConstraint] {
        &self.foreign_keys
    }

    /// The primary key column (always the first one)
    pub fn primary_key(&self) -> &ColumnSpec {
        &self.columns[0]
    }

    /// Storage type of the primary key
    pub fn primary_key_type(&self) -> StorageType {
        self.primary_key().storage_type
    }

    /// Column at a source position
    pub fn column_at(&self, index: usize) -> Option<&ColumnSpec> {
        self.columns.get(index)
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a foreign key already occupies `column`
    pub fn has_foreign_key_on(&self, column: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.column == column)
    }

    /// Record a foreign key on an existing column
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKeyConstraint) -> Result<(), DescriptorError> {
        if self.column(&foreign_key.column).is_none() {
            return Err(DescriptorError::UnknownColumn {
                table: self.name.clone(),
                column: foreign_key.column,
            });
        }
        self.foreign_keys.push(foreign_key);
        Ok(())
    }

    /// Copy of this descriptor carrying an additional foreign key
    pub fn with_foreign_key(&self, foreign_key: ForeignKeyConstraint) -> Result<Self, DescriptorError> {
        let mut next = self.clone();
        next.add_foreign_key(foreign_key)?;
        Ok(next)
    }
}

/// An intended reference discovered from a sheet's type row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyLink {
    /// Referencing table
    pub from_table: String,
    /// Referenced table
    pub to_table: String,
    /// Position of the referencing column in `from_table`
    pub column_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::primary_key(),
            ColumnSpec::nullable("item", StorageType::Integer),
        ]
    }

    #[test]
    fn primary_key_must_come_first() {
        let err = TableDescriptor::new(
            "quest",
            vec![
                ColumnSpec::nullable("item", StorageType::Integer),
                ColumnSpec::primary_key(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::PrimaryKeyNotFirst { .. }));

        assert_eq!(
            TableDescriptor::new("quest", vec![]).unwrap_err(),
            DescriptorError::NoColumns("quest".to_string())
        );
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut cols = columns();
        cols.push(ColumnSpec::nullable("item", StorageType::String));
        let err = TableDescriptor::new("quest", cols).unwrap_err();
        assert!(matches!(err, DescriptorError::DuplicateColumn { .. }));
    }

    #[test]
    fn foreign_key_needs_existing_column() {
        let table = TableDescriptor::new("quest", columns()).unwrap();
        let linked = table
            .with_foreign_key(ForeignKeyConstraint::to_primary_key("quest", "item", "item"))
            .unwrap();
        assert!(linked.has_foreign_key_on("item"));
        assert!(!table.has_foreign_key_on("item"));

        let err = table
            .with_foreign_key(ForeignKeyConstraint::to_primary_key("quest", "npc", "npc"))
            .unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownColumn { .. }));
    }

    #[test]
    fn long_constraint_names_fit_postgres() {
        assert_eq!(constraint_name("quest", "item"), "fk_quest_item");

        let table = "housing_furniture_placement_category_transient";
        let first = constraint_name(table, "optional_item_is_hq_reward_0");
        let second = constraint_name(table, "optional_item_is_hq_reward_1");
        assert_eq!(first.len(), MAX_IDENTIFIER_LENGTH);
        assert_eq!(second.len(), MAX_IDENTIFIER_LENGTH);
        assert_ne!(first, second);
        assert!(first.starts_with("fk_housing_furniture"));
        assert_eq!(first, constraint_name(table, "optional_item_is_hq_reward_0"));
    }
}
