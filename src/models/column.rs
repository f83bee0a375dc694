//! Column model for materialized sheets

use serde::{Deserialize, Serialize};

/// Capacity of a plain string column when no widening applies
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Name of the primary key column of every materialized table
pub const PRIMARY_KEY_COLUMN: &str = "pk";

/// Abstract storage type of a column
///
/// Independent of the engine that ends up holding the table; each
/// [`SchemaStore`](crate::database::SchemaStore) maps it to its own type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Boolean
    Boolean,
    /// Variable-length string with the default capacity
    String,
    /// Variable-length string with an explicit capacity
    SizedString(u32),
}

impl StorageType {
    /// String type holding at most `length` characters
    ///
    /// The default capacity collapses to [`StorageType::String`] so a type read
    /// back from a store compares equal to the one it was created from.
    pub fn string_with_length(length: u32) -> Self {
        if length == DEFAULT_STRING_LENGTH {
            StorageType::String
        } else {
            StorageType::SizedString(length)
        }
    }

    /// Whether the declared capacity of this type can be widened
    pub fn is_variable_length(&self) -> bool {
        matches!(self, StorageType::String | StorageType::SizedString(_))
    }

    /// Declared capacity for string types
    pub fn length(&self) -> Option<u32> {
        match self {
            StorageType::String => Some(DEFAULT_STRING_LENGTH),
            StorageType::SizedString(length) => Some(*length),
            _ => None,
        }
    }

    /// Same type with its capacity set to `length`; fixed-width types are unchanged
    pub fn with_length(self, length: u32) -> Self {
        if self.is_variable_length() {
            StorageType::string_with_length(length)
        } else {
            self
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Integer => write!(f, "integer"),
            StorageType::BigInt => write!(f, "bigint"),
            StorageType::Boolean => write!(f, "boolean"),
            StorageType::String => write!(f, "string({})", DEFAULT_STRING_LENGTH),
            StorageType::SizedString(length) => write!(f, "string({})", length),
        }
    }
}

/// One column of a materialized table
///
/// # Example
///
/// ```rust
/// use sheet_ingest::models::{ColumnSpec, StorageType};
///
/// let pk = ColumnSpec::primary_key();
/// assert!(pk.primary_key && !pk.nullable);
///
/// let name = ColumnSpec::nullable("name", StorageType::String);
/// assert!(name.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Sanitized column name
    pub name: String,
    /// Storage type
    pub storage_type: StorageType,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Whether this is the table's primary key
    pub primary_key: bool,
}

impl ColumnSpec {
    /// The integer, non-nullable `pk` column every sheet table starts with
    pub fn primary_key() -> Self {
        Self {
            name: PRIMARY_KEY_COLUMN.to_string(),
            storage_type: StorageType::Integer,
            nullable: false,
            primary_key: true,
        }
    }

    /// A nullable, non-key column
    pub fn nullable(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
            nullable: true,
            primary_key: false,
        }
    }
}
