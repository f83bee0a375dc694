//! Models module
//!
//! Defines the data structures that flow through the ingestion pipeline:
//! column and table descriptors, coerced cell values and input file identity.

pub mod column;
pub mod source;
pub mod table;
pub mod value;

pub use column::{ColumnSpec, DEFAULT_STRING_LENGTH, PRIMARY_KEY_COLUMN, StorageType};
pub use source::{ConsolidatedRecord, SourceFile};
pub use table::{
    DescriptorError, ForeignKeyConstraint, ForeignKeyLink, MAX_IDENTIFIER_LENGTH, TableDescriptor,
    constraint_name,
};
pub use value::{TypedValue, ValueKind};
