//! Sheet Ingest - relational tables from two-header-row sheet exports
//!
//! Provides:
//! - Column name sanitizing (see [`naming`])
//! - Column type inference and value coercion (see [`inference`])
//! - Schema stores for SQLite and PostgreSQL (see [`database`])
//! - The materialize / link / consolidate pipeline (see [`ingest`])

#[cfg(feature = "cli")]
pub mod cli;
pub mod database;
pub mod inference;
pub mod ingest;
pub mod models;
pub mod naming;

// Re-export commonly used types
#[cfg(feature = "postgres-backend")]
pub use database::PostgresStore;
#[cfg(feature = "sqlite-backend")]
pub use database::SqliteStore;
pub use database::{IngestConfig, SchemaStore, StoreBackendType, StoreError, StoreResult, open_store};

pub use ingest::{IngestError, IngestFailure, IngestReport, Ingestor, Phase, run_ingest};

// Re-export models
pub use models::{
    ColumnSpec, ForeignKeyConstraint, ForeignKeyLink, SourceFile, StorageType, TableDescriptor,
    TypedValue,
};
