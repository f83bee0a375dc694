//! CLI-specific error types

use crate::database::StoreError;
use crate::ingest::IngestError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Configuration already exists at {0}. Use --force to overwrite.")]
    ConfigExists(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] StoreError),

    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}
