//! Command line interface for the `sheet-ingest` binary

pub mod commands;
pub mod error;
