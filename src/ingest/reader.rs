//! Row decoding for sheet files

use std::path::Path;

use super::IngestError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads a sheet file into rows of raw cells
pub trait TabularReader {
    /// All rows after the file's positional key header, in file order
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, IngestError>;
}

/// [`TabularReader`] for comma-separated files
///
/// Record lengths may vary between rows. Invalid UTF-8 is replaced rather
/// than rejected.
#[derive(Debug, Clone)]
pub struct CsvReader {
    key_header: bool,
}

impl CsvReader {
    /// Reader that drops the first physical row when `key_header` is set
    pub fn new(key_header: bool) -> Self {
        Self { key_header }
    }

    /// Decode CSV content already in memory
    pub fn parse(&self, path: &Path, content: &[u8]) -> Result<Vec<Vec<String>>, IngestError> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content);

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|e| IngestError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            rows.push(
                record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect(),
            );
        }

        if self.key_header && !rows.is_empty() {
            rows.remove(0);
        }
        Ok(rows)
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TabularReader for CsvReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
        let content = std::fs::read(path).map_err(|source| IngestError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(path, &content)
    }
}
