//! Input file identity and consolidated sub-table rows

use super::value::TypedValue;
use crate::naming::to_snake_case;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identity of one discovered input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Display name (file stem, e.g. `ClassJobCategory`)
    pub name: String,
    /// Sanitized table name (e.g. `class_job_category`)
    pub table_name: String,
    /// Filesystem path
    pub path: PathBuf,
}

impl SourceFile {
    /// Identity for the file at `path`; `None` when the path has no usable stem
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_stem()?.to_str()?.to_string();
        if name.is_empty() {
            return None;
        }

        Some(Self {
            table_name: to_snake_case(&name),
            name,
            path: path.to_path_buf(),
        })
    }
}

/// One row of a consolidated sub-table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedRecord {
    /// Sequential key assigned during consolidation, starting at 1
    pub surrogate_key: i64,
    /// The member row's own key field
    pub origin_key: String,
    /// Stem of the member file the row came from
    pub origin_file: String,
    pub slot_1: String,
    pub slot_2: String,
}

impl ConsolidatedRecord {
    /// Parameters in sub-table column order
    pub fn into_values(self) -> Vec<TypedValue> {
        vec![
            TypedValue::Integer(self.surrogate_key),
            TypedValue::Key(self.origin_key),
            TypedValue::Text(self.origin_file),
            TypedValue::Text(self.slot_1),
            TypedValue::Text(self.slot_2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_file_from_path() {
        let file = SourceFile::from_path("/exports/ClassJobCategory.csv").unwrap();
        assert_eq!(file.name, "ClassJobCategory");
        assert_eq!(file.table_name, "class_job_category");
        assert_eq!(file.path, PathBuf::from("/exports/ClassJobCategory.csv"));
    }

    #[test]
    fn consolidated_record_value_order() {
        let values = ConsolidatedRecord {
            surrogate_key: 7,
            origin_key: "3".to_string(),
            origin_file: "ClsArc001_00004".to_string(),
            slot_1: "TEXT_CLSARC001_00004_SEQ_00".to_string(),
            slot_2: "Welcome.".to_string(),
        }
        .into_values();

        assert_eq!(values[0], TypedValue::Integer(7));
        assert_eq!(values[1], TypedValue::Key("3".to_string()));
        assert_eq!(values[2], TypedValue::Text("ClsArc001_00004".to_string()));
        assert_eq!(values.len(), 5);
    }
}
