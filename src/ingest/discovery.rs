//! Input discovery on the local filesystem

use std::fs;
use std::path::{Path, PathBuf};

use super::IngestError;
use crate::models::SourceFile;

/// Lists sheet files and sub-table directories
pub trait FileDiscovery {
    /// Sheet files under `path`, sorted by path
    ///
    /// Only direct children unless `recursive` is set.
    fn list_files(&self, path: &Path, recursive: bool) -> Result<Vec<SourceFile>, IngestError>;

    /// Direct subdirectories of `path`, sorted by path
    fn list_directories(&self, path: &Path) -> Result<Vec<PathBuf>, IngestError>;
}

/// [`FileDiscovery`] over `std::fs`, matching files by extension
#[derive(Debug, Clone)]
pub struct LocalDiscovery {
    extension: String,
}

impl LocalDiscovery {
    /// Discovery of files ending in `.<extension>` (case-insensitive)
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    fn read_dir(path: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let entries = fs::read_dir(path).map_err(|source| IngestError::DirectoryRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IngestError::DirectoryRead {
                path: path.to_path_buf(),
                source,
            })?;
            paths.push(entry.path());
        }
        Ok(paths)
    }

    fn collect_files(&self, path: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<(), IngestError> {
        for entry in Self::read_dir(path)? {
            if entry.is_dir() {
                if recursive {
                    self.collect_files(&entry, true, out)?;
                }
            } else if entry.is_file() && self.matches(&entry) {
                out.push(entry);
            }
        }
        Ok(())
    }
}

impl Default for LocalDiscovery {
    fn default() -> Self {
        Self::new(crate::database::config::DEFAULT_EXTENSION)
    }
}

impl FileDiscovery for LocalDiscovery {
    fn list_files(&self, path: &Path, recursive: bool) -> Result<Vec<SourceFile>, IngestError> {
        let mut paths = Vec::new();
        self.collect_files(path, recursive, &mut paths)?;
        paths.sort();

        Ok(paths.iter().filter_map(SourceFile::from_path).collect())
    }

    fn list_directories(&self, path: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let mut dirs: Vec<PathBuf> = Self::read_dir(path)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("Quest.csv")).unwrap();
        File::create(dir.path().join("Item.CSV")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        fs::create_dir_all(dir.path().join("cut_scene/nested")).unwrap();
        fs::create_dir(dir.path().join("custom")).unwrap();
        File::create(dir.path().join("cut_scene/B.csv")).unwrap();
        File::create(dir.path().join("cut_scene/nested/A.csv")).unwrap();
        dir
    }

    #[test]
    fn test_list_top_level_files() {
        let dir = tree();
        let files = LocalDiscovery::default().list_files(dir.path(), false).unwrap();

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Item", "Quest"]);
        assert_eq!(files[1].table_name, "quest");
    }

    #[test]
    fn test_list_files_recursively() {
        let dir = tree();
        let files = LocalDiscovery::new(".csv")
            .list_files(&dir.path().join("cut_scene"), true)
            .unwrap();

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_list_directories_sorted() {
        let dir = tree();
        let dirs = LocalDiscovery::default().list_directories(dir.path()).unwrap();
        assert_eq!(
            dirs,
            vec![dir.path().join("custom"), dir.path().join("cut_scene")]
        );
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = LocalDiscovery::default()
            .list_files(&dir.path().join("missing"), false)
            .unwrap_err();
        assert!(matches!(err, IngestError::DirectoryRead { .. }));
    }
}
