//! Three-phase ingestion driver

use std::path::Path;
use std::time::Instant;
use tracing::info;

use super::consolidate::SubTableConsolidator;
use super::discovery::{FileDiscovery, LocalDiscovery};
use super::link::{ForeignKeyLinker, LinkOutcome};
use super::materialize::{Sheet, TableMaterializer};
use super::reader::{CsvReader, TabularReader};
use super::{IngestError, IngestReport, Phase};
use crate::database::config::{IngestConfig, IngestSection};
use crate::database::{SchemaStore, open_store};
use crate::models::SourceFile;

/// A sheet that made it into the store, with the type row used for linking
struct Materialized {
    file: SourceFile,
    types: Vec<String>,
}

/// Runs materialize, link and consolidate over one input directory
pub struct Ingestor<'a> {
    store: &'a dyn SchemaStore,
    discovery: Box<dyn FileDiscovery + 'a>,
    reader: Box<dyn TabularReader + 'a>,
    sub_table_suffix: String,
}

impl<'a> Ingestor<'a> {
    /// Ingestor with default CSV discovery and reading
    pub fn new(store: &'a dyn SchemaStore) -> Self {
        Self::with_options(store, &IngestSection::default())
    }

    /// Ingestor configured from an `[ingest]` section
    pub fn with_options(store: &'a dyn SchemaStore, options: &IngestSection) -> Self {
        Self {
            store,
            discovery: Box::new(LocalDiscovery::new(options.extension.as_str())),
            reader: Box::new(CsvReader::new(options.key_header)),
            sub_table_suffix: options.sub_table_suffix.clone(),
        }
    }

    /// Replace the file discovery
    pub fn with_discovery(mut self, discovery: impl FileDiscovery + 'a) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    /// Replace the row reader
    pub fn with_reader(mut self, reader: impl TabularReader + 'a) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Ingest everything under `root`
    ///
    /// Never fails as a whole: every per-file, per-link and per-directory
    /// error is recorded in the report and the run carries on.
    pub fn run(&self, root: &Path) -> IngestReport {
        let started = Instant::now();
        let mut report = IngestReport::new();

        info!("Ingesting {} into {} store", root.display(), self.store.backend_type());

        let files = self.discover(root, &mut report);
        let known_tables: Vec<String> = files.iter().map(|f| f.table_name.clone()).collect();
        let materialized = self.materialize_all(files, &mut report);
        self.link_all(known_tables, &materialized, &mut report);
        self.consolidate_all(root, &mut report);

        report.duration = started.elapsed();
        info!(
            "Ingestion finished in {}: {} tables, {} links, {} sub-tables, {} failure(s)",
            report.duration_string(),
            report.tables_created,
            report.links_created,
            report.sub_tables_created,
            report.failures.len()
        );
        report
    }

    fn discover(&self, root: &Path, report: &mut IngestReport) -> Vec<SourceFile> {
        match self.discovery.list_files(root, false) {
            Ok(files) => {
                report.files_discovered = files.len();
                files
            }
            Err(e) => {
                report.record_failure(Phase::Materialize, root.display().to_string(), &e);
                Vec::new()
            }
        }
    }

    fn materialize_all(&self, files: Vec<SourceFile>, report: &mut IngestReport) -> Vec<Materialized> {
        info!("Materializing {} file(s)", files.len());

        let materializer = TableMaterializer::new(self.store);
        let mut materialized = Vec::new();

        for file in files {
            let outcome = self
                .reader
                .read_rows(&file.path)
                .and_then(|rows| Sheet::from_rows(&file.path, rows))
                .and_then(|sheet| {
                    let table = materializer.materialize(&file, &sheet)?;
                    Ok((table, sheet.types))
                });

            match outcome {
                Ok((table, types)) => {
                    report.tables_created += 1;
                    report.rows_inserted += table.rows_inserted;
                    materialized.push(Materialized { file, types });
                }
                Err(e) => report.record_failure(Phase::Materialize, file.name, &e),
            }
        }

        materialized
    }

    /// Link the sheets that materialized
    ///
    /// Any discovered sheet is an acceptable target, so a sheet that failed
    /// this run can still be referenced through its table from an earlier run.
    fn link_all(&self, known_tables: Vec<String>, materialized: &[Materialized], report: &mut IngestReport) {
        let linker = ForeignKeyLinker::new(self.store, known_tables);
        info!("Linking {} table(s)", materialized.len());

        for sheet in materialized {
            for (_, outcome) in linker.link_file(&sheet.file, &sheet.types) {
                match outcome {
                    Ok(LinkOutcome::Created { cleared, .. }) => {
                        report.links_created += 1;
                        report.dangling_cleared += cleared;
                    }
                    Ok(LinkOutcome::Skipped(_)) => report.links_skipped += 1,
                    Err(e) => report.record_failure(Phase::Link, sheet.file.name.clone(), &e),
                }
            }
        }
    }

    fn consolidate_all(&self, root: &Path, report: &mut IngestReport) {
        let directories = match self.discovery.list_directories(root) {
            Ok(directories) => directories,
            Err(e) => {
                report.record_failure(Phase::Consolidate, root.display().to_string(), &e);
                return;
            }
        };

        let consolidator =
            SubTableConsolidator::new(self.store, self.reader.as_ref()).with_suffix(self.sub_table_suffix.as_str());

        for directory in directories {
            let Some(name) = directory.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let members = match self.discovery.list_files(&directory, true) {
                Ok(members) => members,
                Err(e) => {
                    report.record_failure(Phase::Consolidate, name, &e);
                    continue;
                }
            };

            let consolidation = consolidator.consolidate(name, &members);
            for (member, e) in &consolidation.member_failures {
                report.record_failure(Phase::Consolidate, member.path.display().to_string(), e);
            }
            match consolidation.result {
                Ok(rows) => {
                    report.sub_tables_created += 1;
                    report.sub_table_rows += rows;
                }
                Err(e) => report.record_failure(Phase::Consolidate, name, &e),
            }
        }
    }
}

/// Open the configured store and ingest `root` into it
///
/// Only a store that cannot be opened is an error; everything else is in the
/// returned report.
pub fn run_ingest(root: &Path, config: &IngestConfig) -> Result<IngestReport, IngestError> {
    let store = open_store(config, root)?;
    Ok(Ingestor::with_options(store.as_ref(), &config.ingest).run(root))
}

#[cfg(all(test, feature = "sqlite-backend"))]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_is_recorded() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::in_memory().unwrap();

        let report = Ingestor::new(&store).run(&dir.path().join("missing"));
        assert_eq!(report.files_discovered, 0);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].phase, Phase::Materialize);
        assert_eq!(report.failures[1].phase, Phase::Consolidate);
    }

    #[test]
    fn test_bad_file_does_not_stop_the_phase() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Bad.csv"), "key,0,1\n#,Rate\nint32,float\n1,2.5\n").unwrap();
        fs::write(dir.path().join("Good.csv"), "key,0,1\n#,Name\nint32,str\n1,One\n").unwrap();
        fs::write(dir.path().join("Short.csv"), "key,0\n#,Name\n").unwrap();
        let store = SqliteStore::in_memory().unwrap();

        let report = Ingestor::new(&store).run(dir.path());
        assert_eq!(report.files_discovered, 3);
        assert_eq!(report.tables_created, 1);
        assert_eq!(report.rows_inserted, 1);
        assert_eq!(report.failed_names(), vec!["Bad", "Short"]);
    }

    #[test]
    fn test_custom_extension_and_suffix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Item.tsv"), "key,0,1\n#,Name\nint32,str\n1,Potion\n").unwrap();
        fs::write(dir.path().join("Skipped.csv"), "key,0,1\n#,Name\nint32,str\n1,x\n").unwrap();
        fs::create_dir(dir.path().join("Custom")).unwrap();
        fs::write(dir.path().join("Custom/Talk.tsv"), "key,0,1\n#,0,1\nint32,str,str\n1,hi,there\n").unwrap();
        let store = SqliteStore::in_memory().unwrap();

        let options = IngestSection {
            extension: "tsv".to_string(),
            sub_table_suffix: "extra".to_string(),
            key_header: true,
        };
        let report = Ingestor::with_options(&store, &options).run(dir.path());

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.tables_created, 1);
        assert_eq!(report.sub_tables_created, 1);
        assert!(store.get_table("item").unwrap().is_some());
        assert!(store.get_table("skipped").unwrap().is_none());
        assert!(store.get_table("custom_extra").unwrap().is_some());
    }

    #[test]
    fn test_failed_target_links_to_earlier_table() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Foo.csv"), "key,0,1\n#,Name\nint32,str\n1,Alpha\n").unwrap();
        fs::write(dir.path().join("Bar.csv"), "key,0,1\n#,Foo\nint32,Foo\n10,1\n").unwrap();
        let store = SqliteStore::in_memory().unwrap();
        assert!(Ingestor::new(&store).run(dir.path()).is_success());

        // Foo no longer materializes, its table from the first run stays
        fs::write(dir.path().join("Foo.csv"), "key,0,1\n#,Rate\nint32,float\n1,2.5\n").unwrap();
        let report = Ingestor::new(&store).run(dir.path());

        assert_eq!(report.failed_names(), vec!["Foo"]);
        assert_eq!(report.links_created, 1);
        assert_eq!(report.links_skipped, 0);
        let bar = store.get_table("bar").unwrap().unwrap();
        assert_eq!(bar.foreign_keys()[0].referenced_table, "foo");
    }
}
