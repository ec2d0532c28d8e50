//! Thread-safe in-process store.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::model::{DatasetInfo, JobId, JobKind, JobRecord, JobStatus, NewDataset, ProjectInfo};
use super::{DataStore, DatasetReader};
use crate::error::{AssayError, Result};
use crate::input::DataTable;
use crate::schema::{Schema, infer_schema};

#[derive(Debug)]
struct StoredDataset {
    info: DatasetInfo,
    table: DataTable,
    schema: Schema,
}

#[derive(Debug, Default)]
struct StoreState {
    projects: IndexMap<String, ProjectInfo>,
    datasets: IndexMap<String, StoredDataset>,
    jobs: Vec<JobRecord>,
    next_dataset: u64,
    next_job: u64,
}

impl StoreState {
    fn insert(&mut self, mut info: DatasetInfo, table: DataTable) -> Result<DatasetInfo> {
        if !self.projects.contains_key(&info.project_id) {
            return Err(AssayError::ProjectNotFound(info.project_id));
        }
        if self.datasets.contains_key(&info.id) {
            return Err(AssayError::Config(format!(
                "dataset id '{}' already exists",
                info.id
            )));
        }

        info.row_count = table.row_count();
        info.column_count = table.column_count();
        let schema = infer_schema(&table);
        self.datasets.insert(
            info.id.clone(),
            StoredDataset {
                info: info.clone(),
                table,
                schema,
            },
        );
        Ok(info)
    }
}

/// In-memory [`DataStore`] guarded by a read-write lock.
///
/// Schemas are inferred once when a dataset is inserted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| AssayError::Persistence("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| AssayError::Persistence("store lock poisoned".to_string()))
    }

    /// Register a project. Re-adding an id replaces its title.
    pub fn add_project(&self, project: ProjectInfo) -> Result<()> {
        let mut state = self.write()?;
        state.projects.insert(project.id.clone(), project);
        Ok(())
    }

    /// Insert a dataset with caller-supplied metadata.
    ///
    /// Row and column counts in `info` are overwritten from the table.
    pub fn insert_dataset(&self, info: DatasetInfo, table: DataTable) -> Result<DatasetInfo> {
        let mut state = self.write()?;
        state.insert(info, table)
    }

    /// Convenience wrapper around [`insert_dataset`](Self::insert_dataset)
    /// for an unprocessed dataset with no checksum.
    pub fn add_table(
        &self,
        project_id: &str,
        dataset_id: &str,
        name: &str,
        table: DataTable,
    ) -> Result<DatasetInfo> {
        let info = DatasetInfo {
            id: dataset_id.to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            size_bytes: table_size_bytes(&table),
            row_count: 0,
            column_count: 0,
            checksum: None,
            is_processed: false,
            metadata: Map::new(),
        };
        self.insert_dataset(info, table)
    }

    /// Flag a dataset as processed so validation steps skip it.
    pub fn mark_processed(&self, dataset_id: &str) -> Result<()> {
        let mut state = self.write()?;
        let stored = state
            .datasets
            .get_mut(dataset_id)
            .ok_or_else(|| AssayError::DatasetNotFound(dataset_id.to_string()))?;
        stored.info.is_processed = true;
        Ok(())
    }

    /// Snapshot of all recorded jobs, oldest first.
    pub fn jobs(&self) -> Result<Vec<JobRecord>> {
        Ok(self.read()?.jobs.clone())
    }

    /// Append recorded jobs to a JSON file, keeping any records already there.
    pub fn save_jobs(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let mut records: Vec<JobRecord> = if path.exists() {
            let file = File::open(path).map_err(|e| {
                AssayError::Persistence(format!(
                    "Failed to open file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                AssayError::Persistence(format!(
                    "Failed to parse job records '{}': {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            Vec::new()
        };

        let new_jobs = self.jobs()?;
        let added = new_jobs.len();
        records.extend(new_jobs);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AssayError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            AssayError::Persistence(format!(
                "Failed to create file '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), &records).map_err(|e| {
            AssayError::Persistence(format!("Failed to serialize job records: {}", e))
        })?;

        Ok(added)
    }
}

impl DatasetReader for MemoryStore {
    fn dataset(&self, dataset_id: &str) -> Result<DatasetInfo> {
        self.read()?
            .datasets
            .get(dataset_id)
            .map(|d| d.info.clone())
            .ok_or_else(|| AssayError::DatasetNotFound(dataset_id.to_string()))
    }

    fn get_rows(&self, dataset_id: &str) -> Result<DataTable> {
        self.read()?
            .datasets
            .get(dataset_id)
            .map(|d| d.table.clone())
            .ok_or_else(|| AssayError::DatasetNotFound(dataset_id.to_string()))
    }

    fn get_schema(&self, dataset_id: &str) -> Result<Schema> {
        self.read()?
            .datasets
            .get(dataset_id)
            .map(|d| d.schema.clone())
            .ok_or_else(|| AssayError::DatasetNotFound(dataset_id.to_string()))
    }
}

impl DataStore for MemoryStore {
    fn project(&self, project_id: &str) -> Result<ProjectInfo> {
        self.read()?
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| AssayError::ProjectNotFound(project_id.to_string()))
    }

    fn project_datasets(&self, project_id: &str) -> Result<Vec<DatasetInfo>> {
        let state = self.read()?;
        if !state.projects.contains_key(project_id) {
            return Err(AssayError::ProjectNotFound(project_id.to_string()));
        }
        Ok(state
            .datasets
            .values()
            .filter(|d| d.info.project_id == project_id)
            .map(|d| d.info.clone())
            .collect())
    }

    fn create_dataset(&self, project_id: &str, dataset: NewDataset) -> Result<DatasetInfo> {
        let mut state = self.write()?;
        if !state.projects.contains_key(project_id) {
            return Err(AssayError::ProjectNotFound(project_id.to_string()));
        }
        let id = loop {
            state.next_dataset += 1;
            let candidate = format!("ds_{:04}", state.next_dataset);
            if !state.datasets.contains_key(&candidate) {
                break candidate;
            }
        };

        let info = DatasetInfo {
            id,
            project_id: project_id.to_string(),
            name: dataset.name,
            size_bytes: table_size_bytes(&dataset.table),
            row_count: 0,
            column_count: 0,
            checksum: None,
            is_processed: false,
            metadata: dataset.metadata,
        };
        // Id reservation and insert share one guard.
        let info = state.insert(info, dataset.table)?;
        tracing::debug!(dataset_id = %info.id, project_id, "created dataset");
        Ok(info)
    }

    fn record_job(
        &self,
        project_id: &str,
        kind: JobKind,
        status: JobStatus,
        result: Value,
    ) -> Result<JobId> {
        let mut state = self.write()?;
        if !state.projects.contains_key(project_id) {
            return Err(AssayError::ProjectNotFound(project_id.to_string()));
        }
        state.next_job += 1;
        let id = JobId(format!("job_{:04}", state.next_job));
        state.jobs.push(JobRecord {
            id: id.clone(),
            project_id: project_id.to_string(),
            kind,
            status,
            result,
            created_at: Utc::now(),
        });
        tracing::debug!(job_id = %id, %kind, "recorded job");
        Ok(id)
    }
}

/// Approximate size of a table serialized as comma-separated text.
fn table_size_bytes(table: &DataTable) -> u64 {
    let line_len = |cells: &[String]| -> u64 {
        cells.iter().map(|c| c.len() as u64).sum::<u64>() + cells.len() as u64
    };
    line_len(table.headers.as_slice())
        + table
            .rows
            .iter()
            .map(|r| line_len(r.as_slice()))
            .sum::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use tempfile::TempDir;

    fn store_with_project() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_project(ProjectInfo::new("p1", "Cohort study"))
            .unwrap();
        store
    }

    #[test]
    fn test_add_and_read_dataset() {
        let store = store_with_project();
        let table = DataTable::from_rows(&["id", "age"], &[&["1", "34"], &["2", "NA"]]);
        let info = store.add_table("p1", "ds1", "visits", table.clone()).unwrap();

        assert_eq!(info.row_count, 2);
        assert_eq!(info.column_count, 2);
        assert_eq!(store.get_rows("ds1").unwrap(), table);
        assert_eq!(store.get_schema("ds1").unwrap()["age"], ColumnType::Integer);
    }

    #[test]
    fn test_unknown_ids() {
        let store = store_with_project();
        assert!(matches!(
            store.dataset("missing"),
            Err(AssayError::DatasetNotFound(_))
        ));
        assert!(matches!(
            store.project("nope"),
            Err(AssayError::ProjectNotFound(_))
        ));
        let table = DataTable::from_rows(&["id"], &[&["1"]]);
        assert!(matches!(
            store.add_table("nope", "ds1", "x", table),
            Err(AssayError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_dataset_id_rejected() {
        let store = store_with_project();
        let table = DataTable::from_rows(&["id"], &[&["1"]]);
        store.add_table("p1", "ds1", "a", table.clone()).unwrap();
        assert!(store.add_table("p1", "ds1", "b", table).is_err());
    }

    #[test]
    fn test_create_dataset_is_additive() {
        let store = store_with_project();
        let table = DataTable::from_rows(&["id"], &[&["1"]]);
        let a = store
            .create_dataset("p1", NewDataset::new("merged", table.clone()))
            .unwrap();
        let b = store
            .create_dataset("p1", NewDataset::new("merged", table))
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.project_datasets("p1").unwrap().len(), 2);
    }

    #[test]
    fn test_create_dataset_races_with_explicit_ids() {
        let store = store_with_project();
        let table = DataTable::from_rows(&["id"], &[&["1"]]);

        let created: Vec<Result<DatasetInfo>> = std::thread::scope(|s| {
            s.spawn(|| {
                for n in 1..=200 {
                    // Conflicts with generated ids are expected here.
                    let _ = store.add_table("p1", &format!("ds_{:04}", n), "manual", table.clone());
                }
            });
            let creator = s.spawn(|| {
                (0..100)
                    .map(|_| store.create_dataset("p1", NewDataset::new("merged", table.clone())))
                    .collect::<Vec<_>>()
            });
            creator.join().unwrap()
        });

        assert!(created.iter().all(|r| r.is_ok()));
        let mut ids: Vec<String> = created.into_iter().map(|r| r.unwrap().id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_record_jobs_and_save() {
        let store = store_with_project();
        let id = store
            .record_job(
                "p1",
                JobKind::QualityAssessment,
                JobStatus::Completed,
                serde_json::json!({"overall_score": 91.0}),
            )
            .unwrap();
        assert_eq!(id.0, "job_0001");

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit").join("jobs.json");
        assert_eq!(store.save_jobs(&path).unwrap(), 1);
        assert_eq!(store.save_jobs(&path).unwrap(), 1);

        let saved: Vec<JobRecord> =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].kind, JobKind::QualityAssessment);
    }

    #[test]
    fn test_mark_processed() {
        let store = store_with_project();
        let table = DataTable::from_rows(&["id"], &[&["1"]]);
        store.add_table("p1", "ds1", "a", table).unwrap();
        store.mark_processed("ds1").unwrap();
        assert!(store.dataset("ds1").unwrap().is_processed);
    }
}
