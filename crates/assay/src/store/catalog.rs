//! JSON manifest describing projects and their dataset files.
//!
//! ```json
//! {
//!   "projects": [
//!     {
//!       "id": "p1",
//!       "title": "Cohort study",
//!       "datasets": [
//!         { "id": "visits", "name": "Clinic visits", "path": "visits.csv" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative dataset paths resolve against the manifest's directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::memory::MemoryStore;
use super::model::{DatasetInfo, ProjectInfo};
use crate::error::{AssayError, Result};
use crate::input::Parser;

/// A dataset entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDataset {
    pub id: String,
    /// Display name; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
    /// Path to a delimited text file.
    pub path: PathBuf,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A project entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogProject {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub datasets: Vec<CatalogDataset>,
}

/// Projects and dataset files to load into a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    pub projects: Vec<CatalogProject>,
    /// Directory relative dataset paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Catalog {
    /// Load a catalog manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AssayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut catalog: Catalog =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                AssayError::Config(format!(
                    "Failed to parse catalog '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        catalog.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(catalog)
    }

    /// Parse every dataset file and build a populated store.
    pub fn into_store(self) -> Result<MemoryStore> {
        let store = MemoryStore::new();
        let parser = Parser::new();

        for project in self.projects {
            store.add_project(ProjectInfo::new(&project.id, &project.title))?;

            for entry in project.datasets {
                let path = if entry.path.is_absolute() {
                    entry.path.clone()
                } else {
                    self.base_dir.join(&entry.path)
                };
                let (table, source) = parser.parse_file(&path)?;

                let name = entry.name.unwrap_or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| entry.id.clone())
                });
                let mut metadata = entry.metadata;
                metadata.insert("source_file".to_string(), Value::from(source.file));
                metadata.insert("format".to_string(), Value::from(source.format));

                store.insert_dataset(
                    DatasetInfo {
                        id: entry.id,
                        project_id: project.id.clone(),
                        name,
                        size_bytes: source.size_bytes,
                        row_count: source.row_count,
                        column_count: source.column_count,
                        checksum: Some(source.hash),
                        is_processed: entry.processed,
                        metadata,
                    },
                    table,
                )?;
            }

            tracing::debug!(project_id = %project.id, "loaded catalog project");
        }

        Ok(store)
    }
}
