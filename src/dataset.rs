use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::shots::{ShotRecord, read_shots};

/// Every shot ingested so far, one source file per match. Append-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedDataset {
    records: Vec<ShotRecord>,
}

impl AccumulatedDataset {
    pub fn new(records: Vec<ShotRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ShotRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Source files already represented in the dataset.
    pub fn merged_files(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.source_file.clone())
            .collect()
    }

    /// New dataset with `extra` after the existing rows.
    pub fn appended(&self, extra: Vec<ShotRecord>) -> Self {
        let mut records = Vec::with_capacity(self.records.len() + extra.len());
        records.extend_from_slice(&self.records);
        records.extend(extra);
        Self { records }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: AccumulatedDataset,
    /// Rows skipped as malformed.
    pub errors: Vec<String>,
}

/// Loads the accumulated CSV. A missing file is an empty dataset.
pub fn load_dataset(path: &Path) -> Result<LoadedDataset> {
    if !path.exists() {
        return Ok(LoadedDataset {
            dataset: AccumulatedDataset::default(),
            errors: Vec::new(),
        });
    }
    let file = File::open(path).with_context(|| format!("open dataset {}", path.display()))?;
    let parsed = read_shots(file).with_context(|| format!("read dataset {}", path.display()))?;
    Ok(LoadedDataset {
        dataset: AccumulatedDataset::new(parsed.records),
        errors: parsed.errors,
    })
}

/// Like [`load_dataset`], but having nothing to query is an error.
pub fn load_query_dataset(path: &Path) -> Result<LoadedDataset> {
    if !path.exists() {
        return Err(anyhow!("dataset {} not found", path.display()));
    }
    let loaded = load_dataset(path)?;
    if !loaded.errors.is_empty() {
        warn!(
            path = %path.display(),
            skipped = loaded.errors.len(),
            "malformed rows skipped while loading dataset"
        );
    }
    if loaded.dataset.is_empty() {
        return Err(anyhow!("dataset {} has no usable shots", path.display()));
    }
    Ok(loaded)
}

/// Shared, immutable view of the dataset for concurrent readers.
///
/// `reload` builds a complete new snapshot before swapping it in; readers
/// holding the previous `Arc` keep seeing the old data.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    current: RwLock<Arc<AccumulatedDataset>>,
}

impl DatasetStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let loaded = load_query_dataset(&path)?;
        info!(path = %path.display(), shots = loaded.dataset.len(), "dataset loaded");
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(loaded.dataset)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<AccumulatedDataset> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Reloads from disk. On failure the current snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<AccumulatedDataset>> {
        let loaded = load_query_dataset(&self.path)?;
        let fresh = Arc::new(loaded.dataset);
        self.swap(Arc::clone(&fresh));
        info!(path = %self.path.display(), shots = fresh.len(), "dataset reloaded");
        Ok(fresh)
    }

    pub fn swap(&self, next: Arc<AccumulatedDataset>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = next;
    }
}
