//! Dataset storage collaborator.
//!
//! The engine never touches file bytes or paths; it reads datasets and
//! writes inferred schemas back through [`DatasetStorage`].

use std::collections::HashMap;
use std::sync::RwLock;

use tabrule_model::{Dataset, DatasetSchema, EngineError, Result};

pub trait DatasetStorage: Send + Sync {
    /// Load the dataset for `file_id`. Unknown ids are `NotFound`.
    fn read(&self, file_id: &str) -> Result<Dataset>;

    /// Persist the inferred schema for `file_id`.
    fn write_schema(&self, file_id: &str, schema: &DatasetSchema) -> Result<()>;
}

/// Storage backed by a map, used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    datasets: RwLock<HashMap<String, Dataset>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file_id: impl Into<String>, dataset: Dataset) -> Result<()> {
        let mut datasets = self.datasets.write().map_err(lock_error)?;
        datasets.insert(file_id.into(), dataset);
        Ok(())
    }

    pub fn schema(&self, file_id: &str) -> Result<Option<DatasetSchema>> {
        let datasets = self.datasets.read().map_err(lock_error)?;
        let dataset = datasets.get(file_id).ok_or_else(|| unknown_file(file_id))?;
        Ok(dataset.schema.clone())
    }
}

impl DatasetStorage for InMemoryStorage {
    fn read(&self, file_id: &str) -> Result<Dataset> {
        let datasets = self.datasets.read().map_err(lock_error)?;
        datasets.get(file_id).cloned().ok_or_else(|| unknown_file(file_id))
    }

    fn write_schema(&self, file_id: &str, schema: &DatasetSchema) -> Result<()> {
        let mut datasets = self.datasets.write().map_err(lock_error)?;
        let dataset = datasets.get_mut(file_id).ok_or_else(|| unknown_file(file_id))?;
        dataset.schema = Some(schema.clone());
        Ok(())
    }
}

fn lock_error<T>(_: T) -> EngineError {
    EngineError::Storage("dataset storage lock poisoned".to_string())
}

fn unknown_file(file_id: &str) -> EngineError {
    EngineError::NotFound(format!("file '{file_id}'"))
}
