use std::path::PathBuf;

use crate::{
    cache::DescriptorCache,
    error::{MosaicError, Result},
    mosaic::Resample,
};

pub const DEFAULT_BLOCK_SIZE: u32 = 5;

/// Everything a run needs, independent of how it was collected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Dataset name; images live in `<datasets_dir>/<dataset>`.
    pub dataset: String,
    pub block_size: u32,
    pub datasets_dir: PathBuf,
    pub inputs_dir: PathBuf,
    pub outputs_dir: PathBuf,
    /// Directory holding `<dataset>.csv`.
    pub cache_dir: PathBuf,
    pub filter: Resample,
    pub refresh_cache: bool,
    /// Worker cap; `None` uses the global rayon pool.
    pub jobs: Option<usize>,
}

impl MosaicConfig {
    pub fn new(dataset: impl Into<String>) -> Self {
        MosaicConfig {
            dataset: dataset.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            datasets_dir: PathBuf::from("datasets"),
            inputs_dir: PathBuf::from("inputs"),
            outputs_dir: PathBuf::from("outputs"),
            cache_dir: PathBuf::from("."),
            filter: Resample::default(),
            refresh_cache: false,
            jobs: None,
        }
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.datasets_dir.join(&self.dataset)
    }

    pub fn cache(&self) -> DescriptorCache {
        DescriptorCache::for_dataset(&self.cache_dir, &self.dataset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(MosaicError::Config(
                "block size must be a positive integer".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(MosaicError::Config(
                "job count must be a positive integer".to_string(),
            ));
        }
        let name = self.dataset.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(MosaicError::Config(format!(
                "invalid dataset name {:?}",
                self.dataset
            )));
        }
        let dir = self.dataset_dir();
        if !dir.is_dir() {
            return Err(MosaicError::Config(format!(
                "dataset '{}' does not exist ({} is not a directory)",
                self.dataset,
                dir.display()
            )));
        }
        Ok(())
    }
}
