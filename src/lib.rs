//! Photo-mosaics from a personal image library.
//!
//! Each input image is cut into square blocks, and every block is replaced by
//! the dataset image whose mean RGB color is closest to the block's own.

pub mod batch;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod descriptor;
pub mod error;
pub mod imageio;
pub mod matcher;
pub mod mosaic;
pub mod progress;

pub use batch::{BatchReport, BatchRunner, JobOutcome, OutputNamer};
pub use cache::{CacheRecord, DescriptorCache};
pub use config::MosaicConfig;
pub use dataset::{DatasetEntry, DatasetIndex};
pub use descriptor::ColorDescriptor;
pub use error::{MosaicError, Result};
pub use matcher::NearestMatcher;
pub use mosaic::{grid, Block, MosaicComposer, MosaicJob, Resample};
pub use progress::{NoProgress, ProgressEvent, ProgressObserver};

use log::info;

/// Validates `config`, loads the dataset index and runs every job.
///
/// Errors returned here are fatal for the whole run and happen before any job
/// starts; per-job failures end up in the [`BatchReport`].
pub fn run(config: &MosaicConfig, observer: &dyn ProgressObserver) -> Result<BatchReport> {
    config.validate()?;
    match config.jobs {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| MosaicError::Config(format!("cannot start {threads} workers: {e}")))?
            .install(|| run_validated(config, observer)),
        None => run_validated(config, observer),
    }
}

fn run_validated(config: &MosaicConfig, observer: &dyn ProgressObserver) -> Result<BatchReport> {
    let dataset_dir = config.dataset_dir();
    let cache = config.cache();
    let index = if config.refresh_cache {
        DatasetIndex::refresh(&dataset_dir, &cache, observer)?
    } else {
        DatasetIndex::load(&dataset_dir, &cache, observer)?
    };
    info!(
        "dataset '{}' ready with {} images",
        config.dataset,
        index.len()
    );
    BatchRunner::new(&index, config.block_size, config.filter).run_all(
        &config.inputs_dir,
        &config.outputs_dir,
        observer,
    )
}
