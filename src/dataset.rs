use std::path::Path;

use image::RgbImage;
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    cache::{CacheRecord, DescriptorCache},
    descriptor::ColorDescriptor,
    error::{MosaicError, Result},
    imageio::{image_files, open_rgb},
    progress::{ProgressEvent, ProgressObserver},
};

/// A candidate image, decoded once and kept resident for the whole run.
#[derive(Clone, Debug)]
pub struct DatasetEntry {
    pub filename: String,
    pub descriptor: ColorDescriptor,
    pub image: RgbImage,
}

impl DatasetEntry {
    pub fn new(filename: impl Into<String>, image: RgbImage) -> Result<Self> {
        let filename = filename.into();
        let descriptor =
            ColorDescriptor::compute(&image).map_err(|e| e.at_path(filename.as_str()))?;
        Ok(DatasetEntry {
            filename,
            descriptor,
            image,
        })
    }
}

/// Candidate images in a fixed order, read-only once built.
#[derive(Clone, Debug, Default)]
pub struct DatasetIndex {
    entries: Vec<DatasetEntry>,
}

impl DatasetIndex {
    pub fn from_entries(entries: Vec<DatasetEntry>) -> Self {
        DatasetIndex { entries }
    }

    /// Reads the index from `cache` when it exists, otherwise scans `directory`
    /// and writes a new cache.
    ///
    /// An existing cache is trusted as-is: files added to the directory later
    /// are not picked up until [`DatasetIndex::refresh`] is used.
    pub fn load(
        directory: &Path,
        cache: &DescriptorCache,
        observer: &dyn ProgressObserver,
    ) -> Result<Self> {
        if cache.exists() {
            info!("loading descriptors from {}", cache.path().display());
            let index = Self::from_records(directory, cache.read()?);
            observer.on_event(ProgressEvent::IndexReady {
                entries: index.len(),
                from_cache: true,
            });
            index.ensure_not_empty(directory)
        } else {
            info!(
                "no cache at {}, indexing {}",
                cache.path().display(),
                directory.display()
            );
            Self::refresh(directory, cache, observer)
        }
    }

    /// Rebuilds the index from `directory` and overwrites `cache`.
    pub fn refresh(
        directory: &Path,
        cache: &DescriptorCache,
        observer: &dyn ProgressObserver,
    ) -> Result<Self> {
        let index = Self::build(directory, observer)?.ensure_not_empty(directory)?;
        cache.write(&index.records())?;
        info!(
            "cached {} descriptors in {}",
            index.len(),
            cache.path().display()
        );
        Ok(index)
    }

    /// Decodes and describes every image in `directory` without touching any cache.
    ///
    /// Files that fail to decode are skipped with a warning.
    pub fn build(directory: &Path, observer: &dyn ProgressObserver) -> Result<Self> {
        let files = image_files(directory)?;
        observer.on_event(ProgressEvent::IndexingStarted { total: files.len() });
        let entries = files
            .par_iter()
            .map(|path| {
                let filename = path.file_name()?.to_string_lossy().into_owned();
                let entry =
                    open_rgb(path).and_then(|img| DatasetEntry::new(filename.as_str(), img));
                observer.on_event(ProgressEvent::ImageIndexed {
                    filename: filename.clone(),
                });
                entry
                    .map_err(|e| warn!("skipping candidate {filename}: {e}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        let index = DatasetIndex::from_entries(entries.into_iter().flatten().collect());
        observer.on_event(ProgressEvent::IndexReady {
            entries: index.len(),
            from_cache: false,
        });
        Ok(index)
    }

    fn from_records(directory: &Path, records: Vec<CacheRecord>) -> Self {
        let entries = records
            .into_par_iter()
            .map(|record| {
                let path = directory.join(&record.filename);
                if !path.is_file() {
                    warn!("{} listed in cache but not found, skipping", path.display());
                    return None;
                }
                open_rgb(&path)
                    .map(|image| DatasetEntry {
                        filename: record.filename,
                        descriptor: record.descriptor,
                        image,
                    })
                    .map_err(|e| warn!("skipping cached candidate: {e}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        DatasetIndex::from_entries(entries.into_iter().flatten().collect())
    }

    fn ensure_not_empty(self, directory: &Path) -> Result<Self> {
        if self.is_empty() {
            return Err(MosaicError::EmptyDataset(Some(directory.to_path_buf())));
        }
        Ok(self)
    }

    pub fn records(&self) -> Vec<CacheRecord> {
        self.entries
            .iter()
            .map(|e| CacheRecord {
                filename: e.filename.clone(),
                descriptor: e.descriptor,
            })
            .collect()
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Mutex};

    use image::Rgb;

    use super::*;
    use crate::progress::NoProgress;

    fn solid(dir: &Path, name: &str, rgb: [u8; 3]) {
        RgbImage::from_pixel(4, 4, Rgb(rgb))
            .save(dir.join(name))
            .unwrap();
    }

    fn summary(index: &DatasetIndex) -> Vec<(String, ColorDescriptor)> {
        index
            .entries()
            .iter()
            .map(|e| (e.filename.clone(), e.descriptor))
            .collect()
    }

    #[test]
    fn builds_cache_on_first_load() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        solid(data.path(), "red.png", [255, 0, 0]);
        solid(data.path(), "blue.png", [0, 0, 255]);
        fs::write(data.path().join("readme.txt"), "ignored").unwrap();
        let cache = DescriptorCache::for_dataset(scratch.path(), "colors");

        let index = DatasetIndex::load(data.path(), &cache, &NoProgress).unwrap();
        assert_eq!(
            summary(&index),
            vec![
                ("blue.png".to_string(), ColorDescriptor::new(0, 0, 255)),
                ("red.png".to_string(), ColorDescriptor::new(255, 0, 0)),
            ]
        );
        assert_eq!(cache.read().unwrap(), index.records());
    }

    #[test]
    fn reloads_identical_entries_from_cache() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        solid(data.path(), "a.png", [10, 20, 30]);
        solid(data.path(), "b.png", [200, 100, 0]);
        solid(data.path(), "c.png", [7, 7, 7]);
        let cache = DescriptorCache::for_dataset(scratch.path(), "set");

        let built = DatasetIndex::load(data.path(), &cache, &NoProgress).unwrap();
        let events = Mutex::new(vec![]);
        let observer = |e: ProgressEvent| events.lock().unwrap().push(e);
        let reloaded = DatasetIndex::load(data.path(), &cache, &observer).unwrap();

        assert_eq!(reloaded.len(), 3);
        assert_eq!(summary(&reloaded), summary(&built));
        assert_eq!(
            events.into_inner().unwrap(),
            vec![ProgressEvent::IndexReady {
                entries: 3,
                from_cache: true
            }]
        );
    }

    #[test]
    fn trusts_cached_descriptors_and_skips_missing_files() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        solid(data.path(), "kept.png", [1, 1, 1]);
        solid(data.path(), "extra.png", [9, 9, 9]);
        let cache = DescriptorCache::for_dataset(scratch.path(), "drift");
        cache
            .write(&[
                CacheRecord {
                    filename: "gone.png".to_string(),
                    descriptor: ColorDescriptor::new(0, 0, 0),
                },
                CacheRecord {
                    filename: "kept.png".to_string(),
                    descriptor: ColorDescriptor::new(50, 60, 70),
                },
            ])
            .unwrap();

        let index = DatasetIndex::load(data.path(), &cache, &NoProgress).unwrap();
        assert_eq!(
            summary(&index),
            vec![("kept.png".to_string(), ColorDescriptor::new(50, 60, 70))]
        );
    }

    #[test]
    fn refresh_rebuilds_a_stale_cache() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        solid(data.path(), "new.png", [3, 4, 5]);
        let cache = DescriptorCache::for_dataset(scratch.path(), "stale");
        cache
            .write(&[CacheRecord {
                filename: "new.png".to_string(),
                descriptor: ColorDescriptor::new(0, 0, 0),
            }])
            .unwrap();

        let index = DatasetIndex::refresh(data.path(), &cache, &NoProgress).unwrap();
        let expected = vec![("new.png".to_string(), ColorDescriptor::new(3, 4, 5))];
        assert_eq!(summary(&index), expected);
        assert_eq!(cache.read().unwrap(), index.records());
    }

    #[test]
    fn undecodable_candidates_are_skipped() {
        let data = tempfile::tempdir().unwrap();
        solid(data.path(), "good.png", [0, 255, 0]);
        fs::write(data.path().join("bad.jpg"), b"garbage").unwrap();
        let index = DatasetIndex::build(data.path(), &NoProgress).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].filename, "good.png");
    }

    #[test]
    fn empty_directory_is_empty_dataset() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        fs::write(data.path().join("notes.txt"), "no images").unwrap();
        let cache = DescriptorCache::for_dataset(scratch.path(), "empty");

        let err = DatasetIndex::load(data.path(), &cache, &NoProgress).unwrap_err();
        assert!(matches!(&err, MosaicError::EmptyDataset(Some(dir)) if dir == data.path()));
        assert!(!cache.exists());
    }

    #[test]
    fn cache_with_only_missing_files_is_empty_dataset() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let cache = DescriptorCache::for_dataset(scratch.path(), "ghosts");
        cache
            .write(&[CacheRecord {
                filename: "ghost.png".to_string(),
                descriptor: ColorDescriptor::new(1, 2, 3),
            }])
            .unwrap();
        assert!(matches!(
            DatasetIndex::load(data.path(), &cache, &NoProgress),
            Err(MosaicError::EmptyDataset(_))
        ));
    }
}
