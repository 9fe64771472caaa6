use crate::{
    dataset::{DatasetEntry, DatasetIndex},
    descriptor::ColorDescriptor,
    error::{MosaicError, Result},
};

/// Linear nearest-neighbour search over a dataset's descriptors.
#[derive(Clone, Copy, Debug)]
pub struct NearestMatcher<'a> {
    index: &'a DatasetIndex,
}

impl<'a> NearestMatcher<'a> {
    pub fn new(index: &'a DatasetIndex) -> Self {
        NearestMatcher { index }
    }

    /// Returns the position and entry whose descriptor is closest to `target`.
    ///
    /// Ties go to the entry that comes first in the index.
    pub fn find_closest(&self, target: &ColorDescriptor) -> Result<(usize, &'a DatasetEntry)> {
        self.index
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| (target.distance(&entry.descriptor), i, entry))
            // min_by keeps the first of several equal minima
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, i, entry)| (i, entry))
            .ok_or_else(|| MosaicError::EmptyDataset(None))
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn entry(name: &str, rgb: [u8; 3]) -> DatasetEntry {
        DatasetEntry::new(name, RgbImage::from_pixel(1, 1, Rgb(rgb))).unwrap()
    }

    #[test]
    fn exact_match_wins() {
        let index = DatasetIndex::from_entries(vec![
            entry("black", [0, 0, 0]),
            entry("teal", [0, 128, 128]),
            entry("white", [255, 255, 255]),
        ]);
        let matcher = NearestMatcher::new(&index);
        let (i, found) = matcher
            .find_closest(&ColorDescriptor::new(0, 128, 128))
            .unwrap();
        assert_eq!(i, 1);
        assert_eq!(found.filename, "teal");
    }

    #[test]
    fn picks_the_nearest() {
        let index = DatasetIndex::from_entries(vec![
            entry("dark", [20, 20, 20]),
            entry("light", [230, 230, 230]),
        ]);
        let matcher = NearestMatcher::new(&index);
        let (_, found) = matcher
            .find_closest(&ColorDescriptor::new(180, 200, 170))
            .unwrap();
        assert_eq!(found.filename, "light");
    }

    #[test]
    fn ties_resolve_to_the_earliest_entry() {
        let index = DatasetIndex::from_entries(vec![
            entry("up", [10, 0, 0]),
            entry("down", [0, 0, 0]),
            entry("same-as-down", [0, 0, 0]),
        ]);
        let matcher = NearestMatcher::new(&index);
        let (i, found) = matcher
            .find_closest(&ColorDescriptor::new(5, 0, 0))
            .unwrap();
        assert_eq!((i, found.filename.as_str()), (0, "up"));
        let (i, _) = matcher
            .find_closest(&ColorDescriptor::new(0, 0, 0))
            .unwrap();
        assert_eq!(i, 1);
    }

    #[test]
    fn empty_index_is_rejected() {
        let index = DatasetIndex::default();
        let err = NearestMatcher::new(&index)
            .find_closest(&ColorDescriptor::new(1, 2, 3))
            .unwrap_err();
        assert!(matches!(err, MosaicError::EmptyDataset(None)));
        assert_eq!(err.to_string(), "dataset index is empty");
    }
}
