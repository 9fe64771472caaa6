use std::{collections::HashMap, path::PathBuf};

use clap::{builder::PossibleValue, ValueEnum};
use image::{
    imageops::{crop_imm, replace, resize, FilterType},
    RgbImage,
};
use itertools::iproduct;
use log::debug;

use crate::{
    descriptor::ColorDescriptor,
    error::{MosaicError, Result},
    imageio::{open_rgb, save_rgb},
    matcher::NearestMatcher,
    progress::{ProgressEvent, ProgressObserver},
};

/// Resampling filter used to shrink matched images down to block size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resample {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl Resample {
    pub fn filter_type(self) -> FilterType {
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Triangle => FilterType::Triangle,
            Resample::CatmullRom => FilterType::CatmullRom,
            Resample::Gaussian => FilterType::Gaussian,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl ValueEnum for Resample {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Resample::Nearest,
            Resample::Triangle,
            Resample::CatmullRom,
            Resample::Gaussian,
            Resample::Lanczos3,
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Resample::Nearest => PossibleValue::new("nearest").help("Nearest neighbour, fastest."),
            Resample::Triangle => PossibleValue::new("triangle").help("Linear filter."),
            Resample::CatmullRom => PossibleValue::new("catmull-rom").help("Cubic filter."),
            Resample::Gaussian => PossibleValue::new("gaussian").help("Gaussian filter."),
            Resample::Lanczos3 => {
                PossibleValue::new("lanczos3").help("Lanczos with window 3, sharpest.")
            }
        })
    }
}

impl std::fmt::Display for Resample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_possible_value()
            .expect("no values are skipped")
            .get_name()
            .fmt(f)
    }
}

/// One square tile of the input image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub col: u32,
    pub row: u32,
    pub size: u32,
}

impl Block {
    pub fn x(&self) -> u32 {
        self.col * self.size
    }

    pub fn y(&self) -> u32 {
        self.row * self.size
    }
}

/// Full blocks covering a `width` x `height` image, row by row.
///
/// Remainder strips on the right and bottom edges are left out.
pub fn grid(width: u32, height: u32, block_size: u32) -> impl Iterator<Item = Block> {
    let cols = width.checked_div(block_size).unwrap_or(0);
    let rows = height.checked_div(block_size).unwrap_or(0);
    iproduct!(0..rows, 0..cols).map(move |(row, col)| Block {
        col,
        row,
        size: block_size,
    })
}

pub fn block_count(width: u32, height: u32, block_size: u32) -> u64 {
    let cols = width.checked_div(block_size).unwrap_or(0);
    let rows = height.checked_div(block_size).unwrap_or(0);
    u64::from(cols) * u64::from(rows)
}

/// Mosaic generation for a single input image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MosaicJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub block_size: u32,
}

impl MosaicJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, block_size: u32) -> Self {
        MosaicJob {
            input: input.into(),
            output: output.into(),
            block_size,
        }
    }
}

pub struct MosaicComposer<'a> {
    matcher: NearestMatcher<'a>,
    filter: Resample,
}

impl<'a> MosaicComposer<'a> {
    pub fn new(matcher: NearestMatcher<'a>, filter: Resample) -> Self {
        MosaicComposer { matcher, filter }
    }

    /// Loads `job.input`, replaces every block with its closest dataset image
    /// and writes the result to `job.output`.
    ///
    /// Any failure aborts the job before an output file is left behind.
    pub fn compose(
        &self,
        id: usize,
        job: &MosaicJob,
        observer: &dyn ProgressObserver,
    ) -> Result<()> {
        let input = open_rgb(&job.input)?;
        observer.on_event(ProgressEvent::JobStarted {
            job: id,
            input: job.input.clone(),
            output: job.output.clone(),
            blocks: block_count(input.width(), input.height(), job.block_size),
        });
        let canvas = self
            .compose_image(&input, job.block_size, || {
                observer.on_event(ProgressEvent::BlockComposed { job: id })
            })
            .map_err(|e| e.at_path(&job.input))?;
        save_rgb(&canvas, &job.output)?;
        debug!("wrote {}", job.output.display());
        Ok(())
    }

    /// Builds the mosaic of `input` in memory; `on_block` runs after each block.
    pub fn compose_image<F>(
        &self,
        input: &RgbImage,
        block_size: u32,
        mut on_block: F,
    ) -> Result<RgbImage>
    where
        F: FnMut(),
    {
        if block_size == 0 {
            return Err(MosaicError::Config(
                "block size must be positive".to_string(),
            ));
        }
        let mut canvas = RgbImage::new(input.width(), input.height());
        // a candidate is resized at most once per job
        let mut thumbnails: HashMap<usize, RgbImage> = HashMap::new();
        for block in grid(input.width(), input.height(), block_size) {
            let region = crop_imm(input, block.x(), block.y(), block_size, block_size);
            let descriptor = ColorDescriptor::compute(&*region)?;
            let (i, entry) = self.matcher.find_closest(&descriptor)?;
            let thumbnail = thumbnails.entry(i).or_insert_with(|| {
                resize(
                    &entry.image,
                    block_size,
                    block_size,
                    self.filter.filter_type(),
                )
            });
            replace(
                &mut canvas,
                &*thumbnail,
                i64::from(block.x()),
                i64::from(block.y()),
            );
            on_block();
        }
        Ok(canvas)
    }
}
