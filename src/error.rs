use std::{
    io,
    path::{Path, PathBuf},
};

use image::ImageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MosaicError>;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("invalid image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    /// Carries the dataset directory when the emptiness was found on disk.
    #[error("{}", describe_empty(.0.as_deref()))]
    EmptyDataset(Option<PathBuf>),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt cache {path} (line {line}): {reason}")]
    CorruptCache {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MosaicError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MosaicError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_image(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MosaicError::InvalidImage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Attributes an image failure raised on an in-memory buffer to the file it came from.
    pub(crate) fn at_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            MosaicError::InvalidImage { reason, .. } => MosaicError::InvalidImage {
                path: path.into(),
                reason,
            },
            other => other,
        }
    }

    /// Splits `image` crate failures into the I/O and decode halves of the taxonomy.
    pub(crate) fn from_image(path: impl Into<PathBuf>, err: ImageError) -> Self {
        match err {
            ImageError::IoError(source) => MosaicError::io(path, source),
            other => MosaicError::invalid_image(path, other),
        }
    }
}

fn describe_empty(directory: Option<&Path>) -> String {
    match directory {
        Some(dir) => format!("dataset {} contains no usable images", dir.display()),
        None => "dataset index is empty".to_string(),
    }
}
