use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{ImageReader, RgbImage};

use crate::error::{MosaicError, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// JPEG and PNG files directly inside `directory`, sorted by file name.
pub fn image_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(directory).map_err(|e| MosaicError::io(directory, e))? {
        let path = entry.map_err(|e| MosaicError::io(directory, e))?.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// File name for log lines, falling back to the full path.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn open_rgb(path: &Path) -> Result<RgbImage> {
    let image = ImageReader::open(path)
        .map_err(|e| MosaicError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| MosaicError::io(path, e))?
        .decode()
        .map_err(|e| MosaicError::from_image(path, e))?;
    Ok(image.into_rgb8())
}

/// Saves `image`, removing whatever was partially written if encoding fails.
pub fn save_rgb(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| {
        let _ = fs::remove_file(path);
        MosaicError::from_image(path, e)
    })
}
