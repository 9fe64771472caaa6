use std::{fmt, str::FromStr};

use image::{GenericImageView, Pixel, Rgb};
use num::pow::Pow;

use crate::error::{MosaicError, Result};

/// Mean RGB color of an image or image region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorDescriptor(pub [u8; 3]);

impl ColorDescriptor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        ColorDescriptor([r, g, b])
    }

    /// Averages every pixel of `image` per channel, truncating toward zero.
    ///
    /// Pixels are converted to RGB first, so grayscale and RGBA views are accepted.
    pub fn compute<I>(image: &I) -> Result<Self>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let count = u64::from(image.width()) * u64::from(image.height());
        if count == 0 {
            return Err(MosaicError::invalid_image(
                "<region>",
                "cannot describe an image with zero pixels",
            ));
        }
        let mut sums = [0u64; 3];
        for (_, _, pixel) in image.pixels() {
            let Rgb(rgb) = pixel.to_rgb();
            for (sum, c) in sums.iter_mut().zip(rgb) {
                *sum += u64::from(c);
            }
        }
        // each mean is bounded by the channel maximum
        Ok(ColorDescriptor(sums.map(|s| (s / count) as u8)))
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: &ColorDescriptor) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(&a, &b)| (f64::from(a) - f64::from(b)).pow(2i32))
            .sum::<f64>()
            .sqrt()
    }
}

impl fmt::Display for ColorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "({r}, {g}, {b})")
    }
}

impl FromStr for ColorDescriptor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| format!("expected a parenthesized triple, got {s:?}"))?;
        let parts = inner
            .split(',')
            .map(|c| {
                c.trim()
                    .parse::<u8>()
                    .map_err(|e| format!("bad channel {c:?}: {e}"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        match parts[..] {
            [r, g, b] => Ok(ColorDescriptor([r, g, b])),
            _ => Err(format!("expected 3 channels, got {}", parts.len())),
        }
    }
}
