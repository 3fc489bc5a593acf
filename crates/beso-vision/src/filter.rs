//! Whole-frame color filters: luminance grayscale and sepia.
//!
//! Sepia multiplies pixels in R, G, B channel order, giving the usual warm
//! brown tone. Feeding BGR-ordered pixels through the same matrix (as an
//! OpenCV pipeline would) yields a bluish cast instead; that variant is not
//! reproduced.

use beso_hw::Frame;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use std::fmt;
use std::str::FromStr;

/// Sepia transform, rows produce R', G', B' from (R, G, B).
const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Grayscale,
    Sepia,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter {0:?}")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" | "gray" | "grey" => Ok(Self::Grayscale),
            "sepia" => Ok(Self::Sepia),
            _ => Err(UnknownFilter(s.to_string())),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale => f.write_str("Grayscale"),
            Self::Sepia => f.write_str("Sepia"),
        }
    }
}

/// BT.601 luminance (0.299 R + 0.587 G + 0.114 B), rounded.
pub fn luminance(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (src, dst) in rgb.pixels().zip(gray.pixels_mut()) {
        let [r, g, b] = src.0;
        let y = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        *dst = Luma([((y + 500) / 1000) as u8]);
    }
    gray
}

/// Single-channel view of a frame, converting RGB frames by luminance.
pub fn to_gray(frame: &Frame) -> GrayImage {
    match &frame.image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        _ => luminance(&frame.to_rgb8()),
    }
}

/// Apply `kind` to the frame in place.
///
/// Grayscale leaves an already single-channel frame as it is. Sepia works on
/// RGB, so a gray frame comes back as three identical channels first.
pub fn apply_filter(frame: &mut Frame, kind: FilterKind) {
    match kind {
        FilterKind::Grayscale => {
            if !frame.is_gray() {
                frame.image = DynamicImage::ImageLuma8(luminance(&frame.to_rgb8()));
            }
        }
        FilterKind::Sepia => {
            let mut rgb = frame.to_rgb8();
            for pixel in rgb.pixels_mut() {
                let [r, g, b] = pixel.0.map(|c| c as f32);
                pixel.0 = SEPIA.map(|row| (row[0] * r + row[1] * g + row[2] * b).round().min(255.0) as u8);
            }
            frame.image = DynamicImage::ImageRgb8(rgb);
        }
    }
}
