//! Frame type and pixel-format conversion: YUYV and GREY to RGB.

use image::{DynamicImage, GrayImage, RgbImage};
use std::time::Instant;

/// A single image buffer, held as either RGB8 or 8-bit grayscale.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    pub sequence: u32,
    pub timestamp: Instant,
}

impl Frame {
    /// Wrap a decoded image. Anything that is not already 8-bit gray is
    /// normalized to RGB8.
    pub fn new(image: DynamicImage, sequence: u32) -> Self {
        let image = match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) => {
                DynamicImage::ImageLuma8(image.to_luma8())
            }
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Self {
            image,
            sequence,
            timestamp: Instant::now(),
        }
    }

    pub fn from_rgb(rgb: RgbImage, sequence: u32) -> Self {
        Self::new(DynamicImage::ImageRgb8(rgb), sequence)
    }

    pub fn from_gray(gray: GrayImage, sequence: u32) -> Self {
        Self::new(DynamicImage::ImageLuma8(gray), sequence)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of channels per pixel (1 for gray, 3 for RGB).
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn is_gray(&self) -> bool {
        matches!(self.image, DynamicImage::ImageLuma8(_))
    }

    /// Raw interleaved pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    /// RGB copy of the frame; gray frames are replicated across channels.
    pub fn to_rgb8(&self) -> RgbImage {
        self.image.to_rgb8()
    }
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 studio-swing coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share
/// the chroma pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }

    RgbImage::from_raw(width, height, rgb).ok_or(FrameError::BufferMismatch { width, height })
}

/// Expand an 8-bit grayscale buffer to RGB.
pub fn grey_to_rgb(gray: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height) as usize;
    if gray.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: gray.len(),
        });
    }

    let rgb: Vec<u8> = gray[..expected].iter().flat_map(|&p| [p, p, p]).collect();
    RgbImage::from_raw(width, height, rgb).ok_or(FrameError::BufferMismatch { width, height })
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    [
        r.clamp(0, 255) as u8,
        g.clamp(0, 255) as u8,
        b.clamp(0, 255) as u8,
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("buffer does not fit a {width}x{height} image")]
    BufferMismatch { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_black_and_white() {
        // 2x1 image: studio black, then studio white sharing neutral chroma
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_yuyv_red_dominant() {
        // High V pushes red up and green down
        let yuyv = vec![81, 90, 81, 240];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        let [r, g, b] = rgb.get_pixel(0, 0).0;
        assert!(r > 200, "r={r}");
        assert!(g < 50, "g={g}");
        assert!(b < 50, "b={b}");
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        assert!(yuyv_to_rgb(&yuyv, 2, 1).is_err());
    }

    #[test]
    fn test_grey_to_rgb_replicates() {
        let rgb = grey_to_rgb(&[10, 200], 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(rgb.get_pixel(1, 0).0, [200, 200, 200]);
    }

    #[test]
    fn test_grey_invalid_length() {
        assert!(grey_to_rgb(&[1, 2, 3], 2, 2).is_err());
    }

    #[test]
    fn test_frame_normalizes_color_types() {
        let rgba = DynamicImage::new_rgba8(4, 4);
        let frame = Frame::new(rgba, 0);
        assert_eq!(frame.channels(), 3);
        assert!(!frame.is_gray());

        let gray = Frame::from_gray(GrayImage::new(4, 4), 7);
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.sequence, 7);
        assert_eq!(gray.as_bytes().len(), 16);
    }
}
