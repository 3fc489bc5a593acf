use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_SCALE_FACTOR: f32 = 1.1;
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;
/// Smallest face the classifier is asked to report, as (width, height).
pub const MIN_FACE_SIZE: (u32, u32) = (30, 30);

#[derive(Error, Debug, PartialEq)]
pub enum ParameterError {
    #[error("scale factor must be greater than 1.0, got {0}")]
    ScaleFactor(f32),
    #[error("minimum neighbors must be at least 1, got {0}")]
    MinNeighbors(u32),
    #[error("invalid color {0:?}: expected #rrggbb")]
    Color(String),
}

/// Bounding box for a detected face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Raw candidate detections merged into this box (itself included).
    pub neighbors: u32,
}

/// Color used to outline detected faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BoxColor {
    pub const GREEN: BoxColor = BoxColor { r: 0, g: 255, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Intensity used when outlining on a single-channel frame.
    pub fn luma(&self) -> u8 {
        let y = 299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32;
        ((y + 500) / 1000) as u8
    }
}

impl Default for BoxColor {
    fn default() -> Self {
        Self::GREEN
    }
}

impl FromStr for BoxColor {
    type Err = ParameterError;

    /// Parse `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParameterError::Color(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParameterError::Color(s.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for BoxColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Live detection controls: pyramid scale step, neighbor threshold, box color.
///
/// Fields are private so the invariants (`scale_factor > 1.0`,
/// `min_neighbors >= 1`) hold for every value in circulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParameters {
    scale_factor: f32,
    min_neighbors: u32,
    box_color: BoxColor,
}

impl DetectionParameters {
    pub fn new(
        scale_factor: f32,
        min_neighbors: u32,
        box_color: BoxColor,
    ) -> Result<Self, ParameterError> {
        let mut params = Self::default();
        params.set_scale_factor(scale_factor)?;
        params.set_min_neighbors(min_neighbors)?;
        params.box_color = box_color;
        Ok(params)
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn min_neighbors(&self) -> u32 {
        self.min_neighbors
    }

    pub fn box_color(&self) -> BoxColor {
        self.box_color
    }

    pub fn set_scale_factor(&mut self, value: f32) -> Result<(), ParameterError> {
        // NaN fails the comparison too
        if !(value > 1.0) || !value.is_finite() {
            return Err(ParameterError::ScaleFactor(value));
        }
        self.scale_factor = value;
        Ok(())
    }

    pub fn set_min_neighbors(&mut self, value: u32) -> Result<(), ParameterError> {
        if value < 1 {
            return Err(ParameterError::MinNeighbors(value));
        }
        self.min_neighbors = value;
        Ok(())
    }

    pub fn set_box_color(&mut self, color: BoxColor) {
        self.box_color = color;
    }
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            box_color: BoxColor::GREEN,
        }
    }
}
