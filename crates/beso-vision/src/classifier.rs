//! The face-classifier seam: whatever finds faces in a grayscale image.

use crate::types::{BoundingBox, DetectionParameters, MIN_FACE_SIZE};
use image::GrayImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}; place det_10g.onnx in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Multi-scale scan settings handed to a classifier on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    pub scale_factor: f32,
    pub min_neighbors: u32,
    pub min_size: (u32, u32),
}

impl From<&DetectionParameters> for ScanOptions {
    fn from(params: &DetectionParameters) -> Self {
        Self {
            scale_factor: params.scale_factor(),
            min_neighbors: params.min_neighbors(),
            min_size: MIN_FACE_SIZE,
        }
    }
}

/// Pluggable face detection backend.
///
/// Implementations may keep inference state between calls, hence `&mut self`.
pub trait FaceClassifier {
    /// Return one axis-aligned box per face found in `gray`.
    fn detect_multi_scale(
        &mut self,
        gray: &GrayImage,
        options: &ScanOptions,
    ) -> Result<Vec<BoundingBox>, ClassifierError>;
}

impl<C: FaceClassifier + ?Sized> FaceClassifier for Box<C> {
    fn detect_multi_scale(
        &mut self,
        gray: &GrayImage,
        options: &ScanOptions,
    ) -> Result<Vec<BoundingBox>, ClassifierError> {
        (**self).detect_multi_scale(gray, options)
    }
}
