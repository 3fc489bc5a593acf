//! Run the classifier over a frame and outline what it finds.

use crate::classifier::{ClassifierError, FaceClassifier, ScanOptions};
use crate::filter;
use crate::types::{BoundingBox, BoxColor, DetectionParameters};
use beso_hw::Frame;
use image::{DynamicImage, Luma, Rgb};

/// Outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;

/// An annotated frame and the faces drawn on it.
#[derive(Debug, Clone)]
pub struct Detection {
    pub frame: Frame,
    pub faces: Vec<BoundingBox>,
}

impl Detection {
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Detect faces and return the frame with one rectangle per face.
///
/// With no faces the frame comes back untouched.
pub fn detect<C: FaceClassifier + ?Sized>(
    classifier: &mut C,
    mut frame: Frame,
    params: &DetectionParameters,
) -> Result<Detection, ClassifierError> {
    let faces = detect_in_place(classifier, &mut frame, params)?;
    Ok(Detection { frame, faces })
}

/// Same as [`detect`] but annotates `frame` where it lies. On a classifier
/// error the frame is left unmodified.
pub fn detect_in_place<C: FaceClassifier + ?Sized>(
    classifier: &mut C,
    frame: &mut Frame,
    params: &DetectionParameters,
) -> Result<Vec<BoundingBox>, ClassifierError> {
    let gray = filter::to_gray(frame);
    let faces = classifier.detect_multi_scale(&gray, &ScanOptions::from(params))?;

    for face in &faces {
        draw_box(&mut frame.image, face, params.box_color(), BOX_THICKNESS);
    }

    tracing::debug!(faces = faces.len(), sequence = frame.sequence, "detection pass");
    Ok(faces)
}

/// Draw a hollow rectangle, clipped to the image. The outline grows inward
/// from the box edges.
pub fn draw_box(image: &mut DynamicImage, bbox: &BoundingBox, color: BoxColor, thickness: u32) {
    let (width, height) = (image.width() as i64, image.height() as i64);

    let left = bbox.x.round() as i64;
    let top = bbox.y.round() as i64;
    let right = (bbox.x + bbox.width).round() as i64 - 1;
    let bottom = (bbox.y + bbox.height).round() as i64 - 1;

    if right < 0 || bottom < 0 || left >= width || top >= height || left > right || top > bottom {
        return;
    }

    let t = thickness.max(1) as i64;
    let on_outline = |x: i64, y: i64| {
        x < left + t || x > right - t || y < top + t || y > bottom - t
    };

    for y in top.max(0)..=bottom.min(height - 1) {
        for x in left.max(0)..=right.min(width - 1) {
            if !on_outline(x, y) {
                continue;
            }
            let (px, py) = (x as u32, y as u32);
            match image {
                DynamicImage::ImageRgb8(img) => img.put_pixel(px, py, Rgb([color.r, color.g, color.b])),
                DynamicImage::ImageLuma8(img) => img.put_pixel(px, py, Luma([color.luma()])),
                // Frames only ever hold RGB8 or Luma8
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    struct FixedClassifier {
        faces: Vec<BoundingBox>,
        seen: Vec<ScanOptions>,
    }

    impl FaceClassifier for FixedClassifier {
        fn detect_multi_scale(
            &mut self,
            _gray: &GrayImage,
            options: &ScanOptions,
        ) -> Result<Vec<BoundingBox>, ClassifierError> {
            self.seen.push(*options);
            Ok(self.faces.clone())
        }
    }

    struct FailingClassifier;

    impl FaceClassifier for FailingClassifier {
        fn detect_multi_scale(
            &mut self,
            _gray: &GrayImage,
            _options: &ScanOptions,
        ) -> Result<Vec<BoundingBox>, ClassifierError> {
            Err(ClassifierError::InferenceFailed("boom".into()))
        }
    }

    fn face(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence: 0.9, neighbors: 5 }
    }

    fn blank(w: u32, h: u32) -> Frame {
        Frame::from_rgb(RgbImage::new(w, h), 0)
    }

    #[test]
    fn test_no_faces_leaves_frame_unmodified() {
        let mut classifier = FixedClassifier { faces: vec![], seen: vec![] };
        let frame = Frame::from_rgb(RgbImage::from_pixel(40, 40, Rgb([9, 8, 7])), 3);
        let before = frame.as_bytes().to_vec();

        let detection = detect(&mut classifier, frame, &DetectionParameters::default()).unwrap();
        assert_eq!(detection.face_count(), 0);
        assert_eq!(detection.frame.as_bytes(), &before[..]);
    }

    #[test]
    fn test_passes_scan_options() {
        let mut classifier = FixedClassifier { faces: vec![], seen: vec![] };
        let params = DetectionParameters::new(1.3, 7, BoxColor::GREEN).unwrap();
        detect(&mut classifier, blank(10, 10), &params).unwrap();

        let opts = classifier.seen[0];
        assert!((opts.scale_factor - 1.3).abs() < 1e-6);
        assert_eq!(opts.min_neighbors, 7);
        assert_eq!(opts.min_size, (30, 30));
    }

    #[test]
    fn test_draws_outline_in_box_color() {
        let mut classifier = FixedClassifier { faces: vec![face(10.0, 10.0, 20.0, 20.0)], seen: vec![] };
        let params = DetectionParameters::new(1.1, 5, BoxColor::new(255, 0, 0)).unwrap();
        let detection = detect(&mut classifier, blank(50, 50), &params).unwrap();
        assert_eq!(detection.face_count(), 1);

        let img = detection.frame.to_rgb8();
        // Outline: both rows/columns of the 2px band
        assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(11, 20).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(29, 29).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(20, 28).0, [255, 0, 0]);
        // Interior and exterior untouched
        assert_eq!(img.get_pixel(20, 20).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(12, 12).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(30, 30).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(9, 10).0, [0, 0, 0]);
    }

    #[test]
    fn test_box_clipped_to_frame() {
        let mut image = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        draw_box(&mut image, &face(-5.0, -5.0, 15.0, 100.0), BoxColor::GREEN, 2);
        let img = image.to_rgb8();
        // Right edge at x=9 is inside the frame
        assert_eq!(img.get_pixel(9, 5).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 0]);
    }

    #[test]
    fn test_box_outside_frame_is_ignored() {
        let mut image = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        draw_box(&mut image, &face(40.0, 40.0, 10.0, 10.0), BoxColor::GREEN, 2);
        assert!(image.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_gray_frame_outlined_with_luma() {
        let mut classifier = FixedClassifier { faces: vec![face(0.0, 0.0, 10.0, 10.0)], seen: vec![] };
        let frame = Frame::from_gray(GrayImage::new(10, 10), 0);
        let detection = detect(&mut classifier, frame, &DetectionParameters::default()).unwrap();
        assert_eq!(detection.frame.channels(), 1);
        assert_eq!(detection.frame.as_bytes()[0], BoxColor::GREEN.luma());
    }

    #[test]
    fn test_classifier_error_leaves_frame() {
        let mut frame = Frame::from_rgb(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])), 0);
        let before = frame.as_bytes().to_vec();
        let result = detect_in_place(&mut FailingClassifier, &mut frame, &DetectionParameters::default());
        assert!(result.is_err());
        assert_eq!(frame.as_bytes(), &before[..]);
    }
}
