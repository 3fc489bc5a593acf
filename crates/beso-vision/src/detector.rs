//! SCRFD face classifier via ONNX Runtime.
//!
//! Runs the SCRFD (Sample and Computation Redistribution for Efficient Face
//! Detection) model with 3-stride anchor-free decoding, then merges the raw
//! candidates with NMS. The scan options map onto the network like a cascade
//! scan: a coarser `scale_factor` shrinks the network input, `min_neighbors`
//! is the number of raw candidates a merged box must absorb, and `min_size`
//! drops small boxes.

use crate::classifier::{ClassifierError, FaceClassifier, ScanOptions};
use crate::types::BoundingBox;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const SCRFD_BASE_INPUT_SIZE: usize = 640;
const SCRFD_MIN_INPUT_SIZE: usize = 160;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Output tensor indices for one stride: (score_idx, bbox_idx).
type StrideOutputIndices = (usize, usize);

/// SCRFD-backed [`FaceClassifier`].
pub struct OnnxFaceClassifier {
    session: Session,
    /// Per-stride output indices [(score, bbox)] for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
}

impl OnnxFaceClassifier {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < 6 {
            return Err(ClassifierError::InferenceFailed(format!(
                "SCRFD model requires at least 6 outputs (3 strides × score/bbox), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            stride_indices,
        })
    }
}

impl FaceClassifier for OnnxFaceClassifier {
    fn detect_multi_scale(
        &mut self,
        gray: &GrayImage,
        options: &ScanOptions,
    ) -> Result<Vec<BoundingBox>, ClassifierError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let input_size = input_size_for(options.scale_factor);
        let (input, letterbox) = preprocess(gray.as_raw(), width as usize, height as usize, input_size);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifierError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifierError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;

            candidates.extend(decode_stride(
                scores,
                bboxes,
                stride,
                input_size,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        let raw = candidates.len();
        let faces = filter_faces(nms(candidates, SCRFD_NMS_THRESHOLD), options);
        tracing::debug!(raw, kept = faces.len(), input_size, "SCRFD scan");

        Ok(faces)
    }
}

/// Network input side for a given pyramid step: `640 / scale_factor`,
/// rounded down to the coarsest stride and floored at 160.
fn input_size_for(scale_factor: f32) -> usize {
    let step = scale_factor.max(1.0);
    let side = (SCRFD_BASE_INPUT_SIZE as f32 / step) as usize;
    let aligned = side / 32 * 32;
    aligned.clamp(SCRFD_MIN_INPUT_SIZE, SCRFD_BASE_INPUT_SIZE)
}

/// Drop merged boxes that absorbed too few candidates or are too small.
fn filter_faces(merged: Vec<BoundingBox>, options: &ScanOptions) -> Vec<BoundingBox> {
    let (min_w, min_h) = options.min_size;
    merged
        .into_iter()
        .filter(|b| b.neighbors >= options.min_neighbors)
        .filter(|b| b.width >= min_w as f32 && b.height >= min_h as f32)
        .collect()
}

/// Preprocess a grayscale frame into a square NCHW float tensor with letterbox padding.
fn preprocess(
    frame: &[u8],
    width: usize,
    height: usize,
    input_size: usize,
) -> (Array4<f32>, LetterboxInfo) {
    let scale_w = input_size as f32 / width as f32;
    let scale_h = input_size as f32 / height as f32;
    let scale = scale_w.min(scale_h);

    let new_w = ((width as f32 * scale).round() as usize).clamp(1, input_size);
    let new_h = ((height as f32 * scale).round() as usize).clamp(1, input_size);
    let pad_x = (input_size - new_w) as f32 / 2.0;
    let pad_y = (input_size - new_h) as f32 / 2.0;

    let letterbox = LetterboxInfo { scale, pad_x, pad_y };
    let resized = resize_bilinear(frame, width, height, new_w, new_h);

    let pad_x_start = pad_x.floor() as usize;
    let pad_y_start = pad_y.floor() as usize;

    let mut tensor = Array4::<f32>::zeros((1, 3, input_size, input_size));

    for y in 0..input_size {
        for x in 0..input_size {
            let pixel = if y >= pad_y_start
                && y < pad_y_start + new_h
                && x >= pad_x_start
                && x < pad_x_start + new_w
            {
                resized[(y - pad_y_start) * new_w + (x - pad_x_start)] as f32
            } else {
                SCRFD_MEAN // pad value normalizes to 0.0
            };

            let normalized = (pixel - SCRFD_MEAN) / SCRFD_STD;
            // Replicate luma into all three input channels
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    (tensor, letterbox)
}

fn resize_bilinear(frame: &[u8], width: usize, height: usize, new_w: usize, new_h: usize) -> Vec<u8> {
    let inv_scale_x = width as f32 / new_w as f32;
    let inv_scale_y = height as f32 / new_h as f32;
    let mut resized = vec![0u8; new_w * new_h];

    for y in 0..new_h {
        let src_y = (y as f32 + 0.5) * inv_scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..new_w {
            let src_x = (x as f32 + 0.5) * inv_scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = frame[y0 * width + x0] as f32;
            let tr = frame[y0 * width + x1] as f32;
            let bl = frame[y1 * width + x0] as f32;
            let br = frame[y1 * width + x1] as f32;

            let val = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            resized[y * new_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    resized
}

/// Discover score/bbox output tensors by name ("score_8", "bbox_16", ...).
///
/// Falls back to the standard positional ordering when names are generic:
///   [0-2] = scores (strides 8, 16, 32)
///   [3-5] = bboxes (strides 8, 16, 32)
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let mut named = [(0usize, 0usize); 3];
    for (i, &stride) in SCRFD_STRIDES.iter().enumerate() {
        match (find("score", stride), find("bbox", stride)) {
            (Some(score), Some(bbox)) => named[i] = (score, bbox),
            _ => {
                tracing::info!(
                    ?names,
                    "SCRFD: output names not recognized, using positional mapping [0-2]=scores, [3-5]=bboxes"
                );
                return [(0, 3), (1, 4), (2, 5)];
            }
        }
    }

    tracing::info!("SCRFD: using name-based output tensor mapping");
    named
}

/// Decode candidate boxes for a single stride level.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    input_size: usize,
    letterbox: &LetterboxInfo,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = input_size / stride;
    let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;

    let mut detections = Vec::new();

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let anchor_idx = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_cx = (anchor_idx % grid) as f32 * stride as f32;
        let anchor_cy = (anchor_idx / grid) as f32 * stride as f32;

        // [x1_offset, y1_offset, x2_offset, y2_offset] * stride
        let bbox_off = idx * 4;
        if bbox_off + 3 >= bboxes.len() {
            continue;
        }
        let x1 = anchor_cx - bboxes[bbox_off] * stride as f32;
        let y1 = anchor_cy - bboxes[bbox_off + 1] * stride as f32;
        let x2 = anchor_cx + bboxes[bbox_off + 2] * stride as f32;
        let y2 = anchor_cy + bboxes[bbox_off + 3] * stride as f32;

        let orig_x1 = (x1 - letterbox.pad_x) / letterbox.scale;
        let orig_y1 = (y1 - letterbox.pad_y) / letterbox.scale;
        let orig_x2 = (x2 - letterbox.pad_x) / letterbox.scale;
        let orig_y2 = (y2 - letterbox.pad_y) / letterbox.scale;

        detections.push(BoundingBox {
            x: orig_x1,
            y: orig_y1,
            width: orig_x2 - orig_x1,
            height: orig_y2 - orig_y1,
            confidence: score,
            neighbors: 1,
        });
    }

    detections
}

/// Non-Maximum Suppression. Each kept box records how many candidates it
/// suppressed (plus itself) in `neighbors`.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        let mut neighbors = 1u32;

        for j in (i + 1)..detections.len() {
            if suppressed[j] {
                continue;
            }
            if iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
                neighbors += 1;
            }
        }

        let mut kept = detections[i].clone();
        kept.neighbors = neighbors;
        keep.push(kept);
    }

    keep
}

/// Compute Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_w = (x2 - x1).max(0.0);
    let inter_h = (y2 - y1).max(0.0);
    let inter_area = inter_w * inter_h;

    let area_a = a.width * a.height;
    let area_b = b.width * b.height;
    let union_area = area_a + area_b - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bbox(x: f32, y: f32, w: f32, h: f32, conf: f32) -> BoundingBox {
        BoundingBox {
            x, y, width: w, height: h, confidence: conf, neighbors: 1,
        }
    }

    fn options(min_neighbors: u32) -> ScanOptions {
        ScanOptions {
            scale_factor: 1.1,
            min_neighbors,
            min_size: (30, 30),
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = make_bbox(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(20.0, 20.0, 10.0, 10.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(5.0, 0.0, 10.0, 10.0, 1.0);
        // Overlap: 5x10 = 50, union: 100+100-50 = 150
        let expected = 50.0 / 150.0;
        assert!((iou(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_nms_counts_neighbors() {
        let detections = vec![
            make_bbox(0.0, 0.0, 100.0, 100.0, 0.9),
            make_bbox(5.0, 5.0, 100.0, 100.0, 0.8),
            make_bbox(2.0, 2.0, 100.0, 100.0, 0.6),
            make_bbox(200.0, 200.0, 50.0, 50.0, 0.7),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(result[0].neighbors, 3);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
        assert_eq!(result[1].neighbors, 1);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_filter_by_min_neighbors() {
        let mut strong = make_bbox(0.0, 0.0, 80.0, 80.0, 0.9);
        strong.neighbors = 5;
        let mut weak = make_bbox(200.0, 0.0, 80.0, 80.0, 0.9);
        weak.neighbors = 2;

        let kept = filter_faces(vec![strong.clone(), weak.clone()], &options(3));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].neighbors, 5);

        let kept = filter_faces(vec![strong, weak], &options(1));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_filter_by_min_size() {
        let tiny = make_bbox(0.0, 0.0, 20.0, 50.0, 0.9);
        let ok = make_bbox(0.0, 0.0, 30.0, 30.0, 0.9);
        let kept = filter_faces(vec![tiny, ok], &options(1));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].width, 30.0);
    }

    #[test]
    fn test_input_size_tracks_scale_factor() {
        assert_eq!(input_size_for(1.01), 608);
        assert_eq!(input_size_for(1.1), 576);
        assert_eq!(input_size_for(2.0), 320);
        // Floors at the minimum input side
        assert_eq!(input_size_for(10.0), 160);
        // Always a multiple of the coarsest stride
        for step in [1.05f32, 1.3, 1.7, 1.99] {
            assert_eq!(input_size_for(step) % 32, 0);
        }
    }

    #[test]
    fn test_letterbox_decode_maps_back_to_frame() {
        // A 320x240 frame letterboxed into 320x320: scale 1, pad_y 40
        let letterbox = LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 40.0 };
        // One anchor cell at stride 32 (grid 10x10), first anchor at (0,0)
        let mut scores = vec![0.0f32; 10 * 10 * 2];
        let mut bboxes = vec![0.0f32; 10 * 10 * 2 * 4];
        // Anchor index 22 → cell 11 → (cx, cy) = (1, 1) * 32
        scores[22] = 0.9;
        bboxes[88..92].copy_from_slice(&[0.5, 0.5, 0.5, 0.5]);

        let dets = decode_stride(&scores, &bboxes, 32, 320, &letterbox, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x - 16.0).abs() < 1e-4, "x={}", d.x);
        assert!((d.y - (16.0 - 40.0)).abs() < 1e-4, "y={}", d.y);
        assert!((d.width - 32.0).abs() < 1e-4);
        assert!((d.height - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names: Vec<String> = [
            "score_8", "score_16", "score_32",
            "bbox_8",  "bbox_16",  "bbox_32",
            "kps_8",   "kps_16",   "kps_32",
        ].iter().map(|s| s.to_string()).collect();

        assert_eq!(discover_output_indices(&names), [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_discover_output_indices_shuffled_named() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ].iter().map(|s| s.to_string()).collect();

        assert_eq!(discover_output_indices(&names), [(2, 0), (5, 3), (8, 6)]);
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_output_indices(&names), [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_bilinear_resize_uniform() {
        let frame = vec![128u8; 100 * 100];
        let resized = resize_bilinear(&frame, 100, 100, 200, 150);
        assert_eq!(resized.len(), 200 * 150);
        assert!(resized.iter().all(|&p| p == 128), "uniform resize should stay uniform");
    }

    #[test]
    fn test_preprocess_pads_with_mean() {
        let frame = vec![255u8; 64 * 32];
        let (tensor, letterbox) = preprocess(&frame, 64, 32, 160);
        assert!((letterbox.scale - 2.5).abs() < 1e-6);
        assert!((letterbox.pad_y - 40.0).abs() < 1e-6);
        // Top padding row normalizes to zero, image rows are positive
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert!(tensor[[0, 0, 80, 80]] > 0.9);
    }
}
