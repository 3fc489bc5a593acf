//! beso-vision — Face detection tool core.
//!
//! Holds the detection session (current frame, live parameters, recording),
//! the image filters, and the timer-driven camera capture loop. Detection
//! itself is delegated to a [`FaceClassifier`]; the bundled backend runs an
//! SCRFD model through ONNX Runtime.

pub mod annotate;
pub mod capture;
pub mod classifier;
pub mod detector;
pub mod filter;
pub mod recorder;
pub mod session;
pub mod types;

pub use annotate::{detect, Detection};
pub use capture::{CaptureCommand, CaptureExit, CaptureHandle, CaptureLoop, ExitReason, Renderer};
pub use classifier::{ClassifierError, FaceClassifier, ScanOptions};
pub use detector::OnnxFaceClassifier;
pub use filter::FilterKind;
pub use recorder::{Recorder, RecordingSummary};
pub use session::{DetectionSession, RecordingHandle, SessionError};
pub use types::{BoundingBox, BoxColor, DetectionParameters, ParameterError};

/// File name of the SCRFD detection model inside the model directory.
pub const DETECTION_MODEL_FILE: &str = "det_10g.onnx";
