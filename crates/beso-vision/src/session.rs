//! Detection session: the one owner of the current frame, the live
//! parameters, the classifier and any open recording.

use crate::annotate::{self, Detection};
use crate::classifier::{ClassifierError, FaceClassifier};
use crate::filter::{self, FilterKind};
use crate::recorder::{Recorder, RecorderError, RecordingSummary, DEFAULT_RECORD_FPS};
use crate::types::{BoxColor, DetectionParameters, ParameterError};
use beso_hw::Frame;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed canvas size loaded images are resized to, as (width, height).
pub const CANVAS_SIZE: (u32, u32) = (340, 380);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to open image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to save image {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write stats to {path}: {source}")]
    StatsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no image loaded")]
    NoImage,
    #[error("unknown filter {0:?}: please select a valid filter (grayscale or sepia)")]
    UnknownFilter(String),
    #[error("already recording to {0}")]
    AlreadyRecording(PathBuf),
    #[error("no recording in progress")]
    NotRecording,
    #[error("recording handle does not match the active recording")]
    StaleRecordingHandle,
    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("recorder: {0}")]
    Recorder(#[from] RecorderError),
    #[error("{0}")]
    Parameters(#[from] ParameterError),
}

/// Ticket for an open recording, returned by
/// [`DetectionSession::start_recording`] and redeemed by
/// [`DetectionSession::stop_recording`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingHandle {
    id: u64,
    path: PathBuf,
}

impl RecordingHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct DetectionSession {
    classifier: Box<dyn FaceClassifier + Send>,
    params: DetectionParameters,
    frame: Option<Frame>,
    last_face_count: Option<usize>,
    recording: Option<(RecordingHandle, Recorder)>,
    record_fps: f32,
    next_recording_id: u64,
}

impl DetectionSession {
    pub fn new(classifier: Box<dyn FaceClassifier + Send>) -> Self {
        Self {
            classifier,
            params: DetectionParameters::default(),
            frame: None,
            last_face_count: None,
            recording: None,
            record_fps: DEFAULT_RECORD_FPS,
            next_recording_id: 0,
        }
    }

    pub fn with_parameters(mut self, params: DetectionParameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_record_fps(mut self, fps: f32) -> Self {
        self.record_fps = fps;
        self
    }

    pub fn parameters(&self) -> &DetectionParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: DetectionParameters) {
        self.params = params;
    }

    pub fn set_scale_factor(&mut self, value: f32) -> Result<(), SessionError> {
        Ok(self.params.set_scale_factor(value)?)
    }

    pub fn set_min_neighbors(&mut self, value: u32) -> Result<(), SessionError> {
        Ok(self.params.set_min_neighbors(value)?)
    }

    pub fn set_box_color(&mut self, color: BoxColor) {
        self.params.set_box_color(color);
    }

    /// The current frame: last loaded image or last processed capture.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Face count from the most recent detection on the current frame.
    pub fn last_face_count(&self) -> Option<usize> {
        self.last_face_count
    }

    /// Decode an image file and make it the current frame, resized to the canvas.
    pub fn load_image(&mut self, path: &Path) -> Result<&Frame, SessionError> {
        let decoded = image::open(path).map_err(|source| SessionError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let (width, height) = CANVAS_SIZE;
        let resized = decoded.resize_exact(width, height, FilterType::Triangle);

        tracing::info!(
            path = %path.display(),
            original = ?(decoded.width(), decoded.height()),
            "image loaded"
        );

        self.last_face_count = None;
        Ok(self.frame.insert(Frame::new(resized, 0)))
    }

    /// Detect faces on `frame` with the session's classifier and parameters.
    pub fn detect(&mut self, frame: Frame) -> Result<Detection, SessionError> {
        Ok(annotate::detect(&mut self.classifier, frame, &self.params)?)
    }

    /// Annotate the current frame in place and return the face count.
    pub fn detect_loaded(&mut self) -> Result<usize, SessionError> {
        let frame = self.frame.as_mut().ok_or(SessionError::NoImage)?;
        let faces = annotate::detect_in_place(&mut self.classifier, frame, &self.params)?;
        self.last_face_count = Some(faces.len());
        Ok(faces.len())
    }

    /// Annotate a freshly captured frame, append it to the active recording
    /// and make it the current frame.
    pub fn process_captured(&mut self, frame: Frame) -> Result<usize, SessionError> {
        let detection = self.detect(frame)?;
        let count = detection.face_count();

        if let Some((_, recorder)) = self.recording.as_mut() {
            recorder.append(&detection.frame)?;
        }

        self.frame = Some(detection.frame);
        self.last_face_count = Some(count);
        Ok(count)
    }

    /// Apply a filter by name to the current frame.
    ///
    /// An unrecognized name leaves the frame untouched and is reported both
    /// as a warning and as [`SessionError::UnknownFilter`].
    pub fn apply_filter(&mut self, name: &str) -> Result<FilterKind, SessionError> {
        if self.frame.is_none() {
            return Err(SessionError::NoImage);
        }
        match name.parse::<FilterKind>() {
            Ok(kind) => self.apply(kind),
            Err(_) => {
                tracing::warn!(filter = name, "unknown filter; frame left unchanged");
                Err(SessionError::UnknownFilter(name.to_string()))
            }
        }
    }

    /// Apply an already-validated filter to the current frame.
    pub fn apply(&mut self, kind: FilterKind) -> Result<FilterKind, SessionError> {
        let frame = self.frame.as_mut().ok_or(SessionError::NoImage)?;
        filter::apply_filter(frame, kind);
        tracing::info!(filter = %kind, "filter applied");
        Ok(kind)
    }

    /// Write the current frame; the format follows the file extension.
    pub fn save_image(&self, path: &Path) -> Result<(), SessionError> {
        let frame = self.frame.as_ref().ok_or(SessionError::NoImage)?;
        frame.image.save(path).map_err(|source| SessionError::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "image saved");
        Ok(())
    }

    /// Plain-text statistics report for the current parameters.
    pub fn stats_report(&self) -> String {
        let faces = self
            .last_face_count
            .map(|n| n.to_string())
            .unwrap_or_default();
        format!(
            "Detection Parameters:\nScale Factor: {}\nMin Neighbors: {}\nFaces Detected: {}",
            self.params.scale_factor(),
            self.params.min_neighbors(),
            faces
        )
    }

    pub fn save_stats(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.stats_report()).map_err(|source| SessionError::StatsWrite {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "stats saved");
        Ok(())
    }

    /// Open a recording sink at the session frame rate and the capture
    /// device's resolution.
    pub fn start_recording(
        &mut self,
        path: &Path,
        resolution: (u32, u32),
    ) -> Result<RecordingHandle, SessionError> {
        if let Some((active, _)) = &self.recording {
            return Err(SessionError::AlreadyRecording(active.path.clone()));
        }

        let recorder = Recorder::create(path, self.record_fps, resolution)?;
        let handle = RecordingHandle {
            id: self.next_recording_id,
            path: path.to_path_buf(),
        };
        self.next_recording_id += 1;
        self.recording = Some((handle.clone(), recorder));
        Ok(handle)
    }

    pub fn stop_recording(&mut self, handle: RecordingHandle) -> Result<RecordingSummary, SessionError> {
        match self.recording.take() {
            None => Err(SessionError::NotRecording),
            Some((active, recorder)) if active == handle => Ok(recorder.finish()?),
            Some(other) => {
                self.recording = Some(other);
                Err(SessionError::StaleRecordingHandle)
            }
        }
    }

    pub fn active_recording(&self) -> Option<&RecordingHandle> {
        self.recording.as_ref().map(|(handle, _)| handle)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }
}
