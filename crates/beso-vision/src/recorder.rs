//! Frame-sequence recording sink.
//!
//! A recording is a directory of numbered JPEG frames plus a
//! `recording.json` manifest carrying the frame rate and resolution, so any
//! encoder can turn it into a container later.

use beso_hw::Frame;
use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_RECORD_FPS: f32 = 20.0;
pub const MANIFEST_FILE: &str = "recording.json";

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("recording I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("recording directory {0} is not empty")]
    DirectoryNotEmpty(PathBuf),
    #[error("invalid recording format: {width}x{height} at {fps} fps")]
    InvalidFormat { width: u32, height: u32, fps: f32 },
    #[error("frame encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingManifest {
    pub fps: f32,
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub frame_count: u64,
    /// Playback length at the recording frame rate.
    pub duration_secs: f32,
}

/// An open recording. Dropping it without [`Recorder::finish`] leaves the
/// frames on disk with an unfinished manifest.
pub struct Recorder {
    dir: PathBuf,
    manifest: RecordingManifest,
}

impl Recorder {
    /// Open a new recording in `dir` (created if missing, must be empty).
    pub fn create(dir: &Path, fps: f32, resolution: (u32, u32)) -> Result<Self, RecorderError> {
        let (width, height) = resolution;
        if width == 0 || height == 0 || !(fps > 0.0) {
            return Err(RecorderError::InvalidFormat { width, height, fps });
        }

        std::fs::create_dir_all(dir).map_err(|source| RecorderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut entries = std::fs::read_dir(dir).map_err(|source| RecorderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if entries.next().is_some() {
            return Err(RecorderError::DirectoryNotEmpty(dir.to_path_buf()));
        }

        let recorder = Self {
            dir: dir.to_path_buf(),
            manifest: RecordingManifest {
                fps,
                width,
                height,
                frame_count: 0,
                started_at: Utc::now(),
                finished_at: None,
            },
        };
        recorder.write_manifest()?;

        tracing::info!(path = %dir.display(), width, height, fps, "recording started");
        Ok(recorder)
    }

    /// Append one frame, resized to the recording resolution when needed.
    pub fn append(&mut self, frame: &Frame) -> Result<(), RecorderError> {
        let mut rgb = frame.to_rgb8();
        let (width, height) = (self.manifest.width, self.manifest.height);
        if rgb.dimensions() != (width, height) {
            rgb = image::imageops::resize(&rgb, width, height, FilterType::Triangle);
        }

        let path = self.frame_path(self.manifest.frame_count);
        rgb.save(&path)?;
        self.manifest.frame_count += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.manifest.frame_count
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Close the recording and write the final manifest.
    pub fn finish(mut self) -> Result<RecordingSummary, RecorderError> {
        self.manifest.finished_at = Some(Utc::now());
        self.write_manifest()?;

        let summary = RecordingSummary {
            path: self.dir.clone(),
            frame_count: self.manifest.frame_count,
            duration_secs: self.manifest.frame_count as f32 / self.manifest.fps,
        };
        tracing::info!(
            path = %summary.path.display(),
            frames = summary.frame_count,
            "recording stopped"
        );
        Ok(summary)
    }

    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.jpg"))
    }

    fn write_manifest(&self) -> Result<(), RecorderError> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&self.manifest)?;
        std::fs::write(&path, json).map_err(|source| RecorderError::Io { path, source })
    }
}

/// Read back a recording manifest.
pub fn read_manifest(dir: &Path) -> Result<RecordingManifest, RecorderError> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = std::fs::read(&path).map_err(|source| RecorderError::Io { path, source })?;
    Ok(serde_json::from_slice(&bytes)?)
}
