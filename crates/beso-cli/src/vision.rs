//! Face detection commands: still images, live camera, device listing.

use crate::config::Config;
use anyhow::{bail, Context, Result};
use beso_hw::{Camera, Frame};
use beso_vision::{
    BoxColor, CaptureLoop, DetectionParameters, DetectionSession, ExitReason, FilterKind,
    OnnxFaceClassifier,
};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

pub const CAMERA_RESOLUTION: (u32, u32) = (320, 240);

/// Detection controls shared by `detect` and `camera`.
#[derive(Debug, Clone, clap::Args)]
pub struct DetectArgs {
    /// Pyramid scale step (must be > 1.0)
    #[arg(long, default_value_t = beso_vision::types::DEFAULT_SCALE_FACTOR)]
    pub scale_factor: f32,
    /// Minimum merged candidates per reported face (>= 1)
    #[arg(long, default_value_t = beso_vision::types::DEFAULT_MIN_NEIGHBORS)]
    pub min_neighbors: u32,
    /// Box color as #rrggbb
    #[arg(long, default_value = "#00ff00")]
    pub color: BoxColor,
}

impl DetectArgs {
    pub fn parameters(&self) -> Result<DetectionParameters> {
        Ok(DetectionParameters::new(
            self.scale_factor,
            self.min_neighbors,
            self.color,
        )?)
    }
}

fn open_session(config: &Config, args: &DetectArgs) -> Result<DetectionSession> {
    let model = config.detection_model_path();
    let classifier = OnnxFaceClassifier::load(&model)
        .with_context(|| format!("loading detection model {}", model.display()))?;
    Ok(DetectionSession::new(Box::new(classifier))
        .with_parameters(args.parameters()?)
        .with_record_fps(config.record_fps))
}

pub struct DetectOptions<'a> {
    pub image: &'a Path,
    pub args: &'a DetectArgs,
    pub filter: Option<FilterKind>,
    pub output: Option<&'a Path>,
    pub stats: Option<&'a Path>,
}

/// `beso detect`: annotate one image, optionally filter and save it.
pub fn detect(config: &Config, opts: DetectOptions<'_>) -> Result<()> {
    let mut session = open_session(config, opts.args)?;
    session.load_image(opts.image)?;
    let faces = session.detect_loaded()?;
    println!("Faces Detected: {faces}");

    if let Some(kind) = opts.filter {
        session.apply(kind)?;
    }
    if let Some(path) = opts.output {
        session.save_image(path)?;
        println!("Image saved to {}", path.display());
    }
    if let Some(path) = opts.stats {
        session.save_stats(path)?;
        println!("Stats saved to {}", path.display());
    }
    Ok(())
}

pub struct CameraOptions<'a> {
    pub device: Option<&'a str>,
    pub args: &'a DetectArgs,
    /// Stop after this many frames; run until Ctrl-C otherwise.
    pub frames: Option<u64>,
    pub record: Option<PathBuf>,
    pub snapshot: Option<&'a Path>,
    pub stats: Option<&'a Path>,
}

/// `beso camera`: live detection until Ctrl-C, the frame limit, or a
/// camera failure.
pub async fn camera(config: &Config, opts: CameraOptions<'_>) -> Result<()> {
    let session = open_session(config, opts.args)?;
    let device = opts.device.unwrap_or(&config.camera_device);
    let (width, height) = CAMERA_RESOLUTION;
    let camera = Camera::open(device, width, height)
        .with_context(|| format!("opening camera {device}"))?;
    tracing::info!(device, format = ?camera.pixel_format(), "camera ready");
    let stream = camera
        .into_stream(config.warmup_frames)
        .with_context(|| format!("starting capture on {device}"))?;

    let renderer = face_count_printer(opts.frames);
    let mut handle = CaptureLoop::with_tick(config.capture_tick).spawn(stream, session, renderer)?;
    if let Some(path) = opts.record {
        println!("Recording to {}", path.display());
        handle.start_recording(path)?;
    }

    let exit = tokio::select! {
        exit = handle.finished() => exit?,
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("interrupted; stopping capture");
            handle.stop();
            handle.finished().await?
        }
    };

    println!("Captured {} frames", exit.frames);
    if let Some(summary) = &exit.recording {
        println!(
            "Recording saved to {} ({} frames, {:.1}s)",
            summary.path.display(),
            summary.frame_count,
            summary.duration_secs
        );
    }
    if let Some(path) = opts.snapshot {
        exit.session.save_image(path)?;
        println!("Snapshot saved to {}", path.display());
    }
    if let Some(path) = opts.stats {
        exit.session.save_stats(path)?;
        println!("Stats saved to {}", path.display());
    }

    match exit.reason {
        ExitReason::Stopped | ExitReason::RendererFinished => Ok(()),
        ExitReason::SourceFailed(e) => bail!("camera stopped: {e}"),
        ExitReason::DetectionFailed(e) => bail!("detection stopped: {e}"),
    }
}

/// Renderer that prints the face count whenever it changes and stops after
/// `limit` frames.
fn face_count_printer(limit: Option<u64>) -> impl FnMut(&Frame, usize) -> ControlFlow<()> + Send {
    let mut last = None;
    let mut seen = 0u64;
    move |_frame, count| {
        seen += 1;
        if last != Some(count) {
            println!("Faces Detected: {count}");
            last = Some(count);
        }
        if limit.is_some_and(|limit| seen >= limit) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// `beso devices`: list V4L2 capture devices.
pub fn devices() -> Result<()> {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No video capture devices found");
        return Ok(());
    }
    for dev in devices {
        println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
    }
    Ok(())
}
