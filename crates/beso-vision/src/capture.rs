//! Timer-driven capture loop.
//!
//! The loop runs on its own thread and owns the [`DetectionSession`] for as
//! long as it runs, so only one loop can drive a session at a time. Each tick
//! pulls one frame, runs detection, and hands the annotated frame to a
//! [`Renderer`]. Ticks use [`MissedTickBehavior::Delay`], so a slow frame
//! pushes the next tick back instead of queueing a burst.

use crate::recorder::RecordingSummary;
use crate::session::{DetectionSession, SessionError};
use crate::types::DetectionParameters;
use beso_hw::{CameraError, Frame, FrameSource};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to build capture runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("capture loop already exited")]
    ChannelClosed,
    #[error("capture thread exited without a result")]
    WorkerPanicked,
}

/// Receives every annotated frame. Returning `Break` ends the loop.
pub trait Renderer {
    fn render(&mut self, frame: &Frame, face_count: usize) -> ControlFlow<()>;
}

impl<F> Renderer for F
where
    F: FnMut(&Frame, usize) -> ControlFlow<()>,
{
    fn render(&mut self, frame: &Frame, face_count: usize) -> ControlFlow<()> {
        self(frame, face_count)
    }
}

/// Messages from the controlling side to the capture loop.
#[derive(Debug)]
pub enum CaptureCommand {
    SetParameters(DetectionParameters),
    StartRecording(PathBuf),
    StopRecording,
}

#[derive(Debug)]
pub enum ExitReason {
    /// Stop requested or the handle dropped.
    Stopped,
    /// The renderer asked to finish.
    RendererFinished,
    /// The frame source failed; the device is considered released.
    SourceFailed(CameraError),
    /// Detection or recording failed on a frame.
    DetectionFailed(SessionError),
}

/// What the loop hands back when it exits.
pub struct CaptureExit {
    pub session: DetectionSession,
    pub reason: ExitReason,
    pub frames: u64,
    /// Set when a recording was closed on the way out.
    pub recording: Option<RecordingSummary>,
}

/// Loop configuration.
#[derive(Debug, Clone)]
pub struct CaptureLoop {
    tick: Duration,
}

impl Default for CaptureLoop {
    fn default() -> Self {
        Self { tick: DEFAULT_TICK }
    }
}

impl CaptureLoop {
    pub fn with_tick(tick: Duration) -> Self {
        Self { tick }
    }

    /// Start the loop on a dedicated thread. The session moves into the loop
    /// and comes back in [`CaptureExit`].
    pub fn spawn<S, R>(
        &self,
        source: S,
        session: DetectionSession,
        renderer: R,
    ) -> Result<CaptureHandle, CaptureError>
    where
        S: FrameSource + Send + 'static,
        R: Renderer + Send + 'static,
    {
        // Capture and detection block, so the loop gets a runtime of its own
        // instead of borrowing a worker from the caller's.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(CaptureError::Runtime)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let tick = self.tick;

        std::thread::Builder::new()
            .name("beso-capture".into())
            .spawn(move || {
                let exit =
                    runtime.block_on(run_loop(source, session, renderer, rx, worker_cancel, tick));
                // The handle may be gone; nobody is left to collect the session.
                let _ = exit_tx.send(exit);
            })
            .map_err(CaptureError::Spawn)?;

        Ok(CaptureHandle {
            tx,
            cancel,
            exit: exit_rx,
        })
    }
}

/// Control handle for a running loop. Dropping it stops the loop.
pub struct CaptureHandle {
    tx: mpsc::UnboundedSender<CaptureCommand>,
    cancel: CancellationToken,
    exit: oneshot::Receiver<CaptureExit>,
}

impl CaptureHandle {
    pub fn send(&self, command: CaptureCommand) -> Result<(), CaptureError> {
        self.tx.send(command).map_err(|_| CaptureError::ChannelClosed)
    }

    pub fn set_parameters(&self, params: DetectionParameters) -> Result<(), CaptureError> {
        self.send(CaptureCommand::SetParameters(params))
    }

    pub fn start_recording(&self, path: PathBuf) -> Result<(), CaptureError> {
        self.send(CaptureCommand::StartRecording(path))
    }

    pub fn stop_recording(&self) -> Result<(), CaptureError> {
        self.send(CaptureCommand::StopRecording)
    }

    /// Ask the loop to stop after the current tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to exit. Resolves once; later calls report
    /// [`CaptureError::WorkerPanicked`].
    pub async fn finished(&mut self) -> Result<CaptureExit, CaptureError> {
        (&mut self.exit).await.map_err(|_| CaptureError::WorkerPanicked)
    }

    /// Blocking form of [`CaptureHandle::finished`], for callers outside a runtime.
    pub fn join(mut self) -> Result<CaptureExit, CaptureError> {
        self.exit.blocking_recv().map_err(|_| CaptureError::WorkerPanicked)
    }
}

async fn run_loop<S, R>(
    mut source: S,
    mut session: DetectionSession,
    mut renderer: R,
    mut rx: mpsc::UnboundedReceiver<CaptureCommand>,
    cancel: CancellationToken,
    tick: Duration,
) -> CaptureExit
where
    S: FrameSource,
    R: Renderer,
{
    tracing::info!(tick_ms = tick.as_millis() as u64, "capture loop started");

    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut frames = 0u64;

    let reason = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break ExitReason::Stopped,
            command = rx.recv() => match command {
                Some(command) => handle_command(command, &mut session, source.resolution()),
                None => break ExitReason::Stopped,
            },
            _ = ticker.tick() => match process_tick(&mut source, &mut session, &mut renderer) {
                Ok(flow) => {
                    frames += 1;
                    if flow.is_break() {
                        break ExitReason::RendererFinished;
                    }
                }
                Err(reason) => break reason,
            },
        }
    };

    let recording = finish_recording(&mut session);
    tracing::info!(frames, reason = ?reason, "capture loop exited");

    CaptureExit {
        session,
        reason,
        frames,
        recording,
    }
}

/// One frame: capture, detect, record, render.
fn process_tick<S, R>(
    source: &mut S,
    session: &mut DetectionSession,
    renderer: &mut R,
) -> Result<ControlFlow<()>, ExitReason>
where
    S: FrameSource,
    R: Renderer,
{
    let frame = source.capture_frame().map_err(|e| {
        tracing::warn!(error = %e, "frame capture failed; stopping capture loop");
        ExitReason::SourceFailed(e)
    })?;

    let count = session.process_captured(frame).map_err(|e| {
        tracing::warn!(error = %e, "frame processing failed; stopping capture loop");
        ExitReason::DetectionFailed(e)
    })?;

    Ok(match session.frame() {
        Some(frame) => renderer.render(frame, count),
        None => ControlFlow::Continue(()),
    })
}

fn handle_command(command: CaptureCommand, session: &mut DetectionSession, resolution: (u32, u32)) {
    match command {
        CaptureCommand::SetParameters(params) => {
            tracing::debug!(?params, "detection parameters updated");
            session.set_parameters(params);
        }
        CaptureCommand::StartRecording(path) => {
            if let Err(e) = session.start_recording(&path, resolution) {
                tracing::warn!(error = %e, path = %path.display(), "could not start recording");
            }
        }
        CaptureCommand::StopRecording => {
            if finish_recording(session).is_none() {
                tracing::warn!("stop requested but no recording is active");
            }
        }
    }
}

fn finish_recording(session: &mut DetectionSession) -> Option<RecordingSummary> {
    let handle = session.active_recording()?.clone();
    match session.stop_recording(handle) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(error = %e, "failed to finalize recording");
            None
        }
    }
}
