//! beso-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access and conversion of raw capture
//! buffers into RGB frames.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream, DeviceInfo, FrameSource, PixelFormat};
pub use frame::{Frame, FrameError};
