//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Buffers queued in the mmap stream.
const STREAM_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Anything that yields frames on demand: a live camera, a test fixture.
pub trait FrameSource {
    /// Pull the next frame. Blocks until one is available.
    fn capture_frame(&mut self) -> Result<Frame, CameraError>;

    /// Resolution reported by the device, as (width, height).
    fn resolution(&self) -> (u32, u32);
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// 8-bit grayscale (1 byte/pixel).
    Grey,
}

/// V4L2 camera device handle with a negotiated format.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0") and request
    /// the given capture resolution. The driver may negotiate another one;
    /// the negotiated size is what `width`/`height` report.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; monochrome sensors commonly come back as GREY.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = width;
        fmt.height = height;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = if fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV or GREY)"
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Start streaming. The stream stays open until the returned
    /// [`CameraStream`] is dropped; the first `warmup` buffers are discarded
    /// while exposure settles.
    pub fn into_stream(self, warmup: usize) -> Result<CameraStream, CameraError> {
        let stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        let mut stream = CameraStream {
            stream,
            width: self.width,
            height: self.height,
            pixel_format: self.pixel_format,
            sequence: 0,
            _device: self.device,
        };

        for _ in 0..warmup {
            stream.dequeue()?;
        }
        tracing::info!(
            width = stream.width,
            height = stream.height,
            format = ?stream.pixel_format,
            warmup,
            "camera streaming"
        );
        Ok(stream)
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

/// A camera that is streaming. Buffers are dequeued from one long-lived
/// mmap stream; frames are numbered from 1 in capture order.
pub struct CameraStream {
    stream: MmapStream<'static>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    sequence: u32,
    // Declared last so the stream is torn down before the device closes.
    _device: Device,
}

impl CameraStream {
    fn dequeue(&mut self) -> Result<image::RgbImage, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        tracing::trace!(driver_sequence = meta.sequence, bytes = buf.len(), "buffer dequeued");
        buffer_to_rgb(self.pixel_format, buf, self.width, self.height)
    }
}

impl FrameSource for CameraStream {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let rgb = self.dequeue()?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Frame::from_rgb(rgb, self.sequence))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Convert one raw capture buffer to RGB according to its pixel format.
fn buffer_to_rgb(
    format: PixelFormat,
    buf: &[u8],
    width: u32,
    height: u32,
) -> Result<image::RgbImage, CameraError> {
    let converted = match format {
        PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, width, height),
        PixelFormat::Grey => frame::grey_to_rgb(buf, width, height),
    };
    converted.map_err(|e| CameraError::CaptureFailed(format!("{format:?} conversion failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        assert!(matches!(
            Camera::open("/dev/video-missing", 320, 240),
            Err(CameraError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_buffer_to_rgb_by_format() {
        let grey = buffer_to_rgb(PixelFormat::Grey, &[10, 20, 30, 40], 2, 2).unwrap();
        assert_eq!(grey.get_pixel(1, 1).0, [40, 40, 40]);

        let yuyv = buffer_to_rgb(PixelFormat::Yuyv, &[16, 128, 235, 128], 2, 1).unwrap();
        assert_eq!(yuyv.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_short_buffer_is_a_capture_error() {
        let err = buffer_to_rgb(PixelFormat::Yuyv, &[0; 6], 2, 2).unwrap_err();
        assert!(matches!(err, CameraError::CaptureFailed(ref msg) if msg.contains("Yuyv")));
    }
}
