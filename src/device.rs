//! V4L2 capture source using the v4l crate.

use std::path::Path;

use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as V4lCaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::Device;

use crate::convert;
use crate::error::{CaptureError, Result};
use crate::traits::{CaptureSource, FourCC, Image, Property};

/// Number of mmap buffers requested for streaming.
pub const DEFAULT_BUFFER_COUNT: u32 = 4;

const SUPPORTED_FOURCCS: [FourCC; 4] = [FourCC::YUYV, FourCC::MJPG, FourCC::RGB3, FourCC::BGR3];

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// V4L2 capture source.
///
/// The mmap stream is created on the first read and torn down whenever the
/// frame size or rate changes, since drivers refuse format changes while
/// streaming.
pub struct V4L2Device {
    device: Device,
    label: String,
    capabilities: DeviceCapabilities,
    width: u32,
    height: u32,
    fourcc: FourCC,
    stream: Option<Stream<'static>>,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        let label = format!("device_id {index}");
        let device = Device::new(index as usize)
            .map_err(|err| CaptureError::Device(format!("{label} cannot be opened: {err}")))?;
        Self::configure(device, label)
    }

    /// Open a V4L2 device by path (e.g., /dev/video0).
    pub fn open_path(path: &Path) -> Result<Self> {
        let label = format!("device_path {}", path.display());
        let device = Device::with_path(path)
            .map_err(|err| CaptureError::Device(format!("{label} cannot be opened: {err}")))?;
        Self::configure(device, label)
    }

    fn configure(device: Device, label: String) -> Result<Self> {
        let open_failed =
            |reason: String| CaptureError::Device(format!("{label} cannot be opened: {reason}"));

        let caps = device
            .query_caps()
            .map_err(|err| open_failed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };
        if !capabilities.can_capture || !capabilities.can_stream {
            return Err(open_failed("not a streaming capture device".to_owned()));
        }

        let mut format = device.format().map_err(|err| open_failed(err.to_string()))?;
        if !SUPPORTED_FOURCCS.contains(&FourCC::from(format.fourcc)) {
            format.fourcc = FourCC::YUYV.into();
            format = device
                .set_format(&format)
                .map_err(|err| open_failed(err.to_string()))?;
        }
        let fourcc = FourCC::from(format.fourcc);
        if !SUPPORTED_FOURCCS.contains(&fourcc) {
            return Err(open_failed(format!("pixel format {fourcc} is not supported")));
        }

        log::info!(
            "{label}: {} ({}) {}x{} {fourcc}",
            capabilities.card,
            capabilities.driver,
            format.width,
            format.height
        );

        Ok(Self {
            device,
            label,
            capabilities,
            width: format.width,
            height: format.height,
            fourcc,
            stream: None,
        })
    }

    /// Get device capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn stream(&mut self) -> Result<&mut Stream<'static>> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => Stream::with_buffers(&self.device, Type::VideoCapture, DEFAULT_BUFFER_COUNT)
                .map_err(|err| CaptureError::Stream(err.to_string()))?,
        };
        Ok(self.stream.insert(stream))
    }

    fn set_size(&mut self, width: Option<u32>, height: Option<u32>) -> std::io::Result<()> {
        self.stream = None;
        let mut format = self.device.format()?;
        if let Some(width) = width {
            format.width = width;
        }
        if let Some(height) = height {
            format.height = height;
        }
        let format = self.device.set_format(&format)?;
        self.width = format.width;
        self.height = format.height;
        self.fourcc = FourCC::from(format.fourcc);
        log::info!("{}: frame size now {}x{}", self.label, self.width, self.height);
        Ok(())
    }

    fn set_fps(&mut self, fps: u32) -> std::io::Result<()> {
        self.stream = None;
        self.device.set_params(&Parameters::with_fps(fps))?;
        Ok(())
    }
}

fn property_error<R: ToString>(property: Property, value: f64, reason: R) -> CaptureError {
    CaptureError::Property {
        property,
        value,
        reason: reason.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(property: Property, value: f64) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Ok(value.round() as u32)
    } else {
        Err(property_error(property, value, "value out of range"))
    }
}

impl CaptureSource for V4L2Device {
    fn read(&mut self) -> Result<Option<Image>> {
        let (fourcc, width, height) = (self.fourcc, self.width, self.height);
        let stream = self.stream()?;
        let (buf, meta) = stream
            .next()
            .map_err(|err| CaptureError::Stream(err.to_string()))?;

        let used = meta.bytesused as usize;
        let data = if used == 0 {
            buf
        } else {
            buf.get(..used).unwrap_or(buf)
        };

        convert::to_bgr(fourcc, data, width, height).map(Some)
    }

    fn set_property(&mut self, property: Property, value: f64) -> Result<()> {
        let outcome = match property {
            Property::FrameWidth => {
                let width = to_u32(property, value)?;
                self.set_size(Some(width), None)
            }
            Property::FrameHeight => {
                let height = to_u32(property, value)?;
                self.set_size(None, Some(height))
            }
            Property::Fps => {
                let fps = to_u32(property, value)?;
                self.set_fps(fps)
            }
            Property::Control(id) => {
                if !value.is_finite() {
                    return Err(property_error(property, value, "value is not finite"));
                }
                #[allow(clippy::cast_possible_truncation)]
                let value = value.round() as i64;
                self.device.set_control(Control {
                    id,
                    value: Value::Integer(value),
                })
            }
        };
        outcome.map_err(|err| property_error(property, value, err))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_path_names_the_path() {
        let path = Path::new("/dev/calib-capture-missing-video");
        let Err(err) = V4L2Device::open_path(path) else {
            unreachable!("a missing device node cannot be opened");
        };
        let message = err.to_string();
        assert!(matches!(err, CaptureError::Device(_)));
        assert!(message.contains("/dev/calib-capture-missing-video"), "{message}");
        assert!(message.starts_with("device_path"), "{message}");
    }

    #[test]
    fn test_to_u32_range() {
        assert_eq!(to_u32(Property::Fps, 29.6).expect("in range"), 30);
        assert!(to_u32(Property::Fps, -1.0).is_err());
        assert!(to_u32(Property::Fps, f64::NAN).is_err());
    }
}
