//! Core traits and types shared by capture sources, the session and publishers.

use std::fmt;
use std::time::SystemTime;

use crate::calibration::{CalibrationRecord, Resolution};
use crate::error::Result;

/// Pixel format representation (e.g., YUYV, MJPG, RGB3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");
    /// BGR3 pixel format (24-bit BGR).
    pub const BGR3: Self = Self::new(b"BGR3");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Encoding tag carried by every published frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// 8 bits per channel, blue-green-red order.
    #[default]
    Bgr8,
}

impl Encoding {
    /// Conventional name of the encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bgr8 => "bgr8",
        }
    }
}

/// Packed BGR8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major BGR bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl Image {
    /// Wrap a BGR8 buffer.
    #[must_use]
    pub const fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Image dimensions.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Get RGB values for a pixel at the specified coordinates.
    ///
    /// Returns `None` when the coordinates fall outside the buffer.
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let b = *self.data.get(offset)?;
        let g = *self.data.get(offset + 1)?;
        let r = *self.data.get(offset + 2)?;
        Some((r, g, b))
    }
}

/// A captured video frame ready for publication.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data.
    pub image: Image,
    /// Pixel encoding, always BGR8.
    pub encoding: Encoding,
    /// Estimated exposure time (wall clock minus capture delay).
    pub stamp: SystemTime,
    /// Coordinate frame the image belongs to.
    pub frame_id: String,
    /// Number of frames produced by the acquirer before this one.
    pub sequence: u32,
}

impl Frame {
    /// Frame dimensions.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.image.resolution()
    }
}

/// Device property addressed by a numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Capture width in pixels.
    FrameWidth,
    /// Capture height in pixels.
    FrameHeight,
    /// Frame rate in frames per second.
    Fps,
    /// Raw V4L2 control id.
    Control(u32),
}

impl Property {
    /// Code used for the capture width in parameter files.
    pub const FRAME_WIDTH_CODE: i64 = 3;
    /// Code used for the capture height in parameter files.
    pub const FRAME_HEIGHT_CODE: i64 = 4;
    /// Code used for the frame rate in parameter files.
    pub const FPS_CODE: i64 = 5;

    /// Map a numeric code to a property. Returns `None` for codes that are
    /// neither well-known nor a valid control id.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::FRAME_WIDTH_CODE => Some(Self::FrameWidth),
            Self::FRAME_HEIGHT_CODE => Some(Self::FrameHeight),
            Self::FPS_CODE => Some(Self::Fps),
            other => u32::try_from(other).ok().map(Self::Control),
        }
    }

    /// Numeric code of this property.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::FrameWidth => Self::FRAME_WIDTH_CODE,
            Self::FrameHeight => Self::FRAME_HEIGHT_CODE,
            Self::Fps => Self::FPS_CODE,
            Self::Control(id) => i64::from(id),
        }
    }
}

/// Abstraction over an opened capture source.
pub trait CaptureSource {
    /// Block until the next image is available.
    ///
    /// `Ok(None)` signals end of stream. Errors are transient read failures.
    fn read(&mut self) -> Result<Option<Image>>;

    /// Set a device property.
    fn set_property(&mut self, property: Property, value: f64) -> Result<()>;

    /// Human readable identity of the source, for logs.
    fn describe(&self) -> String;
}

/// Wall-clock time provider.
pub trait Clock {
    /// Current time.
    fn now(&self) -> SystemTime;
}

/// Clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Receiver of stamped (frame, calibration) pairs.
pub trait Publisher {
    /// Hand over a frame and the calibration that matches it.
    fn publish(&mut self, frame: &Frame, calibration: &CalibrationRecord);
}
