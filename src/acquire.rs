//! Frame acquisition from a device or file source.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};

use crate::device::V4L2Device;
use crate::error::Result;
use crate::file::FileSource;
use crate::traits::{CaptureSource, Clock, Encoding, Frame, Property, SystemClock};

/// Identity of the source to capture from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// V4L2 device index, `/dev/video{n}`.
    Index(u32),
    /// V4L2 device node path.
    Path(PathBuf),
    /// Image file or directory of images.
    File(PathBuf),
}

impl Default for Source {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "device_id {index}"),
            Self::Path(path) => write!(f, "device_path {}", path.display()),
            Self::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Produces timestamped BGR8 frames from a capture source.
pub struct FrameAcquirer {
    source: Box<dyn CaptureSource>,
    clock: Box<dyn Clock>,
    capture_delay: Duration,
    frame_id: String,
    sequence: u32,
}

impl FrameAcquirer {
    /// Open `source`. Failure to open is fatal and reported as
    /// [`CaptureError::Device`](crate::CaptureError::Device).
    pub fn open(source: &Source, capture_delay: Duration, frame_id: &str) -> Result<Self> {
        let opened: Box<dyn CaptureSource> = match source {
            Source::Index(index) => Box::new(V4L2Device::open(*index)?),
            Source::Path(path) => Box::new(V4L2Device::open_path(path)?),
            Source::File(path) => Box::new(FileSource::open(path)?),
        };
        Ok(Self::from_boxed(opened, capture_delay, frame_id))
    }

    /// Wrap an already opened source.
    #[must_use]
    pub fn new<S: CaptureSource + 'static>(
        source: S,
        capture_delay: Duration,
        frame_id: &str,
    ) -> Self {
        Self::from_boxed(Box::new(source), capture_delay, frame_id)
    }

    fn from_boxed(source: Box<dyn CaptureSource>, capture_delay: Duration, frame_id: &str) -> Self {
        Self {
            source,
            clock: Box::new(SystemClock),
            capture_delay,
            frame_id: frame_id.to_owned(),
            sequence: 0,
        }
    }

    /// Replace the wall clock used for stamping.
    #[must_use]
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Identity of the underlying source.
    #[must_use]
    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Read the next frame, blocking until the source delivers one.
    ///
    /// Returns `None` at end of stream and on read failures; the latter are
    /// logged and the caller may simply poll again.
    pub fn try_acquire(&mut self) -> Option<Frame> {
        let image = match self.source.read() {
            Ok(Some(image)) => image,
            Ok(None) => {
                log::debug!("{}: end of stream", self.source.describe());
                return None;
            }
            Err(err) => {
                log::warn!("{}: read failed: {err}", self.source.describe());
                return None;
            }
        };

        // Saturate at the epoch; `SystemTime` itself can go below it.
        let since_epoch = self
            .clock
            .now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let stamp = UNIX_EPOCH + since_epoch.saturating_sub(self.capture_delay);

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        Some(Frame {
            image,
            encoding: Encoding::Bgr8,
            stamp,
            frame_id: self.frame_id.clone(),
            sequence,
        })
    }

    /// Forward a property change to the source. Rejections are logged and
    /// reported as `false`.
    pub fn set_property(&mut self, property: Property, value: f64) -> bool {
        match self.source.set_property(property, value) {
            Ok(()) => true,
            Err(err) => {
                log::error!(
                    "Setting with code {} and value {value} failed: {err}",
                    property.code()
                );
                false
            }
        }
    }
}
