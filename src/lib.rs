//! Calib-Capture: camera capture with calibration reconciliation.
//!
//! Frames are read from a V4L2 device (by index or path) or from image
//! files, stamped with their estimated exposure time, and paired with a
//! calibration whose resolution has been reconciled with the live frame.

pub mod acquire;
pub mod calibration;
pub mod config;
pub mod convert;
pub mod device;
pub mod error;
pub mod file;
pub mod notice;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use acquire::{FrameAcquirer, Source};
pub use calibration::{rescale, CalibrationRecord, Resolution};
pub use config::{CaptureConfig, Parameters};
pub use device::V4L2Device;
pub use error::{CaptureError, Result};
pub use file::FileSource;
pub use reconcile::{reconcile, ReconciliationOutcome};
pub use session::{CaptureSession, LogPublisher};
pub use store::CalibrationStore;
pub use traits::{CaptureSource, Clock, Encoding, FourCC, Frame, Image, Property, Publisher};
