//! Calibration record and the intrinsic rescaling law.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are zero: no calibration resolution is known.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Exactly one dimension is zero.
    #[must_use]
    pub const fn is_partial(self) -> bool {
        (self.width == 0) != (self.height == 0)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pinhole calibration of a camera at a given resolution.
///
/// `k` is the row-major 3x3 intrinsic matrix and `p` the row-major 3x4
/// projection matrix. Distortion, rectification and binning are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRecord {
    /// Calibration width, 0 when unknown.
    pub width: u32,
    /// Calibration height, 0 when unknown.
    pub height: u32,
    /// Name of the distortion model (e.g. `plumb_bob`).
    pub distortion_model: String,
    /// Distortion coefficients.
    pub d: Vec<f64>,
    /// Intrinsic matrix.
    pub k: [f64; 9],
    /// Rectification matrix.
    pub r: [f64; 9],
    /// Projection matrix.
    pub p: [f64; 12],
    /// Horizontal binning.
    pub binning_x: u32,
    /// Vertical binning.
    pub binning_y: u32,
    /// Time of the frame this record is attached to.
    #[serde(skip, default = "unix_epoch")]
    pub stamp: SystemTime,
    /// Coordinate frame of the frame this record is attached to.
    #[serde(skip)]
    pub frame_id: String,
}

const fn unix_epoch() -> SystemTime {
    UNIX_EPOCH
}

impl Default for CalibrationRecord {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            distortion_model: String::new(),
            d: Vec::new(),
            k: [0.0; 9],
            r: [0.0; 9],
            p: [0.0; 12],
            binning_x: 0,
            binning_y: 0,
            stamp: UNIX_EPOCH,
            frame_id: String::new(),
        }
    }
}

impl CalibrationRecord {
    /// Declared calibration resolution.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Reject records that declare only one of width and height.
    pub fn check_resolution(&self) -> Result<()> {
        if self.resolution().is_partial() {
            return Err(CaptureError::Calibration(format!(
                "partial calibration resolution {}",
                self.resolution()
            )));
        }
        Ok(())
    }

    /// A record carries a calibration when its focal length is non-zero.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.k[0] != 0.0
    }
}

/// Rescale `record` to `new_width` x `new_height`.
///
/// Focal lengths and principal points in both `k` and `p` are multiplied by
/// the ratio of the new to the old dimension along their axis. The remaining
/// entries, including the baseline terms of `p`, are copied unchanged.
///
/// An axis whose old dimension is zero has no scale to start from and keeps
/// its entries unchanged.
#[must_use]
pub fn rescale(record: &CalibrationRecord, new_width: u32, new_height: u32) -> CalibrationRecord {
    let width_coeff = axis_coeff(record.width, new_width);
    let height_coeff = axis_coeff(record.height, new_height);

    let mut scaled = record.clone();
    scaled.width = new_width;
    scaled.height = new_height;

    // [fx 0 cx; 0 fy cy; 0 0 1]
    scaled.k[0] *= width_coeff;
    scaled.k[2] *= width_coeff;
    scaled.k[4] *= height_coeff;
    scaled.k[5] *= height_coeff;

    // [fx' 0 cx' Tx; 0 fy' cy' Ty; 0 0 1 0]
    scaled.p[0] *= width_coeff;
    scaled.p[2] *= width_coeff;
    scaled.p[5] *= height_coeff;
    scaled.p[6] *= height_coeff;

    scaled
}

fn axis_coeff(old: u32, new: u32) -> f64 {
    if old == 0 {
        1.0
    } else {
        f64::from(new) / f64::from(old)
    }
}
