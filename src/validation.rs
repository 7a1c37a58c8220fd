//! Frame validation utilities for test pattern verification.
//!
//! These checks are used by the integration tests against virtual cameras
//! and by the session tests to confirm what a publisher receives.

use crate::calibration::CalibrationRecord;
use crate::error::{CaptureError, Result};
use crate::traits::Frame;

/// Expected RGB values for SMPTE color bars (8 bars).
///
/// Colors in order: White, Yellow, Cyan, Green, Magenta, Red, Blue, Black
pub const SMPTE_COLOR_BARS: [(u8, u8, u8); 8] = [
    (235, 235, 235), // White
    (235, 235, 11),  // Yellow
    (12, 236, 237),  // Cyan
    (13, 237, 13),   // Green
    (237, 13, 237),  // Magenta
    (238, 14, 13),   // Red
    (15, 15, 239),   // Blue
    (16, 16, 16),    // Black
];

/// Tolerance for RGB color matching (accounts for YUV->RGB conversion errors).
const COLOR_TOLERANCE: u32 = 15;

fn invalid(message: String) -> CaptureError {
    CaptureError::Stream(message)
}

/// Validates that a frame contains the SMPTE color bar pattern.
///
/// Samples the center of each of the 8 vertical stripes on the middle row.
pub fn validate_color_bars(frame: &Frame) -> Result<()> {
    let image = &frame.image;
    let bar_width = image.width / 8;
    let center_y = image.height / 2;

    for (bar_idx, expected_rgb) in (0u32..).zip(SMPTE_COLOR_BARS.iter()) {
        let sample_x = (bar_idx * bar_width) + (bar_width / 2);

        let actual_rgb = image.pixel_at(sample_x, center_y).ok_or_else(|| {
            invalid(format!("Failed to get pixel at ({sample_x}, {center_y})"))
        })?;

        if !colors_match(actual_rgb, *expected_rgb, COLOR_TOLERANCE) {
            return Err(invalid(format!(
                "Color bar {bar_idx} mismatch at ({sample_x}, {center_y}): \
                 expected RGB{expected_rgb:?}, got RGB{actual_rgb:?}"
            )));
        }
    }

    Ok(())
}

/// Validates that frames carry consecutive sequence numbers and
/// non-decreasing stamps.
pub fn validate_frame_sequence(frames: &[Frame]) -> Result<()> {
    if frames.is_empty() {
        return Err(invalid("Cannot validate empty frame sequence".to_owned()));
    }

    for (i, pair) in frames.windows(2).enumerate() {
        let [prev, curr] = pair else {
            continue;
        };

        if curr.sequence != prev.sequence.wrapping_add(1) {
            return Err(invalid(format!(
                "Frame sequence gap at index {}: expected {}, got {}",
                i + 1,
                prev.sequence.wrapping_add(1),
                curr.sequence
            )));
        }
        if curr.stamp < prev.stamp {
            return Err(invalid(format!(
                "Frame stamp went backwards at index {}",
                i + 1
            )));
        }
    }

    Ok(())
}

/// Validates that a calibration belongs to a frame: same stamp, same frame
/// id and same resolution.
pub fn validate_pair(frame: &Frame, calibration: &CalibrationRecord) -> Result<()> {
    if calibration.stamp != frame.stamp {
        return Err(invalid(format!(
            "Calibration stamp {:?} differs from frame stamp {:?}",
            calibration.stamp, frame.stamp
        )));
    }
    if calibration.frame_id != frame.frame_id {
        return Err(invalid(format!(
            "Calibration frame id {} differs from frame id {}",
            calibration.frame_id, frame.frame_id
        )));
    }
    if calibration.resolution() != frame.resolution() {
        return Err(invalid(format!(
            "Calibration resolution {} differs from frame resolution {}",
            calibration.resolution(),
            frame.resolution()
        )));
    }
    Ok(())
}

/// Whether two RGB colors match within `tolerance` per channel.
fn colors_match(actual: (u8, u8, u8), expected: (u8, u8, u8), tolerance: u32) -> bool {
    let (ar, ag, ab) = actual;
    let (er, eg, eb) = expected;

    u32::from(ar.abs_diff(er)) <= tolerance
        && u32::from(ag.abs_diff(eg)) <= tolerance
        && u32::from(ab.abs_diff(eb)) <= tolerance
}
