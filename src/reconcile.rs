//! Per-frame reconciliation of calibration resolution with frame resolution.

use crate::calibration::{rescale, CalibrationRecord, Resolution};

/// Decision taken for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// No calibration resolution was known; the frame resolution was adopted.
    Unset,
    /// Calibration and frame resolutions agree.
    Match,
    /// The calibration was rescaled to the frame resolution.
    MismatchAutoRescale {
        /// Calibration resolution before rescaling.
        from: Resolution,
        /// Frame resolution the calibration now declares.
        to: Resolution,
    },
    /// Resolutions disagree and rescaling is disabled; calibration is stale.
    MismatchWarn {
        /// Resolution the calibration was made at.
        calibration: Resolution,
        /// Resolution of the live frame.
        frame: Resolution,
    },
}

/// Align `calibration` with a frame of `frame_width` x `frame_height`.
///
/// With `auto_rescale` disabled a mismatching calibration is returned as is,
/// so the caller is told through [`ReconciliationOutcome::MismatchWarn`] that
/// the pair is geometrically inconsistent. A calibration that declares only
/// one dimension cannot be rescaled and is always reported that way.
#[must_use]
pub fn reconcile(
    mut calibration: CalibrationRecord,
    frame_width: u32,
    frame_height: u32,
    auto_rescale: bool,
) -> (CalibrationRecord, ReconciliationOutcome) {
    let current = calibration.resolution();
    let frame = Resolution::new(frame_width, frame_height);

    if current.is_unset() {
        calibration.width = frame_width;
        calibration.height = frame_height;
        return (calibration, ReconciliationOutcome::Unset);
    }

    if current == frame {
        return (calibration, ReconciliationOutcome::Match);
    }

    if auto_rescale && !current.is_partial() {
        let scaled = rescale(&calibration, frame_width, frame_height);
        (
            scaled,
            ReconciliationOutcome::MismatchAutoRescale {
                from: current,
                to: frame,
            },
        )
    } else {
        (
            calibration,
            ReconciliationOutcome::MismatchWarn {
                calibration: current,
                frame,
            },
        )
    }
}
