//! Capture session: acquire, reconcile, stamp, publish.

use crate::acquire::FrameAcquirer;
use crate::calibration::CalibrationRecord;
use crate::config::{CaptureConfig, Parameters};
use crate::error::Result;
use crate::notice::NoticeLog;
use crate::reconcile::{reconcile, ReconciliationOutcome};
use crate::store::CalibrationStore;
use crate::traits::{Frame, Property, Publisher};

/// Notice key for the one-time rescale message.
pub const NOTICE_RESCALED: &str = "calibration-rescaled";
/// Notice key for the one-time mismatch warning.
pub const NOTICE_MISMATCH: &str = "calibration-mismatch";

/// Named parameters applied to the device after it is opened.
const NAMED_PROPERTIES: [(Property, &str); 3] = [
    (Property::FrameWidth, "image_width"),
    (Property::FrameHeight, "image_height"),
    (Property::Fps, "cv_cap_prop_fps"),
];

/// Build the calibration store for a camera, loading `url` when it is usable.
///
/// An invalid URL or an unreadable file leaves the calibration unset.
pub fn load_calibration(camera_name: &str, url: Option<&str>) -> CalibrationStore {
    let mut store = CalibrationStore::new(camera_name);
    let Some(url) = url else {
        return store;
    };
    if !store.validate_url(url) {
        log::warn!("camera_info_url {url} is not valid, continuing uncalibrated");
        return store;
    }
    if let Err(err) = store.load(url) {
        log::error!("{err}; continuing uncalibrated");
    }
    store
}

/// Owns the acquirer, the calibration baseline and the latest stamped pair.
pub struct CaptureSession {
    acquirer: FrameAcquirer,
    store: CalibrationStore,
    parameters: Parameters,
    auto_rescale: bool,
    notices: NoticeLog,
    frame: Option<Frame>,
    calibration: CalibrationRecord,
    last_outcome: Option<ReconciliationOutcome>,
}

impl CaptureSession {
    /// Open the configured source and prepare the session.
    ///
    /// Only a source that cannot be opened is an error.
    pub fn open(config: CaptureConfig) -> Result<Self> {
        let acquirer =
            FrameAcquirer::open(&config.source, config.capture_delay, &config.frame_id)?;
        let store = load_calibration(&config.camera_name, config.camera_info_url.as_deref());
        Ok(Self::new(acquirer, store, config))
    }

    /// Assemble a session from an opened acquirer and a loaded store, then
    /// apply the configured device properties.
    #[must_use]
    pub fn new(acquirer: FrameAcquirer, store: CalibrationStore, config: CaptureConfig) -> Self {
        let pairs = config.property_pairs();
        let mut session = Self {
            acquirer,
            calibration: store.record(),
            store,
            parameters: config.parameters,
            auto_rescale: config.rescale_camera_info,
            notices: NoticeLog::new(),
            frame: None,
            last_outcome: None,
        };

        for (code, value) in pairs {
            session.set_device_property(code, value);
        }
        for (property, name) in NAMED_PROPERTIES {
            session.set_property_from_param(property, name);
        }
        session
    }

    /// Acquire one frame and attach a reconciled calibration to it.
    ///
    /// Returns `false` when no frame was available.
    pub fn cycle(&mut self) -> bool {
        let Some(frame) = self.acquirer.try_acquire() else {
            return false;
        };

        let resolution = frame.resolution();
        let (mut calibration, outcome) = reconcile(
            self.store.record(),
            resolution.width,
            resolution.height,
            self.auto_rescale,
        );

        match outcome {
            ReconciliationOutcome::Unset | ReconciliationOutcome::Match => {}
            ReconciliationOutcome::MismatchAutoRescale { from, to } => {
                self.notices.info_once(
                    NOTICE_RESCALED,
                    &format!("Camera calibration automatically rescaled from {from} to {to}"),
                );
            }
            ReconciliationOutcome::MismatchWarn {
                calibration: declared,
                frame: live,
            } => {
                self.notices.warn_once(
                    NOTICE_MISMATCH,
                    &format!(
                        "Calibration resolution {declared} does not match camera resolution \
                         {live}. Use rescale_camera_info param for rescaling"
                    ),
                );
            }
        }

        calibration.stamp = frame.stamp;
        calibration.frame_id.clone_from(&frame.frame_id);

        self.calibration = calibration;
        self.frame = Some(frame);
        self.last_outcome = Some(outcome);
        true
    }

    /// Latest frame, if any cycle succeeded.
    #[must_use]
    pub const fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Calibration matching the latest frame.
    #[must_use]
    pub const fn calibration(&self) -> &CalibrationRecord {
        &self.calibration
    }

    /// Outcome of the latest reconciliation.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<ReconciliationOutcome> {
        self.last_outcome
    }

    /// Calibration baseline.
    #[must_use]
    pub const fn store(&self) -> &CalibrationStore {
        &self.store
    }

    /// Emitted one-time notices.
    #[must_use]
    pub const fn notices(&self) -> &NoticeLog {
        &self.notices
    }

    /// Hand the latest pair to `publisher`. Returns `false` before the first frame.
    pub fn publish<P: Publisher>(&self, publisher: &mut P) -> bool {
        let Some(frame) = &self.frame else {
            return false;
        };
        publisher.publish(frame, &self.calibration);
        true
    }

    /// Set a device property by numeric code. Never fails; a rejected or
    /// unknown property is logged and reported as `false`.
    pub fn set_device_property(&mut self, code: i64, value: f64) -> bool {
        let Some(property) = Property::from_code(code) else {
            log::error!("Setting with code {code} and value {value} failed: unknown property code");
            return false;
        };
        self.acquirer.set_property(property, value)
    }

    /// Set `property` from the parameter `name`. An absent parameter is not
    /// an error and reports `true`.
    pub fn set_property_from_param(&mut self, property: Property, name: &str) -> bool {
        let Some(value) = self.parameters.get_f64(name) else {
            return true;
        };
        log::info!("setting property {name} = {value}");
        self.acquirer.set_property(property, value)
    }
}

/// Publisher that logs a summary of every pair.
#[derive(Debug, Default)]
pub struct LogPublisher {
    published: u64,
}

impl LogPublisher {
    /// Pairs published so far.
    #[must_use]
    pub const fn published(&self) -> u64 {
        self.published
    }
}

impl Publisher for LogPublisher {
    fn publish(&mut self, frame: &Frame, calibration: &CalibrationRecord) {
        self.published += 1;
        log::debug!(
            "frame {} [{}] {} {} stamp {:?}, calibration {}x{} fx={}",
            frame.sequence,
            frame.frame_id,
            frame.resolution(),
            frame.encoding.as_str(),
            frame.stamp,
            calibration.width,
            calibration.height,
            calibration.k[0]
        );
    }
}
