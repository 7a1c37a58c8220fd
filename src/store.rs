//! Baseline calibration storage.
//!
//! Calibration files are TOML documents holding the fields of a
//! [`CalibrationRecord`]. They are addressed by `file://` URLs or bare paths;
//! `${NAME}` in a URL is replaced by the camera name.

use std::path::{Path, PathBuf};

use url::Url;

use crate::calibration::CalibrationRecord;
use crate::error::{CaptureError, Result};

const NAME_VARIABLE: &str = "${NAME}";

/// Holds the calibration loaded at session start.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    camera_name: String,
    record: CalibrationRecord,
}

impl CalibrationStore {
    /// Store for the named camera, initially uncalibrated.
    #[must_use]
    pub fn new(camera_name: &str) -> Self {
        Self {
            camera_name: camera_name.to_owned(),
            record: CalibrationRecord::default(),
        }
    }

    /// Resolve a calibration URL to a local path.
    pub fn resolve_url(&self, url: &str) -> Result<PathBuf> {
        let expanded = url.trim().replace(NAME_VARIABLE, &self.camera_name);
        if expanded.is_empty() {
            return Err(CaptureError::Calibration("empty calibration URL".to_owned()));
        }
        if expanded.contains("${") {
            return Err(CaptureError::Calibration(format!(
                "unresolved variable in calibration URL {url}"
            )));
        }

        if expanded.starts_with("file://") {
            let parsed = Url::parse(&expanded)
                .map_err(|err| CaptureError::Calibration(format!("invalid URL {url}: {err}")))?;
            return parsed
                .to_file_path()
                .map_err(|()| CaptureError::Calibration(format!("invalid file URL {url}")));
        }

        if let Some((scheme, _)) = expanded.split_once("://") {
            return Err(CaptureError::Calibration(format!(
                "unsupported URL scheme {scheme}:// in {url}"
            )));
        }

        Ok(PathBuf::from(expanded))
    }

    /// Whether `url` names a calibration file this store can read.
    #[must_use]
    pub fn validate_url(&self, url: &str) -> bool {
        match self.resolve_url(url) {
            Ok(_) => true,
            Err(err) => {
                log::debug!("{err}");
                false
            }
        }
    }

    /// Replace the stored calibration with the contents of `url`.
    ///
    /// On failure the previous calibration is kept.
    pub fn load(&mut self, url: &str) -> Result<()> {
        let path = self.resolve_url(url)?;
        let text = std::fs::read_to_string(&path).map_err(|err| {
            CaptureError::Calibration(format!("cannot read {}: {err}", path.display()))
        })?;
        let record: CalibrationRecord = toml::from_str(&text)?;
        if record.check_resolution().is_err() {
            return Err(CaptureError::Calibration(format!(
                "{} declares a partial resolution {}",
                path.display(),
                record.resolution()
            )));
        }

        log::info!(
            "loaded calibration for {} from {} ({}x{})",
            self.camera_name,
            path.display(),
            record.width,
            record.height
        );
        self.record = record;
        Ok(())
    }

    /// Write the stored calibration to `path` as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(&self.record)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Replace the stored calibration. Records declaring only one of width
    /// and height are rejected and the previous calibration is kept.
    pub fn set(&mut self, record: CalibrationRecord) -> Result<()> {
        record.check_resolution()?;
        self.record = record;
        Ok(())
    }

    /// Borrow the baseline calibration.
    #[must_use]
    pub const fn baseline(&self) -> &CalibrationRecord {
        &self.record
    }

    /// Independent copy of the baseline calibration.
    #[must_use]
    pub fn record(&self) -> CalibrationRecord {
        self.record.clone()
    }

    /// Whether a non-trivial calibration is stored.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.record.is_calibrated()
    }
}
