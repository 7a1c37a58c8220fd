//! Parameter lookup and capture configuration.
//!
//! Parameters are a flat TOML table. Every lookup returns `Option`: a missing
//! key is not an error, and callers fall back to the defaults documented on
//! [`CaptureConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::acquire::Source;
use crate::error::{CaptureError, Result};

/// Typed view over a flat parameter table.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    table: toml::Table,
}

impl Parameters {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameters from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let table = text.parse::<toml::Table>()?;
        Ok(Self { table })
    }

    /// Read parameters from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            CaptureError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Set or replace a parameter.
    pub fn set<V: Into<toml::Value>>(&mut self, name: &str, value: V) {
        self.table.insert(name.to_owned(), value.into());
    }

    /// Whether a parameter with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Floating point parameter. Integers are widened.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.table.get(name)? {
            toml::Value::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            toml::Value::Integer(value) => Some(*value as f64),
            other => type_mismatch(name, "a number", other),
        }
    }

    /// Integer parameter.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.table.get(name)? {
            toml::Value::Integer(value) => Some(*value),
            other => type_mismatch(name, "an integer", other),
        }
    }

    /// Boolean parameter.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.table.get(name)? {
            toml::Value::Boolean(value) => Some(*value),
            other => type_mismatch(name, "a boolean", other),
        }
    }

    /// String parameter.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.table.get(name)? {
            toml::Value::String(value) => Some(value.as_str()),
            other => type_mismatch(name, "a string", other),
        }
    }

    /// Duration parameter given in seconds. Negative values clamp to zero.
    #[must_use]
    pub fn get_duration(&self, name: &str) -> Option<Duration> {
        let secs = self.get_f64(name)?;
        if secs < 0.0 {
            log::warn!("parameter {name} = {secs} is negative, using 0");
            return Some(Duration::ZERO);
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(duration) => Some(duration),
            Err(err) => {
                log::warn!("parameter {name} = {secs} is not a valid duration: {err}");
                None
            }
        }
    }
}

fn type_mismatch<T>(name: &str, expected: &str, found: &toml::Value) -> Option<T> {
    log::warn!(
        "parameter {name} should be {expected}, found {}; ignoring it",
        found.type_str()
    );
    None
}

/// Session configuration resolved from [`Parameters`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture source. `file` wins over `device_path`, which wins over `device_id`.
    pub source: Source,
    /// Frame id stamped on frames and calibration. Default `camera`.
    pub frame_id: String,
    /// Camera name, substituted for `${NAME}` in the calibration URL. Default `camera`.
    pub camera_name: String,
    /// Publishing rate in Hz. Default 30.
    rate: f64,
    period: Duration,
    /// Constant delay between exposure and read-out. Default 0.
    pub capture_delay: Duration,
    /// Calibration file URL. Default none.
    pub camera_info_url: Option<String>,
    /// Rescale calibration to the frame resolution on mismatch. Default false.
    pub rescale_camera_info: bool,
    /// Raw parameters, kept for device property lookups.
    pub parameters: Parameters,
}

impl CaptureConfig {
    /// Default frame id and camera name.
    pub const DEFAULT_FRAME_ID: &'static str = "camera";
    /// Default publishing rate in Hz.
    pub const DEFAULT_RATE: f64 = 30.0;

    /// Resolve the configuration, applying defaults for absent keys.
    pub fn from_parameters(parameters: Parameters) -> Result<Self> {
        let source = if let Some(file) = parameters.get_str("file") {
            Source::File(PathBuf::from(file))
        } else if let Some(path) = parameters.get_str("device_path") {
            Source::Path(PathBuf::from(path))
        } else {
            let index = parameters.get_i64("device_id").unwrap_or(0);
            let index = u32::try_from(index)
                .map_err(|_| CaptureError::Config(format!("device_id {index} is out of range")))?;
            Source::Index(index)
        };

        let rate = parameters.get_f64("rate").unwrap_or(Self::DEFAULT_RATE);
        if !(rate.is_finite() && rate > 0.0) {
            return Err(CaptureError::Config(format!("rate {rate} must be positive")));
        }
        let period = Duration::try_from_secs_f64(1.0 / rate)
            .map_err(|err| CaptureError::Config(format!("rate {rate} is out of range: {err}")))?;

        Ok(Self {
            source,
            frame_id: parameters
                .get_str("frame_id")
                .unwrap_or(Self::DEFAULT_FRAME_ID)
                .to_owned(),
            camera_name: parameters
                .get_str("camera_name")
                .unwrap_or(Self::DEFAULT_FRAME_ID)
                .to_owned(),
            rate,
            period,
            capture_delay: parameters
                .get_duration("capture_delay")
                .unwrap_or(Duration::ZERO),
            camera_info_url: parameters.get_str("camera_info_url").map(str::to_owned),
            rescale_camera_info: parameters.get_bool("rescale_camera_info").unwrap_or(false),
            parameters,
        })
    }

    /// Numbered `(code, value)` property pairs, up to the first missing index.
    #[must_use]
    pub fn property_pairs(&self) -> Vec<(i64, f64)> {
        let mut pairs = Vec::new();
        for i in 0.. {
            let code = self.parameters.get_i64(&format!("property_{i}_code"));
            let value = self.parameters.get_f64(&format!("property_{i}_value"));
            let (Some(code), Some(value)) = (code, value) else {
                break;
            };
            pairs.push((code, value));
        }
        pairs
    }

    /// Publishing rate in Hz.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// Interval between cycles at the configured rate.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}
