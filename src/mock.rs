//! Mock capture source for testing without hardware.

use std::collections::HashSet;
use std::time::SystemTime;

use crate::error::{CaptureError, Result};
use crate::traits::{CaptureSource, Clock, Image, Property};
use crate::validation::SMPTE_COLOR_BARS;

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// Eight vertical color bars.
    ColorBars,
    /// Horizontal gradient from dark to light.
    Gradient,
    /// Solid color given as R, G, B.
    Solid(u8, u8, u8),
}

/// Mock source producing synthetic BGR8 frames.
#[derive(Debug)]
pub struct MockSource {
    width: u32,
    height: u32,
    pattern: TestPattern,
    frame_limit: Option<u32>,
    frames_read: u32,
    failures_left: u32,
    rejected: HashSet<Property>,
    /// Every accepted property assignment, in order.
    pub applied: Vec<(Property, f64)>,
}

impl MockSource {
    /// Unlimited color bar source at the given resolution.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pattern: TestPattern::ColorBars,
            frame_limit: None,
            frames_read: 0,
            failures_left: 0,
            rejected: HashSet::new(),
            applied: Vec::new(),
        }
    }

    /// Set the test pattern for frame generation.
    #[must_use]
    pub const fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// End the stream after `limit` frames.
    #[must_use]
    pub const fn with_frame_limit(mut self, limit: u32) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Fail the next `count` reads.
    #[must_use]
    pub const fn failing_reads(mut self, count: u32) -> Self {
        self.failures_left = count;
        self
    }

    /// Refuse assignments to `property`.
    #[must_use]
    pub fn rejecting(mut self, property: Property) -> Self {
        self.rejected.insert(property);
        self
    }
}

impl CaptureSource for MockSource {
    fn read(&mut self) -> Result<Option<Image>> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CaptureError::Stream("injected read failure".to_owned()));
        }
        if self.frame_limit.is_some_and(|limit| self.frames_read >= limit) {
            return Ok(None);
        }
        self.frames_read += 1;
        let data = generate_test_frame(self.width, self.height, self.pattern);
        Ok(Some(Image::new(self.width, self.height, data)))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn set_property(&mut self, property: Property, value: f64) -> Result<()> {
        if self.rejected.contains(&property) {
            return Err(CaptureError::Property {
                property,
                value,
                reason: "rejected by mock".to_owned(),
            });
        }
        match property {
            Property::FrameWidth => self.width = value as u32,
            Property::FrameHeight => self.height = value as u32,
            Property::Fps | Property::Control(_) => {}
        }
        self.applied.push((property, value));
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_owned()
    }
}

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Generate BGR8 frame data for a pattern.
fn generate_test_frame(width: u32, height: u32, pattern: TestPattern) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    let bar_width = (width / 8).max(1);

    for _y in 0..height {
        for x in 0..width {
            let (r, g, b) = match pattern {
                TestPattern::ColorBars => {
                    let bar_idx = (x / bar_width).min(7) as usize;
                    SMPTE_COLOR_BARS[bar_idx]
                }
                TestPattern::Gradient => {
                    #[allow(clippy::cast_possible_truncation)]
                    let level = ((x * 255) / width.max(1)) as u8;
                    (level, level, level)
                }
                TestPattern::Solid(r, g, b) => (r, g, b),
            };
            data.extend_from_slice(&[b, g, r]);
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_frames() {
        let mut source = MockSource::new(640, 480).with_frame_limit(2);
        let first = source.read().expect("read").expect("frame");
        assert_eq!(first.data.len(), 640 * 480 * 3);
        assert!(source.read().expect("read").is_some());
        assert!(source.read().expect("read").is_none());
    }

    #[test]
    fn test_color_bars_pattern() {
        let data = generate_test_frame(640, 480, TestPattern::ColorBars);
        // First bar is white, stored as BGR
        assert_eq!(data[0], 235);
        // Last pixel of the first row belongs to the black bar
        assert_eq!(data[639 * 3], 16);
    }

    #[test]
    fn test_gradient_pattern() {
        let data = generate_test_frame(640, 480, TestPattern::Gradient);
        assert!(data[0] < 10);
        let last_row_start = 479 * 640 * 3;
        assert!(data[last_row_start + 638 * 3] > 200);
    }

    #[test]
    fn test_solid_pattern() {
        let data = generate_test_frame(4, 4, TestPattern::Solid(128, 64, 192));
        assert_eq!(&data[..3], &[192, 64, 128]);
    }

    #[test]
    fn test_resolution_properties() {
        let mut source = MockSource::new(640, 480);
        source
            .set_property(Property::FrameWidth, 1280.0)
            .expect("width");
        source
            .set_property(Property::FrameHeight, 960.0)
            .expect("height");
        let image = source.read().expect("read").expect("frame");
        assert_eq!((image.width, image.height), (1280, 960));
        assert_eq!(source.applied.len(), 2);
    }
}
