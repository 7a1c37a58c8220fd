//! Still image and image-sequence capture source.
//!
//! A file source is either a single image, read once, or a directory whose
//! PNG and JPEG files are played back in lexical order. After the last image
//! the source reports end of stream.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::convert;
use crate::error::{CaptureError, Result};
use crate::traits::{CaptureSource, Image, Property};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Capture source reading images from disk.
#[derive(Debug)]
pub struct FileSource {
    label: String,
    pending: VecDeque<PathBuf>,
}

impl FileSource {
    /// Open an image file or a directory of images.
    pub fn open(path: &Path) -> Result<Self> {
        let label = format!("file {}", path.display());
        let open_failed =
            |reason: &str| CaptureError::Device(format!("{label} cannot be opened: {reason}"));

        let pending: VecDeque<PathBuf> = if path.is_dir() {
            let mut frames: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|err| open_failed(&err.to_string()))?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|candidate| is_image(candidate))
                .collect();
            frames.sort();
            frames.into()
        } else if path.is_file() && is_image(path) {
            VecDeque::from([path.to_path_buf()])
        } else if path.is_file() {
            return Err(open_failed("not a PNG or JPEG image"));
        } else {
            return Err(open_failed("no such file or directory"));
        };

        if pending.is_empty() {
            return Err(open_failed("directory holds no images"));
        }

        log::info!("{label}: {} image(s) queued", pending.len());
        Ok(Self { label, pending })
    }

    /// Images not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

impl CaptureSource for FileSource {
    fn read(&mut self) -> Result<Option<Image>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let decoded = image::open(&path)?;
        Ok(Some(convert::rgb_to_image(&decoded.to_rgb8())))
    }

    fn set_property(&mut self, property: Property, value: f64) -> Result<()> {
        Err(CaptureError::Property {
            property,
            value,
            reason: format!("{} has no settable properties", self.label),
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
