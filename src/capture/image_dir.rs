//! Directory-of-stills frame source
//!
//! Loops over the JPEG and PNG files in a directory in name order. Stands in
//! for a camera when replaying recorded material.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::frame::RawFrame;
use super::source::{CaptureError, FrameSource};

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Frame source replaying still images from a directory
#[derive(Debug)]
pub struct ImageDirSource {
    dir: PathBuf,
    name: String,
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageDirSource {
    /// Scan `dir` for images
    ///
    /// Fails with `HardwareLost` if the directory cannot be read or holds no
    /// images.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = fs::read_dir(&dir)
            .map_err(|e| CaptureError::HardwareLost(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CaptureError::HardwareLost(format!(
                "{}: no images found",
                dir.display()
            )));
        }

        tracing::debug!(dir = %dir.display(), images = files.len(), "Opened image directory");

        Ok(Self {
            name: format!("images:{}", dir.display()),
            dir,
            files,
            next: 0,
        })
    }

    /// Number of images in the loop
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether there is nothing left to replay
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        if self.files.is_empty() {
            return Err(CaptureError::HardwareLost("source released".into()));
        }
        if !self.dir.is_dir() {
            return Err(CaptureError::HardwareLost(format!(
                "{}: directory vanished",
                self.dir.display()
            )));
        }

        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();

        let image = image::open(path)
            .map_err(|e| CaptureError::Transient(format!("{}: {}", path.display(), e)))?;

        Ok(RawFrame::from_rgb(image.to_rgb8(), Instant::now()))
    }

    fn release(&mut self) {
        self.files.clear();
        self.next = 0;
    }
}
