//! Frames read from image files on disk

use super::FrameSource;
use image::GrayImage;
use std::collections::VecDeque;
use std::path::PathBuf;

/// Feeds still images (photos of a label) through the scanner, one per frame
#[derive(Debug)]
pub struct ImageFileSource {
    pending: VecDeque<PathBuf>,
}

impl ImageFileSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
        }
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Option<GrayImage> {
        let path = self.pending.pop_front()?;
        match image::open(&path) {
            Ok(img) => {
                log::debug!("Loaded frame from {}", path.display());
                Some(img.into_luma8())
            }
            Err(e) => {
                log::warn!("Failed to read image {}: {}", path.display(), e);
                None
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}
