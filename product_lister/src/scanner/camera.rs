//! Native camera capture through nokhwa

use super::FrameSource;
use crate::error::{ListerError, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// An open camera stream; the stream is stopped when this is dropped
pub struct CameraSource {
    camera: Camera,
    index: u32,
}

impl CameraSource {
    /// Open the camera at `index` and start streaming
    pub fn open(index: u32) -> Result<Self> {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .map_err(|e| ListerError::Camera(format!("cannot open camera {index}: {e}")))?;
        camera
            .open_stream()
            .map_err(|e| ListerError::Camera(format!("cannot stream camera {index}: {e}")))?;

        log::info!("Opened camera {}", index);
        Ok(Self { camera, index })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Option<GrayImage> {
        let buffer = match self.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::debug!("Frame capture failed: {}", e);
                return None;
            }
        };
        let decoded = match buffer.decode_image::<RgbFormat>() {
            Ok(decoded) => decoded,
            Err(e) => {
                log::debug!("Frame decode failed: {}", e);
                return None;
            }
        };

        // Rebuild through raw bytes so nokhwa's image version doesn't leak in
        let (width, height) = (decoded.width(), decoded.height());
        let rgb = RgbImage::from_raw(width, height, decoded.into_raw())?;
        Some(DynamicImage::ImageRgb8(rgb).into_luma8())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        match self.camera.stop_stream() {
            Ok(()) => log::info!("Released camera {}", self.index),
            Err(e) => log::warn!("Failed to release camera {}: {}", self.index, e),
        }
    }
}
