//! Barcode acquisition from frame sources
//!
//! A `FrameSource` hands out grayscale frames, a `SymbolDecoder` finds
//! barcodes in them. `acquire_upc` polls the source until a UPC symbol shows
//! up, the timeout elapses, or the cancel flag is raised. The source is
//! consumed and dropped before returning, which releases the device.

#[cfg(feature = "camera")]
mod camera;
mod decoder;
mod still;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use decoder::RxingDecoder;
pub use still::ImageFileSource;

use crate::models::Upc;
use image::GrayImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Barcode symbology reported by a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbology {
    UpcA,
    UpcE,
    Ean13,
    Ean8,
    Code128,
    QrCode,
    Other(String),
}

impl Symbology {
    /// Only UPC-A and UPC-E count as UPC; EAN and the rest are ignored
    pub fn is_upc(&self) -> bool {
        matches!(self, Symbology::UpcA | Symbology::UpcE)
    }
}

/// One symbol found in a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedSymbol {
    pub symbology: Symbology,
    pub payload: Vec<u8>,
}

/// Something that yields frames, e.g. a camera
///
/// Implementations release the underlying device in `Drop`.
pub trait FrameSource {
    /// Next frame, or `None` when capture failed or nothing is ready yet
    fn next_frame(&mut self) -> Option<GrayImage>;

    /// True once the source can never produce another frame
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Barcode detection on a single frame
pub trait SymbolDecoder {
    fn decode(&self, frame: &GrayImage) -> Vec<DetectedSymbol>;
}

/// Limits for one acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// `None` waits forever
    pub timeout: Option<Duration>,
    /// Pause between frames that produced no UPC
    pub poll_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::ZERO,
        }
    }
}

/// How an acquisition ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(Upc),
    TimedOut,
    Cancelled,
    /// The source ran out of frames without showing a UPC
    Exhausted,
}

/// Poll `source` until a UPC symbol is decoded
///
/// Capture failures and frames without a UPC are treated the same and the
/// loop simply continues. The source is dropped on every return path.
/// Device errors surface earlier, when the source is opened.
pub fn acquire_upc<F, D>(
    source: F,
    decoder: &D,
    options: ScanOptions,
    cancel: &AtomicBool,
) -> ScanOutcome
where
    F: FrameSource,
    D: SymbolDecoder + ?Sized,
{
    let mut source = source;
    let started = Instant::now();
    let mut frames: u64 = 0;

    log::info!("Waiting for a UPC barcode...");

    let outcome = loop {
        if cancel.load(Ordering::Relaxed) {
            break ScanOutcome::Cancelled;
        }
        if let Some(limit) = options.timeout {
            if started.elapsed() >= limit {
                break ScanOutcome::TimedOut;
            }
        }
        if source.is_exhausted() {
            break ScanOutcome::Exhausted;
        }

        if let Some(frame) = source.next_frame() {
            frames += 1;
            if let Some(upc) = first_upc(decoder.decode(&frame)) {
                break ScanOutcome::Found(upc);
            }
        }

        if !options.poll_interval.is_zero() {
            std::thread::sleep(options.poll_interval);
        }
    };

    drop(source);

    log::info!(
        "Scan finished after {} frame(s) in {:.1}s: {:?}",
        frames,
        started.elapsed().as_secs_f64(),
        outcome
    );
    outcome
}

/// Pick the first UPC-tagged symbol whose payload is valid UPC text
fn first_upc(symbols: Vec<DetectedSymbol>) -> Option<Upc> {
    for symbol in symbols {
        if !symbol.symbology.is_upc() {
            log::debug!("Ignoring {:?} symbol", symbol.symbology);
            continue;
        }
        let text = match String::from_utf8(symbol.payload) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("UPC payload is not UTF-8: {}", e);
                continue;
            }
        };
        match Upc::parse(&text) {
            Ok(upc) => return Some(upc),
            Err(e) => log::warn!("Skipping unreadable UPC payload: {}", e),
        }
    }
    None
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
