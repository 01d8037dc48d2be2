//! Tests for barcode acquisition

use super::{
    acquire_upc, DetectedSymbol, FrameSource, ImageFileSource, RxingDecoder, ScanOptions,
    ScanOutcome, SymbolDecoder, Symbology,
};
use crate::models::Upc;
use image::{GrayImage, Luma};
use rxing::oned::{EAN13Writer, UPCAWriter};
use rxing::{BarcodeFormat, Writer};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frame source that reports whether it was released
struct FakeCamera {
    frames: VecDeque<Option<GrayImage>>,
    released: Arc<AtomicBool>,
    captured: Arc<AtomicUsize>,
}

impl FakeCamera {
    fn new(frames: Vec<Option<GrayImage>>) -> (Self, Arc<AtomicBool>, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicBool::new(false));
        let captured = Arc::new(AtomicUsize::new(0));
        (
            Self {
                frames: frames.into(),
                released: Arc::clone(&released),
                captured: Arc::clone(&captured),
            },
            released,
            captured,
        )
    }
}

impl FrameSource for FakeCamera {
    fn next_frame(&mut self) -> Option<GrayImage> {
        self.captured.fetch_add(1, Ordering::SeqCst);
        // After the scripted frames the camera keeps failing
        self.frames.pop_front().flatten()
    }
}

impl Drop for FakeCamera {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Decoder returning scripted symbols, one list per decoded frame
struct ScriptedDecoder {
    results: RefCell<VecDeque<Vec<DetectedSymbol>>>,
}

impl ScriptedDecoder {
    fn new(results: Vec<Vec<DetectedSymbol>>) -> Self {
        Self {
            results: RefCell::new(results.into()),
        }
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn decode(&self, _frame: &GrayImage) -> Vec<DetectedSymbol> {
        self.results.borrow_mut().pop_front().unwrap_or_default()
    }
}

fn frame() -> Option<GrayImage> {
    Some(GrayImage::new(4, 4))
}

fn symbol(symbology: Symbology, payload: &str) -> DetectedSymbol {
    DetectedSymbol {
        symbology,
        payload: payload.as_bytes().to_vec(),
    }
}

fn bounded(ms: u64) -> ScanOptions {
    ScanOptions {
        timeout: Some(Duration::from_millis(ms)),
        poll_interval: Duration::from_millis(1),
    }
}

#[test]
fn returns_first_upc_and_releases_camera() {
    let (camera, released, _) = FakeCamera::new(vec![frame(), frame()]);
    let decoder = ScriptedDecoder::new(vec![
        vec![],
        vec![symbol(Symbology::UpcA, "012345678905")],
    ]);

    let outcome = acquire_upc(camera, &decoder, ScanOptions::default(), &AtomicBool::new(false));

    assert_eq!(
        outcome,
        ScanOutcome::Found(Upc::parse("012345678905").unwrap())
    );
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn capture_failures_do_not_stop_the_loop() {
    let (camera, _, captured) = FakeCamera::new(vec![None, None, None, frame()]);
    let decoder = ScriptedDecoder::new(vec![vec![symbol(Symbology::UpcE, "01234565")]]);

    let outcome = acquire_upc(camera, &decoder, ScanOptions::default(), &AtomicBool::new(false));

    assert_eq!(outcome, ScanOutcome::Found(Upc::parse("01234565").unwrap()));
    assert_eq!(captured.load(Ordering::SeqCst), 4);
}

#[test]
fn ignores_non_upc_symbologies() {
    let (camera, _, _) = FakeCamera::new(vec![frame(), frame()]);
    let decoder = ScriptedDecoder::new(vec![
        vec![
            symbol(Symbology::Ean13, "4006381333931"),
            symbol(Symbology::QrCode, "https://example.com"),
        ],
        vec![
            symbol(Symbology::Code128, "ABC-123"),
            symbol(Symbology::UpcA, "036000291452"),
        ],
    ]);

    let outcome = acquire_upc(camera, &decoder, ScanOptions::default(), &AtomicBool::new(false));

    assert_eq!(
        outcome,
        ScanOutcome::Found(Upc::parse("036000291452").unwrap())
    );
}

#[test]
fn skips_upc_payloads_that_are_not_digits() {
    let (camera, _, _) = FakeCamera::new(vec![frame()]);
    let decoder = ScriptedDecoder::new(vec![vec![
        DetectedSymbol {
            symbology: Symbology::UpcA,
            payload: vec![0xff, 0xfe],
        },
        symbol(Symbology::UpcA, "garbled"),
        symbol(Symbology::UpcA, "012345678905"),
    ]]);

    let outcome = acquire_upc(camera, &decoder, ScanOptions::default(), &AtomicBool::new(false));

    assert_eq!(
        outcome,
        ScanOutcome::Found(Upc::parse("012345678905").unwrap())
    );
}

#[test]
fn times_out_and_releases_camera() {
    let (camera, released, _) = FakeCamera::new(vec![]);
    let decoder = ScriptedDecoder::new(vec![]);

    let outcome = acquire_upc(camera, &decoder, bounded(30), &AtomicBool::new(false));

    assert_eq!(outcome, ScanOutcome::TimedOut);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn cancel_flag_stops_acquisition() {
    let (camera, released, captured) = FakeCamera::new(vec![frame()]);
    let decoder = ScriptedDecoder::new(vec![vec![symbol(Symbology::UpcA, "012345678905")]]);

    let outcome = acquire_upc(camera, &decoder, ScanOptions::default(), &AtomicBool::new(true));

    assert_eq!(outcome, ScanOutcome::Cancelled);
    assert_eq!(captured.load(Ordering::SeqCst), 0);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn cancel_from_another_thread() {
    let (camera, released, _) = FakeCamera::new(vec![]);
    let decoder = ScriptedDecoder::new(vec![]);
    let cancel = Arc::new(AtomicBool::new(false));

    let trigger = Arc::clone(&cancel);
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        trigger.store(true, Ordering::SeqCst);
    });

    let options = ScanOptions {
        timeout: Some(Duration::from_secs(30)),
        poll_interval: Duration::from_millis(1),
    };
    let outcome = acquire_upc(camera, &decoder, options, &cancel);
    handle.join().unwrap();

    assert_eq!(outcome, ScanOutcome::Cancelled);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn image_source_exhausts_after_last_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let blank = dir.path().join("blank.png");
    GrayImage::new(16, 16).save(&blank).unwrap();

    let source = ImageFileSource::new(vec![blank, PathBuf::from("/nonexistent/label.png")]);
    let decoder = ScriptedDecoder::new(vec![]);

    let outcome = acquire_upc(source, &decoder, ScanOptions::default(), &AtomicBool::new(false));

    assert_eq!(outcome, ScanOutcome::Exhausted);
}

#[test]
fn symbology_is_upc_only_for_upc_a_and_e() {
    assert!(Symbology::UpcA.is_upc());
    assert!(Symbology::UpcE.is_upc());
    assert!(!Symbology::Ean13.is_upc());
    assert!(!Symbology::Ean8.is_upc());
    assert!(!Symbology::Other("UPC_EAN_EXTENSION".to_string()).is_upc());
}

// ── RxingDecoder ─────────────────────────────────────────────────────

/// Render a barcode as black bars on white with a quiet border
fn render<W: Writer>(writer: W, contents: &str, format: BarcodeFormat) -> GrayImage {
    const BORDER: u32 = 20;
    let matrix = writer.encode(contents, &format, 300, 120).unwrap();
    let (width, height) = (matrix.getWidth(), matrix.getHeight());

    let mut image = GrayImage::from_pixel(width + 2 * BORDER, height + 2 * BORDER, Luma([255]));
    for y in 0..height {
        for x in 0..width {
            if matrix.get(x, y) {
                image.put_pixel(x + BORDER, y + BORDER, Luma([0]));
            }
        }
    }
    image
}

#[test]
fn rxing_decodes_rendered_upc_a() {
    let frame = render(UPCAWriter::default(), "012345678905", BarcodeFormat::UPC_A);

    let symbols = RxingDecoder::new().decode(&frame);

    assert_eq!(symbols, vec![symbol(Symbology::UpcA, "012345678905")]);
}

#[test]
fn rxing_reports_ean13_which_the_scan_skips() {
    let ean = render(EAN13Writer::default(), "4006381333931", BarcodeFormat::EAN_13);
    let upc = render(UPCAWriter::default(), "036000291452", BarcodeFormat::UPC_A);
    let decoder = RxingDecoder::new();

    let found = decoder.decode(&ean);
    assert!(!found.is_empty());
    assert!(found.iter().all(|s| s.symbology == Symbology::Ean13));

    let (camera, _, captured) = FakeCamera::new(vec![Some(ean), Some(upc)]);
    let outcome = acquire_upc(camera, &decoder, bounded(5_000), &AtomicBool::new(false));

    assert_eq!(
        outcome,
        ScanOutcome::Found(Upc::parse("036000291452").unwrap())
    );
    assert_eq!(captured.load(Ordering::SeqCst), 2);
}

#[test]
fn ean13_only_frames_never_yield_a_upc() {
    let ean = render(EAN13Writer::default(), "4006381333931", BarcodeFormat::EAN_13);
    let (camera, released, _) = FakeCamera::new(vec![Some(ean)]);

    let outcome = acquire_upc(camera, &RxingDecoder::new(), bounded(50), &AtomicBool::new(false));

    assert_eq!(outcome, ScanOutcome::TimedOut);
    assert!(released.load(Ordering::SeqCst));
}
