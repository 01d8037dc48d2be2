//! Symbol decoding backed by rxing

use super::{DetectedSymbol, SymbolDecoder, Symbology};
use image::GrayImage;
use rxing::BarcodeFormat;

/// Multi-format 1D/2D decoder working on luma buffers
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl RxingDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolDecoder for RxingDecoder {
    fn decode(&self, frame: &GrayImage) -> Vec<DetectedSymbol> {
        let (width, height) = frame.dimensions();

        // "not found" is reported as an error by rxing; it is the common case
        match rxing::helpers::detect_multiple_in_luma(frame.as_raw().clone(), width, height) {
            Ok(results) => results
                .iter()
                .map(|result| DetectedSymbol {
                    symbology: symbology_of(result.getBarcodeFormat()),
                    payload: result.getText().as_bytes().to_vec(),
                })
                .collect(),
            Err(e) => {
                log::trace!("No symbol in {}x{} frame: {}", width, height, e);
                Vec::new()
            }
        }
    }
}

fn symbology_of(format: &BarcodeFormat) -> Symbology {
    match format {
        BarcodeFormat::UPC_A => Symbology::UpcA,
        BarcodeFormat::UPC_E => Symbology::UpcE,
        BarcodeFormat::EAN_13 => Symbology::Ean13,
        BarcodeFormat::EAN_8 => Symbology::Ean8,
        BarcodeFormat::CODE_128 => Symbology::Code128,
        BarcodeFormat::QR_CODE => Symbology::QrCode,
        other => Symbology::Other(format!("{other:?}")),
    }
}
