use super::RenderError;
use barcoders::sym::code128::Code128;
use barcoders::sym::code39::Code39;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::tf::TF;
use qrcode::{Color, EcLevel, QrCode};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeFormat {
    Code128,
    Code39,
    Ean13,
    Itf,
    Pharmacode,
}

/// Barcode symbology picked from the importer NTN; first matching rule wins
pub fn barcode_format(importer_ntn: &str) -> BarcodeFormat {
    let len = importer_ntn.chars().count();
    if len <= 8 {
        BarcodeFormat::Code39
    } else if len == 13 {
        BarcodeFormat::Ean13
    } else if importer_ntn.starts_with("ITF") {
        BarcodeFormat::Itf
    } else if importer_ntn.starts_with("PH") {
        BarcodeFormat::Pharmacode
    } else {
        BarcodeFormat::Code128
    }
}

/// Encoded bar pattern, one entry per module (1 = bar)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bars {
    pub format: BarcodeFormat,
    pub modules: Vec<u8>,
    /// Human-readable line printed under the bars
    pub caption: String,
}

fn encode_as(format: BarcodeFormat, data: &str) -> Result<Vec<u8>, String> {
    let modules = match format {
        BarcodeFormat::Code39 => Code39::new(data).map(|c| c.encode()),
        BarcodeFormat::Ean13 => EAN13::new(data).map(|c| c.encode()),
        BarcodeFormat::Itf => TF::interleaved(data).map(|c| c.encode()),
        // no pharmacode encoder; Code128 stands in
        BarcodeFormat::Pharmacode | BarcodeFormat::Code128 => {
            Code128::new(format!("Ɓ{}", data)).map(|c| c.encode())
        }
    };
    modules.map_err(|e| e.to_string())
}

/// Encode `data` in the format chosen for `importer_ntn`, falling back to Code128
pub fn encode_barcode(data: &str, importer_ntn: &str) -> Result<Bars, RenderError> {
    let preferred = barcode_format(importer_ntn);
    let format = match preferred {
        BarcodeFormat::Pharmacode => BarcodeFormat::Code128,
        other => other,
    };
    match encode_as(format, data) {
        Ok(modules) => Ok(Bars {
            format,
            modules,
            caption: data.to_string(),
        }),
        Err(e) if format != BarcodeFormat::Code128 => {
            tracing::warn!(
                "{:?} barcode rejected {:?} ({}), falling back to Code128",
                format,
                data,
                e
            );
            encode_as(BarcodeFormat::Code128, data)
                .map(|modules| Bars {
                    format: BarcodeFormat::Code128,
                    modules,
                    caption: data.to_string(),
                })
                .map_err(RenderError::Barcode)
        }
        Err(e) => Err(RenderError::Barcode(e)),
    }
}

#[derive(Debug, Serialize)]
struct QrPayload<'a> {
    invoice: &'a str,
    importer: &'a str,
    fbr: &'a str,
}

/// Square QR module grid, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    pub width: usize,
    pub dark: Vec<bool>,
}

impl QrMatrix {
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark.get(y * self.width + x).copied().unwrap_or(false)
    }
}

pub fn qr_payload(invoice: &str, importer_ntn: &str, fbr_code: &str) -> String {
    let payload = QrPayload {
        invoice,
        importer: importer_ntn,
        fbr: fbr_code,
    };
    // serializing three borrowed strings cannot fail
    serde_json::to_string(&payload).unwrap_or_default()
}

pub fn encode_qr(payload: &str) -> Result<QrMatrix, RenderError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
        .map_err(|e| RenderError::Qr(e.to_string()))?;
    let dark = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
    Ok(QrMatrix {
        width: code.width(),
        dark,
    })
}
