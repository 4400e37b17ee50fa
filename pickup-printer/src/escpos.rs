//! ESC/POS command encoding
//!
//! Two layers:
//! - [`StyleToggle`] / [`RawCommand`]: the fixed raw equivalents of the
//!   high-level style calls, sent when a service rejects those calls
//! - [`EscPosBuilder`]: fluent byte builder used by the network backend

use crate::device::{Alignment, BarcodeSpec, BarcodeSymbology, Bitmap, QrSpec, StyleKey};
use crate::encoding::TextCodec;
use tracing::warn;

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Largest payload a model 2 QR symbol holds (numeric, level L)
pub const QR_MAX_DATA: usize = 7089;

/// GS v 0 carries width and height as 16-bit values
const RASTER_MAX: u32 = u16::MAX as u32;

/// Raw protocol byte sequence, consumed by a device's raw-send primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand(Vec<u8>);

impl RawCommand {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for RawCommand {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Style switches that have a raw ESC/POS equivalent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleToggle {
    BoldOn,
    BoldOff,
    UnderlineOn,
    UnderlineOff,
}

impl StyleToggle {
    pub fn new(key: StyleKey, enabled: bool) -> Self {
        match (key, enabled) {
            (StyleKey::Bold, true) => StyleToggle::BoldOn,
            (StyleKey::Bold, false) => StyleToggle::BoldOff,
            (StyleKey::Underline, true) => StyleToggle::UnderlineOn,
            (StyleKey::Underline, false) => StyleToggle::UnderlineOff,
        }
    }

    /// Encode to the raw command
    pub fn encode(self) -> RawCommand {
        match self {
            StyleToggle::BoldOn => bold_on(),
            StyleToggle::BoldOff => bold_off(),
            StyleToggle::UnderlineOn => underline_on(),
            StyleToggle::UnderlineOff => underline_off(),
        }
    }
}

/// ESC E 1
pub fn bold_on() -> RawCommand {
    RawCommand(vec![ESC, 0x45, 0x01])
}

/// ESC E 0
pub fn bold_off() -> RawCommand {
    RawCommand(vec![ESC, 0x45, 0x00])
}

/// ESC - 1 (one dot underline)
pub fn underline_on() -> RawCommand {
    RawCommand(vec![ESC, 0x2D, 0x01])
}

/// ESC - 0
pub fn underline_off() -> RawCommand {
    RawCommand(vec![ESC, 0x2D, 0x00])
}

/// ESC a n
pub fn alignment(align: Alignment) -> RawCommand {
    RawCommand(vec![ESC, 0x61, align.code()])
}

/// Default font height the service measures sizes against
pub const BASE_FONT_SIZE: f32 = 24.0;

/// Character magnification (1-8) closest to a service font size
pub fn size_multiplier(font_size: f32) -> u8 {
    let ratio = (font_size / BASE_FONT_SIZE).round();
    if ratio.is_nan() || ratio < 1.0 {
        1
    } else if ratio > 8.0 {
        8
    } else {
        ratio as u8
    }
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// All text is encoded with the builder's [`TextCodec`].
pub struct EscPosBuilder {
    buf: Vec<u8>,
    codec: TextCodec,
}

impl EscPosBuilder {
    /// Create an empty builder
    pub fn new(codec: TextCodec) -> Self {
        Self {
            buf: Vec::with_capacity(256),
            codec,
        }
    }

    // === Setup ===

    /// Initialize printer (ESC @) and select the code page
    pub fn init(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x40]);
        if let Some(page) = self.codec.code_page() {
            // ESC t n - Select character code table
            self.buf.extend_from_slice(&[ESC, 0x74, page]);
        }
        self
    }

    // === Text Output ===

    /// Write encoded text
    pub fn text(&mut self, s: &str) -> &mut Self {
        let bytes = self.codec.encode(s);
        self.buf.extend_from_slice(&bytes);
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[ESC, 0x64, lines]);
        self
    }

    // === Alignment / Size ===

    pub fn align(&mut self, align: Alignment) -> &mut Self {
        self.raw(alignment(align).as_bytes())
    }

    /// Character magnification, same factor for width and height (1-8)
    pub fn char_size(&mut self, multiplier: u8) -> &mut Self {
        let m = multiplier.clamp(1, 8) - 1;
        // GS ! n
        self.buf.extend_from_slice(&[GS, 0x21, (m << 4) | m]);
        self
    }

    // === Layout Helpers ===

    /// Print one row of columns laid out over `line_width` cells
    ///
    /// `widths` are relative weights; each cell is padded or truncated to its
    /// share of the line.
    pub fn columns(
        &mut self,
        cells: &[&str],
        widths: &[u32],
        aligns: &[Alignment],
        line_width: usize,
    ) -> &mut Self {
        let total: u32 = widths.iter().sum();
        if total == 0 {
            return self.newline();
        }
        let mut row = String::new();
        for (i, cell) in cells.iter().enumerate() {
            let weight = widths.get(i).copied().unwrap_or(0) as usize;
            let cols = line_width * weight / total as usize;
            let align = aligns.get(i).copied().unwrap_or_default();
            row.push_str(&self.codec.pad(cell, cols, align));
        }
        self.line(&row)
    }

    // === Paper Control ===

    /// Full cut after feeding n lines (GS V 66 n)
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[GS, 0x56, 0x42, lines]);
        self
    }

    // === QR Code ===

    /// Print a QR code (model 2)
    ///
    /// Data longer than [`QR_MAX_DATA`] cannot be encoded and is skipped.
    pub fn qr_code(&mut self, spec: &QrSpec) -> &mut Self {
        if spec.data.len() > QR_MAX_DATA {
            warn!(
                len = spec.data.len(),
                max = QR_MAX_DATA,
                "QR data too long, skipping symbol"
            );
            return self;
        }
        let size = spec.module_size.clamp(1, 16);
        let level = 0x30 + spec.error_level.code();

        // Function 165: Select model (Model 2)
        self.buf
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);

        // Function 167: Set module size
        self.buf
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size]);

        // Function 169: Set error correction
        self.buf
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, level]);

        // Function 180: Store data
        let data = spec.data.as_bytes();
        let [p_l, p_h] = ((data.len() + 3) as u16).to_le_bytes();
        self.buf
            .extend_from_slice(&[GS, 0x28, 0x6B, p_l, p_h, 0x31, 0x50, 0x30]);
        self.buf.extend_from_slice(data);

        // Function 181: Print
        self.buf
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

        self
    }

    // === Barcode ===

    /// Print a 1D barcode (GS k, format 2)
    pub fn barcode(&mut self, spec: &BarcodeSpec) -> &mut Self {
        // GS H n - HRI position
        self.buf
            .extend_from_slice(&[GS, 0x48, spec.text_position.code()]);
        // GS h n - height
        self.buf.extend_from_slice(&[GS, 0x68, spec.height.max(1)]);
        // GS w n - module width
        self.buf.extend_from_slice(&[GS, 0x77, spec.width.clamp(2, 6)]);

        let mut data = Vec::with_capacity(spec.data.len() + 2);
        if spec.symbology == BarcodeSymbology::Code128 && !spec.data.starts_with('{') {
            // Code set B unless the caller picked one
            data.extend_from_slice(b"{B");
        }
        data.extend_from_slice(spec.data.as_bytes());
        let data = &data[..data.len().min(255)];

        self.buf.extend_from_slice(&[
            GS,
            0x6B,
            symbology_code(spec.symbology),
            data.len() as u8,
        ]);
        self.buf.extend_from_slice(data);
        self
    }

    // === Raster Image ===

    /// Print a raster image (GS v 0)
    ///
    /// Images taller than one command allows go out in several bands.
    pub fn raster(&mut self, bitmap: &Bitmap) -> &mut Self {
        let x_bytes = bitmap.bytes_per_row();
        if x_bytes > RASTER_MAX {
            warn!(
                width = bitmap.width(),
                "Bitmap too wide for a raster command, skipping"
            );
            return self;
        }
        let row_len = x_bytes as usize;
        if row_len == 0 || bitmap.height() == 0 {
            return self;
        }

        for band in bitmap.data().chunks(row_len * RASTER_MAX as usize) {
            let [x_l, x_h] = (x_bytes as u16).to_le_bytes();
            let [y_l, y_h] = ((band.len() / row_len) as u16).to_le_bytes();
            // GS v 0 m xL xH yL yH
            self.buf
                .extend_from_slice(&[GS, 0x76, 0x30, 0x00, x_l, x_h, y_l, y_h]);
            self.buf.extend_from_slice(band);
        }

        // Newline after image
        self.buf.push(0x0A);
        self
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Build ===

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(TextCodec::default())
    }
}

/// GS k function B symbology codes
fn symbology_code(symbology: BarcodeSymbology) -> u8 {
    match symbology {
        BarcodeSymbology::UpcA => 65,
        BarcodeSymbology::UpcE => 66,
        BarcodeSymbology::Ean13 => 67,
        BarcodeSymbology::Ean8 => 68,
        BarcodeSymbology::Code39 => 69,
        BarcodeSymbology::Itf => 70,
        BarcodeSymbology::Codabar => 71,
        BarcodeSymbology::Code93 => 72,
        BarcodeSymbology::Code128 => 73,
    }
}
