//! Printer device surface and connection primitive
//!
//! [`PrinterDevice`] is the fixed command vocabulary of the intermediary print
//! service. [`ServiceConnector`] binds to that service and reports the live
//! device through a [`ConnectionCallback`].
//!
//! Backends:
//! - [`network`]: raw ESC/POS over TCP (port 9100)
//! - [`recording`]: in-memory device that records commands (dry runs, tests)

mod bitmap;
pub mod network;
pub mod recording;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConnectResult, DeviceResult};

pub use bitmap::Bitmap;

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Wire code shared by the service API and ESC a n
    pub fn code(self) -> u8 {
        match self {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        }
    }
}

/// Style flags settable through the high-level style call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleKey {
    Bold,
    Underline,
}

/// Barcode symbologies understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeSymbology {
    UpcA,
    UpcE,
    Ean13,
    Ean8,
    Code39,
    Itf,
    Codabar,
    Code93,
    Code128,
}

/// Where the human readable text goes relative to the bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPosition {
    None,
    Above,
    #[default]
    Below,
    Both,
}

impl TextPosition {
    pub fn code(self) -> u8 {
        match self {
            TextPosition::None => 0,
            TextPosition::Above => 1,
            TextPosition::Below => 2,
            TextPosition::Both => 3,
        }
    }
}

/// Barcode print request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeSpec {
    pub data: String,
    pub symbology: BarcodeSymbology,
    /// Bar height in dots (1-255)
    pub height: u8,
    /// Module width in dots (2-6)
    pub width: u8,
    pub text_position: TextPosition,
}

impl BarcodeSpec {
    /// Code128 with the service defaults (162 dots high, width 2, text below)
    pub fn code128(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            symbology: BarcodeSymbology::Code128,
            height: 162,
            width: 2,
            text_position: TextPosition::Below,
        }
    }
}

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorLevel {
    #[default]
    L,
    M,
    Q,
    H,
}

impl QrErrorLevel {
    pub fn code(self) -> u8 {
        match self {
            QrErrorLevel::L => 0,
            QrErrorLevel::M => 1,
            QrErrorLevel::Q => 2,
            QrErrorLevel::H => 3,
        }
    }
}

/// QR code print request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSpec {
    pub data: String,
    /// Module size in dots (1-16)
    pub module_size: u8,
    pub error_level: QrErrorLevel,
}

impl QrSpec {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            module_size: 8,
            error_level: QrErrorLevel::default(),
        }
    }
}

/// Loaded paper roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperWidth {
    Mm58,
    Mm80,
}

impl PaperWidth {
    /// Map a roll width in millimetres; anything narrower than 80 is a 58mm roll
    pub fn from_mm(mm: u32) -> Self {
        if mm < 80 { PaperWidth::Mm58 } else { PaperWidth::Mm80 }
    }

    /// Characters per line in the default font
    ///
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn chars_per_line(self) -> usize {
        match self {
            PaperWidth::Mm58 => 32,
            PaperWidth::Mm80 => 48,
        }
    }

    /// Printable width in dots at 203 DPI
    pub fn dots(self) -> u32 {
        match self {
            PaperWidth::Mm58 => 384,
            PaperWidth::Mm80 => 576,
        }
    }
}

impl fmt::Display for PaperWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperWidth::Mm58 => f.write_str("58mm"),
            PaperWidth::Mm80 => f.write_str("80mm"),
        }
    }
}

/// Paper handling mode reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterMode {
    #[default]
    Normal,
    BlackLabel,
    Label,
}

impl PrinterMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PrinterMode::BlackLabel,
            2 => PrinterMode::Label,
            _ => PrinterMode::Normal,
        }
    }
}

/// Command surface of a connected printer service
///
/// Every call may fail with a transport fault. `set_style` additionally fails
/// with [`DeviceError::Unsupported`](crate::DeviceError::Unsupported) on
/// service revisions that predate it; callers fall back to raw bytes.
#[async_trait]
pub trait PrinterDevice: Send + Sync {
    /// Print text at the given font size (no trailing newline)
    async fn print_text_with_font(&self, text: &str, font_size: f32) -> DeviceResult<()>;

    /// Set the font size for following text
    async fn set_font_size(&self, font_size: f32) -> DeviceResult<()>;

    /// Print one table row; `widths` are relative column weights
    async fn print_columns(
        &self,
        cells: &[&str],
        widths: &[u32],
        alignments: &[Alignment],
    ) -> DeviceResult<()>;

    async fn print_barcode(&self, spec: &BarcodeSpec) -> DeviceResult<()>;

    async fn print_qr(&self, spec: &QrSpec) -> DeviceResult<()>;

    async fn print_bitmap(&self, bitmap: &Bitmap) -> DeviceResult<()>;

    async fn set_alignment(&self, alignment: Alignment) -> DeviceResult<()>;

    /// Feed `lines` blank lines
    async fn line_wrap(&self, lines: u8) -> DeviceResult<()>;

    /// Feed the printed part past the cutter
    async fn auto_out_paper(&self) -> DeviceResult<()>;

    /// Send low-level protocol bytes as-is
    async fn send_raw(&self, data: &[u8]) -> DeviceResult<()>;

    /// High-level style call
    async fn set_style(&self, key: StyleKey, enabled: bool) -> DeviceResult<()>;

    /// Query the raw hardware state code
    async fn update_printer_state(&self) -> DeviceResult<i32>;

    async fn paper_width(&self) -> DeviceResult<PaperWidth>;

    async fn printer_mode(&self) -> DeviceResult<PrinterMode>;

    /// Distance printed since boot, in millimetres
    async fn printed_length(&self) -> DeviceResult<u64>;
}

/// Lifecycle notifications from a connector
#[async_trait]
pub trait ConnectionCallback: Send + Sync {
    /// The service is bound and `device` is live
    async fn on_connected(&self, device: Arc<dyn PrinterDevice>);

    /// The service went away; may be called from any thread
    fn on_disconnected(&self);
}

/// Connection primitive to the print service
#[async_trait]
pub trait ServiceConnector: Send + Sync {
    /// Request a bind; `Ok(false)` is a synchronous rejection
    ///
    /// On success the connector reports the device through
    /// `callback.on_connected`, either before returning or later.
    async fn bind(&self, callback: Arc<dyn ConnectionCallback>) -> ConnectResult<bool>;

    /// Release the bound service
    async fn unbind(&self) -> ConnectResult<()>;

    /// Check that printer hardware is actually behind the service
    async fn has_printer(&self, device: &dyn PrinterDevice) -> ConnectResult<bool>;
}
