//! # pickup-printer
//!
//! Printer control layer for a courier pickup terminal whose receipt printer
//! sits behind a print service.
//!
//! ## Scope
//!
//! - Connection lifecycle with the print service ([`ServiceHandle`])
//! - Guarded printing calls that degrade instead of failing
//! - Bold/underline with a raw ESC/POS fallback for older service revisions
//! - The pickup receipt layout ([`PickupPrinter::print_pickup_receipt`])
//! - Hardware state mapping ([`PrinterState`])
//!
//! Backends live in [`device`]: a raw ESC/POS network printer and an
//! in-memory recording device.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pickup_printer::{NetworkConnector, PickupPrinter, ServiceHandle};
//!
//! let connector = NetworkConnector::new("192.168.1.100", 9100)?;
//! let printer = PickupPrinter::new(Arc::new(ServiceHandle::new(Arc::new(connector))));
//!
//! printer.init().await;
//! let report = printer.print_pickup_receipt(document, true).await;
//! printer.deinit().await;
//! ```

pub mod config;
pub mod device;
mod encoding;
mod error;
pub mod escpos;
mod locale;
pub mod logger;
mod printer;
pub mod receipt;
mod service;
mod status;

// Re-exports
pub use config::Config;
pub use device::network::{NetworkConnector, NetworkDevice};
pub use device::recording::{RecordingConnector, RecordingDevice};
pub use device::{
    Alignment, BarcodeSpec, BarcodeSymbology, Bitmap, ConnectionCallback, PaperWidth,
    PrinterDevice, PrinterMode, QrErrorLevel, QrSpec, ServiceConnector, StyleKey, TextPosition,
};
pub use encoding::TextCodec;
pub use error::{ConnectError, ConnectResult, DeviceError, DeviceResult, ReceiptError, Unsupported};
pub use locale::{pad_label, to_locale_digits};
pub use printer::{PickupPrinter, StyleRequest, KEY_VALUE_FONT_SIZE};
pub use receipt::{Parcel, PickupDocument, ReceiptLayout, ReceiptReport, ReceiptStep};
pub use service::{ConnectionStatus, ServiceHandle};
pub use status::PrinterState;
