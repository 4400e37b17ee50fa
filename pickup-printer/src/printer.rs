//! Print orchestrator
//!
//! [`PickupPrinter`] is the public printing API. Each operation is built from
//! guarded calls on the [`ServiceHandle`], so a missing printer or a transport
//! fault degrades the output instead of failing the caller.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::device::{
    Alignment, BarcodeSpec, Bitmap, PaperWidth, PrinterDevice, PrinterMode, QrSpec, StyleKey,
};
use crate::error::{DeviceResult, Unsupported};
use crate::escpos::{self, StyleToggle};
use crate::receipt::{labels, PickupDocument, ReceiptLayout, ReceiptReport, ReceiptStep};
use crate::receipt::{SEPARATOR, SIGNATURE_BOX};
use crate::service::{ConnectionStatus, ServiceHandle};
use crate::status::PrinterState;

/// Font size used for key/value rows
pub const KEY_VALUE_FONT_SIZE: f32 = 22.0;

/// Relative widths of the (value, label) columns
const KEY_VALUE_WIDTHS: [u32; 2] = [8, 5];
const KEY_VALUE_ALIGNS: [Alignment; 2] = [Alignment::Right, Alignment::Right];

/// Formatting for a single line of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleRequest {
    pub bold: bool,
    pub underline: bool,
    pub font_size: f32,
    pub alignment: Alignment,
}

impl Default for StyleRequest {
    fn default() -> Self {
        Self {
            bold: false,
            underline: false,
            font_size: escpos::BASE_FONT_SIZE,
            alignment: Alignment::Center,
        }
    }
}

/// Try the high-level style call
async fn try_style(
    device: &dyn PrinterDevice,
    key: StyleKey,
    enabled: bool,
) -> Result<(), Unsupported> {
    device.set_style(key, enabled).await.map_err(|e| {
        debug!(error = %e, ?key, unsupported = e.is_unsupported(), "Style call rejected");
        Unsupported
    })
}

/// Drive a style flag to `enabled`, falling back to the raw command
async fn apply_style(
    device: &dyn PrinterDevice,
    key: StyleKey,
    enabled: bool,
) -> DeviceResult<()> {
    if let Err(Unsupported) = try_style(device, key, enabled).await {
        let raw = StyleToggle::new(key, enabled).encode();
        device.send_raw(raw.as_bytes()).await?;
    }
    Ok(())
}

/// Receipt printer on top of a print service connection
pub struct PickupPrinter {
    service: Arc<ServiceHandle>,
    layout: ReceiptLayout,
}

impl PickupPrinter {
    pub fn new(service: Arc<ServiceHandle>) -> Self {
        Self {
            service,
            layout: ReceiptLayout::default(),
        }
    }

    /// Replace the receipt branding
    pub fn with_layout(mut self, layout: ReceiptLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    pub fn status(&self) -> ConnectionStatus {
        self.service.status()
    }

    /// Bind to the print service
    pub async fn init(&self) {
        self.service.init().await
    }

    /// Release the print service
    pub async fn deinit(&self) {
        self.service.deinit().await
    }

    // === Single calls ===

    pub async fn set_alignment(&self, alignment: Alignment) -> Option<()> {
        self.service
            .with_connection(|d| async move { d.set_alignment(alignment).await })
            .await
    }

    /// Push the printed part out past the cutter
    pub async fn feed_paper(&self) -> Option<()> {
        self.service
            .with_connection(|d| async move { d.auto_out_paper().await })
            .await
    }

    pub async fn line_feed(&self) -> Option<()> {
        self.service
            .with_connection(|d| async move { d.line_wrap(1).await })
            .await
    }

    /// Send protocol bytes as-is
    pub async fn send_raw(&self, data: &[u8]) -> Option<()> {
        self.service
            .with_connection(|d| async move { d.send_raw(data).await })
            .await
    }

    // === Text ===

    /// Print text with bold/underline driven to the requested values
    ///
    /// Each style flag goes through the high-level call first and falls back
    /// to its raw ESC/POS equivalent when the service rejects it.
    pub async fn print_text(
        &self,
        content: &str,
        font_size: f32,
        bold: bool,
        underline: bool,
    ) -> Option<()> {
        self.service
            .with_connection(|d| async move {
                apply_style(d.as_ref(), StyleKey::Bold, bold).await?;
                apply_style(d.as_ref(), StyleKey::Underline, underline).await?;
                d.print_text_with_font(content, font_size).await
            })
            .await
    }

    /// Align, print and end the line
    pub async fn print_line(&self, text: &str, style: StyleRequest) -> Option<()> {
        let aligned = self.set_alignment(style.alignment).await;
        let printed = self
            .print_text(text, style.font_size, style.bold, style.underline)
            .await;
        let fed = self.line_feed().await;
        aligned.and(printed).and(fed)
    }

    // === Tables ===

    /// Print one table row; `widths` are relative column weights
    pub async fn print_table(
        &self,
        cells: &[&str],
        widths: &[u32],
        alignments: &[Alignment],
    ) -> Option<()> {
        debug_assert_eq!(cells.len(), widths.len());
        debug_assert_eq!(cells.len(), alignments.len());
        self.service
            .with_connection(|d| async move { d.print_columns(cells, widths, alignments).await })
            .await
    }

    /// Right-to-left label/value rows
    ///
    /// Every row is printed bold as (value, label). Bold is switched off once
    /// after the whole block.
    pub async fn print_key_value_block(&self, pairs: &[(String, String)]) -> Option<()> {
        let mut ok = self
            .service
            .with_connection(|d| async move { d.set_font_size(KEY_VALUE_FONT_SIZE).await })
            .await
            .is_some();

        for (label, value) in pairs {
            let row = self
                .service
                .with_connection(|d| async move {
                    d.send_raw(escpos::bold_on().as_bytes()).await?;
                    d.print_columns(
                        &[value.as_str(), label.as_str()],
                        &KEY_VALUE_WIDTHS,
                        &KEY_VALUE_ALIGNS,
                    )
                    .await
                })
                .await;
            ok &= row.is_some();
        }

        ok &= self
            .service
            .with_connection(|d| async move { d.send_raw(escpos::bold_off().as_bytes()).await })
            .await
            .is_some();

        ok.then_some(())
    }

    // === Codes and images ===

    pub async fn print_barcode(&self, spec: &BarcodeSpec) -> Option<()> {
        self.service
            .with_connection(|d| async move { d.print_barcode(spec).await })
            .await
    }

    pub async fn print_qr(&self, spec: &QrSpec) -> Option<()> {
        self.service
            .with_connection(|d| async move { d.print_qr(spec).await })
            .await
    }

    /// Print a bitmap centered (the device has no per-image alignment)
    pub async fn print_bitmap(&self, bitmap: &Bitmap) -> Option<()> {
        self.service
            .with_connection(|d| async move {
                d.set_alignment(Alignment::Center).await?;
                d.print_bitmap(bitmap).await
            })
            .await
    }

    // === Pickup receipt ===

    /// Print the full pickup receipt
    ///
    /// Every section is attempted even when earlier ones failed; the report
    /// says which sections degraded.
    #[instrument(skip(self, document), fields(tracking_id = %document.tracking_id(), parcels = document.parcels().len()))]
    pub async fn print_pickup_receipt(
        &self,
        document: PickupDocument,
        with_signature_block: bool,
    ) -> ReceiptReport {
        let mut report = ReceiptReport::new(document.total_count(), document.total_weight());
        let plain = StyleRequest::default();

        // Header: logo and contact line
        let aligned = self.set_alignment(Alignment::Center).await;
        let logo = match &self.layout.header_logo {
            Some(logo) => self.print_bitmap(logo).await,
            None => Some(()),
        };
        let blank = self.line_feed().await;
        let contact = self.print_line(&self.layout.contact_line, plain).await;
        let blank_after = self.line_feed().await;
        report.record(
            ReceiptStep::Header,
            [aligned, logo, blank, contact, blank_after]
                .iter()
                .all(Option::is_some),
        );

        let summary = self.print_key_value_block(&document.summary_rows()).await;
        report.record(ReceiptStep::Summary, summary.is_some());

        let separator = self.print_line(SEPARATOR, plain).await;
        report.record(ReceiptStep::Separator, separator.is_some());

        let header = [(labels::DESTINATION.to_string(), labels::COUNT_WEIGHT.to_string())];
        let column_header = self.print_key_value_block(&header).await;
        report.record(ReceiptStep::ColumnHeader, column_header.is_some());

        let rows = self.print_key_value_block(&document.parcel_rows()).await;
        report.record(ReceiptStep::ParcelRows, rows.is_some());

        if with_signature_block {
            let signature = self.print_line(SIGNATURE_BOX, plain).await;
            report.record(ReceiptStep::SignatureBlock, signature.is_some());
        }

        let fed = self.feed_paper().await;
        report.record(ReceiptStep::FeedPaper, fed.is_some());

        if report.is_complete() {
            info!(
                total_count = report.total_count,
                total_weight = %report.total_weight,
                "Pickup receipt printed"
            );
        } else {
            warn!(
                degraded = ?report.degraded_steps(),
                "Pickup receipt printed with degraded sections"
            );
        }
        report
    }

    // === Queries ===

    /// Query the hardware state
    pub async fn query_status(&self) -> PrinterState {
        let code = self
            .service
            .with_connection(|d| async move { d.update_printer_state().await })
            .await;
        let state = PrinterState::from(code);
        debug!(?code, %state, "Printer state queried");
        state
    }

    /// Loaded paper roll, if the service reports it
    pub async fn paper_width(&self) -> Option<PaperWidth> {
        self.service
            .with_connection(|d| async move { d.paper_width().await })
            .await
    }

    pub async fn is_black_label_mode(&self) -> bool {
        self.printer_mode().await == Some(PrinterMode::BlackLabel)
    }

    pub async fn is_label_mode(&self) -> bool {
        self.printer_mode().await == Some(PrinterMode::Label)
    }

    /// Distance printed since boot, in millimetres
    pub async fn printed_length(&self) -> Option<u64> {
        self.service
            .with_connection(|d| async move { d.printed_length().await })
            .await
    }

    async fn printer_mode(&self) -> Option<PrinterMode> {
        self.service
            .with_connection(|d| async move { d.printer_mode().await })
            .await
    }
}
