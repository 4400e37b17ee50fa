//! In-memory printer backend
//!
//! [`RecordingDevice`] keeps every command it receives and tracks the style
//! state the commands leave behind, whether they came through the high-level
//! style call or as raw ESC/POS bytes. It backs dry runs of the demo binary
//! and the test suite. Faults can be injected per [`Operation`].

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{
    Alignment, BarcodeSpec, Bitmap, ConnectionCallback, PaperWidth, PrinterDevice, PrinterMode,
    QrSpec, ServiceConnector, StyleKey,
};
use crate::error::{ConnectResult, DeviceError, DeviceResult};

/// One command as seen by the device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Text { text: String, font_size: f32 },
    FontSize(f32),
    Columns {
        cells: Vec<String>,
        widths: Vec<u32>,
        alignments: Vec<Alignment>,
    },
    Barcode(BarcodeSpec),
    Qr(QrSpec),
    Bitmap { width: u32, height: u32 },
    Alignment(Alignment),
    LineWrap(u8),
    AutoOutPaper,
    Raw(Vec<u8>),
    Style { key: StyleKey, enabled: bool },
}

/// Device operations, for fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Text,
    FontSize,
    Columns,
    Barcode,
    Qr,
    Bitmap,
    Alignment,
    LineWrap,
    AutoOutPaper,
    Raw,
    Style,
    QueryState,
    PaperWidth,
    PrinterMode,
    PrintedLength,
}

/// Effective formatting state of the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleState {
    pub bold: bool,
    pub underline: bool,
    pub alignment: Alignment,
    pub font_size: f32,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            bold: false,
            underline: false,
            alignment: Alignment::Left,
            font_size: crate::escpos::BASE_FONT_SIZE,
        }
    }
}

#[derive(Default)]
struct Recorded {
    commands: Vec<DeviceCommand>,
    state: StyleState,
    printed_dots: u64,
}

/// Printer device that records commands in memory
pub struct RecordingDevice {
    recorded: Mutex<Recorded>,
    failing: Mutex<HashSet<Operation>>,
    reject_styles: bool,
    state_code: i32,
    paper: PaperWidth,
    mode: PrinterMode,
}

impl RecordingDevice {
    /// A healthy 80mm device on the current service revision
    pub fn new() -> Self {
        Self {
            recorded: Mutex::new(Recorded::default()),
            failing: Mutex::new(HashSet::new()),
            reject_styles: false,
            state_code: 1,
            paper: PaperWidth::Mm80,
            mode: PrinterMode::Normal,
        }
    }

    /// Reject the high-level style call like an older service revision
    pub fn with_style_rejection(mut self) -> Self {
        self.reject_styles = true;
        self
    }

    /// Hardware state code returned by `update_printer_state`
    pub fn with_state_code(mut self, code: i32) -> Self {
        self.state_code = code;
        self
    }

    pub fn with_paper(mut self, paper: PaperWidth) -> Self {
        self.paper = paper;
        self
    }

    pub fn with_mode(mut self, mode: PrinterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Make every call of `op` fail with a transport fault
    pub fn fail(&self, op: Operation) {
        self.failing.lock().insert(op);
    }

    /// Undo [`fail`](Self::fail)
    pub fn recover(&self, op: Operation) {
        self.failing.lock().remove(&op);
    }

    /// Commands received so far
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.recorded.lock().commands.clone()
    }

    /// Current effective style state
    pub fn style_state(&self) -> StyleState {
        self.recorded.lock().state
    }

    /// Forget recorded commands, keep the style state
    pub fn clear(&self) {
        self.recorded.lock().commands.clear();
    }

    fn check(&self, op: Operation) -> DeviceResult<()> {
        if self.failing.lock().contains(&op) {
            return Err(DeviceError::Transport(format!("{:?} failed", op)));
        }
        Ok(())
    }

    fn record(&self, command: DeviceCommand) {
        let mut recorded = self.recorded.lock();
        let line_dots = (recorded.state.font_size.max(1.0)) as u64;
        match &command {
            DeviceCommand::Text { text, .. } => {
                recorded.printed_dots += line_dots * text.lines().count().max(1) as u64;
            }
            DeviceCommand::Columns { .. } => recorded.printed_dots += line_dots,
            DeviceCommand::LineWrap(n) => recorded.printed_dots += line_dots * *n as u64,
            DeviceCommand::Bitmap { height, .. } => recorded.printed_dots += *height as u64,
            DeviceCommand::Raw(bytes) => apply_raw(&mut recorded.state, bytes),
            DeviceCommand::Style { key, enabled } => match key {
                StyleKey::Bold => recorded.state.bold = *enabled,
                StyleKey::Underline => recorded.state.underline = *enabled,
            },
            DeviceCommand::Alignment(a) => recorded.state.alignment = *a,
            DeviceCommand::FontSize(size) => recorded.state.font_size = *size,
            _ => {}
        }
        recorded.commands.push(command);
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Track the style bytes of a raw ESC/POS sequence
fn apply_raw(state: &mut StyleState, bytes: &[u8]) {
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i] == 0x1B {
            let arg = bytes[i + 2];
            match bytes[i + 1] {
                0x45 => state.bold = arg & 0x01 != 0,
                0x2D => state.underline = arg != 0 && arg != b'0',
                0x61 => {
                    state.alignment = match arg {
                        1 | b'1' => Alignment::Center,
                        2 | b'2' => Alignment::Right,
                        _ => Alignment::Left,
                    }
                }
                _ => {
                    i += 1;
                    continue;
                }
            }
            i += 3;
        } else {
            i += 1;
        }
    }
}

#[async_trait]
impl PrinterDevice for RecordingDevice {
    async fn print_text_with_font(&self, text: &str, font_size: f32) -> DeviceResult<()> {
        self.check(Operation::Text)?;
        self.record(DeviceCommand::Text {
            text: text.to_string(),
            font_size,
        });
        Ok(())
    }

    async fn set_font_size(&self, font_size: f32) -> DeviceResult<()> {
        self.check(Operation::FontSize)?;
        self.record(DeviceCommand::FontSize(font_size));
        Ok(())
    }

    async fn print_columns(
        &self,
        cells: &[&str],
        widths: &[u32],
        alignments: &[Alignment],
    ) -> DeviceResult<()> {
        self.check(Operation::Columns)?;
        self.record(DeviceCommand::Columns {
            cells: cells.iter().map(|c| c.to_string()).collect(),
            widths: widths.to_vec(),
            alignments: alignments.to_vec(),
        });
        Ok(())
    }

    async fn print_barcode(&self, spec: &BarcodeSpec) -> DeviceResult<()> {
        self.check(Operation::Barcode)?;
        self.record(DeviceCommand::Barcode(spec.clone()));
        Ok(())
    }

    async fn print_qr(&self, spec: &QrSpec) -> DeviceResult<()> {
        self.check(Operation::Qr)?;
        self.record(DeviceCommand::Qr(spec.clone()));
        Ok(())
    }

    async fn print_bitmap(&self, bitmap: &Bitmap) -> DeviceResult<()> {
        self.check(Operation::Bitmap)?;
        self.record(DeviceCommand::Bitmap {
            width: bitmap.width(),
            height: bitmap.height(),
        });
        Ok(())
    }

    async fn set_alignment(&self, alignment: Alignment) -> DeviceResult<()> {
        self.check(Operation::Alignment)?;
        self.record(DeviceCommand::Alignment(alignment));
        Ok(())
    }

    async fn line_wrap(&self, lines: u8) -> DeviceResult<()> {
        self.check(Operation::LineWrap)?;
        self.record(DeviceCommand::LineWrap(lines));
        Ok(())
    }

    async fn auto_out_paper(&self) -> DeviceResult<()> {
        self.check(Operation::AutoOutPaper)?;
        self.record(DeviceCommand::AutoOutPaper);
        Ok(())
    }

    async fn send_raw(&self, data: &[u8]) -> DeviceResult<()> {
        self.check(Operation::Raw)?;
        self.record(DeviceCommand::Raw(data.to_vec()));
        Ok(())
    }

    async fn set_style(&self, key: StyleKey, enabled: bool) -> DeviceResult<()> {
        if self.reject_styles {
            return Err(DeviceError::Unsupported("set_style"));
        }
        self.check(Operation::Style)?;
        self.record(DeviceCommand::Style { key, enabled });
        Ok(())
    }

    async fn update_printer_state(&self) -> DeviceResult<i32> {
        self.check(Operation::QueryState)?;
        Ok(self.state_code)
    }

    async fn paper_width(&self) -> DeviceResult<PaperWidth> {
        self.check(Operation::PaperWidth)?;
        Ok(self.paper)
    }

    async fn printer_mode(&self) -> DeviceResult<PrinterMode> {
        self.check(Operation::PrinterMode)?;
        Ok(self.mode)
    }

    async fn printed_length(&self) -> DeviceResult<u64> {
        self.check(Operation::PrintedLength)?;
        // 203 dpi is 8 dots per millimetre
        Ok(self.recorded.lock().printed_dots / 8)
    }
}

/// Connector that hands out a [`RecordingDevice`]
pub struct RecordingConnector {
    device: Arc<RecordingDevice>,
    accept_bind: bool,
    has_printer: bool,
    deferred: bool,
    callback: Mutex<Option<Arc<dyn ConnectionCallback>>>,
    binds: AtomicUsize,
    unbinds: AtomicUsize,
}

impl RecordingConnector {
    pub fn new(device: Arc<RecordingDevice>) -> Self {
        Self {
            device,
            accept_bind: true,
            has_printer: true,
            deferred: false,
            callback: Mutex::new(None),
            binds: AtomicUsize::new(0),
            unbinds: AtomicUsize::new(0),
        }
    }

    /// Refuse every bind request
    pub fn rejecting(mut self) -> Self {
        self.accept_bind = false;
        self
    }

    /// Bind succeeds but the probe finds no hardware
    pub fn without_printer(mut self) -> Self {
        self.has_printer = false;
        self
    }

    /// Accept binds without connecting; call [`connect`](Self::connect) later
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub fn device(&self) -> &Arc<RecordingDevice> {
        &self.device
    }

    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn unbind_count(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    /// Deliver the connected notification for a pending bind
    pub async fn connect(&self) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback.on_connected(self.device.clone()).await;
        }
    }

    /// Simulate the service dying
    pub fn disconnect(&self) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback.on_disconnected();
        }
    }
}

#[async_trait]
impl ServiceConnector for RecordingConnector {
    async fn bind(&self, callback: Arc<dyn ConnectionCallback>) -> ConnectResult<bool> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        if !self.accept_bind {
            debug!("Recording connector rejected bind");
            return Ok(false);
        }
        *self.callback.lock() = Some(callback);
        if !self.deferred {
            self.connect().await;
        }
        Ok(true)
    }

    async fn unbind(&self) -> ConnectResult<()> {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
        self.callback.lock().take();
        Ok(())
    }

    async fn has_printer(&self, _device: &dyn PrinterDevice) -> ConnectResult<bool> {
        Ok(self.has_printer)
    }
}
