//! Raw ESC/POS printer over TCP (port 9100)
//!
//! Most thermal printers accept raw ESC/POS on port 9100. There is no service
//! in between, so capabilities that need one (high-level style calls, state
//! and odometer queries) are reported as unsupported.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

use super::{
    Alignment, BarcodeSpec, Bitmap, ConnectionCallback, PaperWidth, PrinterDevice, PrinterMode,
    QrSpec, ServiceConnector, StyleKey,
};
use crate::encoding::TextCodec;
use crate::error::{ConnectError, ConnectResult, DeviceError, DeviceResult};
use crate::escpos::{self, EscPosBuilder};

/// Lines fed before the cut so the last printed line clears the blade
const CUT_FEED_LINES: u8 = 4;

/// A connected network printer
pub struct NetworkDevice {
    addr: SocketAddr,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
    codec: TextCodec,
    paper: PaperWidth,
    font_size: parking_lot::Mutex<f32>,
    callback: Weak<dyn ConnectionCallback>,
}

impl NetworkDevice {
    fn new(
        addr: SocketAddr,
        stream: TcpStream,
        codec: TextCodec,
        paper: PaperWidth,
        callback: Weak<dyn ConnectionCallback>,
    ) -> Self {
        Self {
            addr,
            stream: tokio::sync::Mutex::new(Some(stream)),
            codec,
            paper,
            font_size: parking_lot::Mutex::new(escpos::BASE_FONT_SIZE),
            callback,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn builder(&self) -> EscPosBuilder {
        EscPosBuilder::new(self.codec)
    }

    /// Columns per line at the current font size
    fn line_width(&self) -> usize {
        let multiplier = escpos::size_multiplier(*self.font_size.lock()) as usize;
        self.paper.chars_per_line() / multiplier
    }

    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    async fn write(&self, data: &[u8]) -> DeviceResult<()> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(DeviceError::Transport(format!(
                "{}: connection closed",
                self.addr
            )));
        };

        let sent = match stream.write_all(data).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            warn!(error = %e, "Write failed, dropping connection");
            guard.take();
            drop(guard);
            if let Some(callback) = self.callback.upgrade() {
                callback.on_disconnected();
            }
            return Err(e.into());
        }

        debug!("Sent {} bytes", data.len());
        Ok(())
    }

    async fn send(&self, builder: EscPosBuilder) -> DeviceResult<()> {
        self.write(&builder.build()).await
    }

    async fn shutdown(&self) -> std::io::Result<()> {
        match self.stream.lock().await.take() {
            Some(mut stream) => stream.shutdown().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PrinterDevice for NetworkDevice {
    async fn print_text_with_font(&self, text: &str, font_size: f32) -> DeviceResult<()> {
        let mut b = self.builder();
        b.char_size(escpos::size_multiplier(font_size)).text(text);
        self.send(b).await?;
        // GS ! stays in effect for the columns that follow
        *self.font_size.lock() = font_size;
        Ok(())
    }

    async fn set_font_size(&self, font_size: f32) -> DeviceResult<()> {
        let mut b = self.builder();
        b.char_size(escpos::size_multiplier(font_size));
        self.send(b).await?;
        *self.font_size.lock() = font_size;
        Ok(())
    }

    async fn print_columns(
        &self,
        cells: &[&str],
        widths: &[u32],
        alignments: &[Alignment],
    ) -> DeviceResult<()> {
        let mut b = self.builder();
        b.columns(cells, widths, alignments, self.line_width());
        self.send(b).await
    }

    async fn print_barcode(&self, spec: &BarcodeSpec) -> DeviceResult<()> {
        let mut b = self.builder();
        b.barcode(spec).newline();
        self.send(b).await
    }

    async fn print_qr(&self, spec: &QrSpec) -> DeviceResult<()> {
        let mut b = self.builder();
        b.qr_code(spec).newline();
        self.send(b).await
    }

    async fn print_bitmap(&self, bitmap: &Bitmap) -> DeviceResult<()> {
        if bitmap.width() > self.paper.dots() {
            warn!(
                width = bitmap.width(),
                paper = %self.paper,
                "Bitmap wider than the paper, printer will clip it"
            );
        }
        let mut b = self.builder();
        b.raster(bitmap);
        self.send(b).await
    }

    async fn set_alignment(&self, alignment: Alignment) -> DeviceResult<()> {
        let mut b = self.builder();
        b.align(alignment);
        self.send(b).await
    }

    async fn line_wrap(&self, lines: u8) -> DeviceResult<()> {
        let mut b = self.builder();
        b.feed(lines);
        self.send(b).await
    }

    async fn auto_out_paper(&self) -> DeviceResult<()> {
        let mut b = self.builder();
        b.cut_feed(CUT_FEED_LINES);
        self.send(b).await
    }

    async fn send_raw(&self, data: &[u8]) -> DeviceResult<()> {
        self.write(data).await
    }

    async fn set_style(&self, _key: StyleKey, _enabled: bool) -> DeviceResult<()> {
        Err(DeviceError::Unsupported("set_style"))
    }

    async fn update_printer_state(&self) -> DeviceResult<i32> {
        Err(DeviceError::Unsupported("update_printer_state"))
    }

    async fn paper_width(&self) -> DeviceResult<PaperWidth> {
        Ok(self.paper)
    }

    async fn printer_mode(&self) -> DeviceResult<PrinterMode> {
        Ok(PrinterMode::Normal)
    }

    async fn printed_length(&self) -> DeviceResult<u64> {
        Err(DeviceError::Unsupported("printed_length"))
    }
}

/// Connects to a network printer
///
/// Each bind opens one TCP connection, sends ESC @ (plus the code page) and
/// hands the device to the callback.
pub struct NetworkConnector {
    addr: SocketAddr,
    timeout: Duration,
    codec: TextCodec,
    paper: PaperWidth,
    current: parking_lot::Mutex<Option<Arc<NetworkDevice>>>,
}

impl NetworkConnector {
    /// Create a connector for `host:port`
    pub fn new(host: &str, port: u16) -> ConnectResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> ConnectResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| ConnectError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
            codec: TextCodec::utf8(),
            paper: PaperWidth::Mm80,
            current: parking_lot::Mutex::new(None),
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_codec(mut self, codec: TextCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_paper(mut self, paper: PaperWidth) -> Self {
        self.paper = paper;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl ServiceConnector for NetworkConnector {
    #[instrument(skip(self, callback), fields(addr = %self.addr))]
    async fn bind(&self, callback: Arc<dyn ConnectionCallback>) -> ConnectResult<bool> {
        info!("Connecting to printer");

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| ConnectError::Timeout(format!("Connection timeout: {}", self.addr)))??;

        let device = Arc::new(NetworkDevice::new(
            self.addr,
            stream,
            self.codec,
            self.paper,
            Arc::downgrade(&callback),
        ));

        let mut b = device.builder();
        b.init();
        if device.send(b).await.is_err() {
            return Ok(false);
        }

        let previous = self.current.lock().replace(device.clone());
        if let Some(previous) = previous {
            debug!(addr = %previous.addr(), "Replacing previous connection");
        }
        info!(encoding = self.codec.name(), paper = %self.paper, "Printer connected");
        callback.on_connected(device).await;
        Ok(true)
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn unbind(&self) -> ConnectResult<()> {
        let device = self.current.lock().take();
        if let Some(device) = device {
            device.shutdown().await?;
            info!("Printer connection closed");
        }
        Ok(())
    }

    async fn has_printer(&self, _device: &dyn PrinterDevice) -> ConnectResult<bool> {
        // The raw port only accepts connections when a printer is behind it
        Ok(true)
    }
}
