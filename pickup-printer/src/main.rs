//! pickup-printer - print a pickup receipt
//!
//! Loads a pickup document (or a built-in sample), connects to the configured
//! printer and prints the receipt. Without `PRINTER_HOST`, or with
//! `DRY_RUN=true`, commands go to the recording backend and are logged.

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{info, warn};

use pickup_printer::logger::init_logger_with_file;
use pickup_printer::{
    Bitmap, Config, NetworkConnector, Parcel, PickupDocument, PickupPrinter, ReceiptLayout,
    RecordingConnector, RecordingDevice, ServiceConnector, ServiceHandle,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    info!(
        dry_run = config.is_dry_run(),
        paper = %config.paper(),
        "Starting pickup-printer"
    );

    let document = match &config.pickup_file {
        Some(path) => load_document(path)?,
        None => sample_document()?,
    };

    let recording = Arc::new(RecordingDevice::new().with_paper(config.paper()));
    let connector: Arc<dyn ServiceConnector> = match &config.printer_host {
        Some(host) if !config.dry_run => {
            let codec = config.codec().with_context(|| {
                format!("Unknown printer encoding: {}", config.printer_encoding)
            })?;
            Arc::new(
                NetworkConnector::new(host, config.printer_port)?
                    .with_timeout(config.timeout())
                    .with_codec(codec)
                    .with_paper(config.paper()),
            )
        }
        _ => Arc::new(RecordingConnector::new(recording.clone())),
    };

    let layout = ReceiptLayout {
        header_logo: load_logo(&config),
        contact_line: config.contact_line.clone(),
    };
    let printer = PickupPrinter::new(Arc::new(ServiceHandle::new(connector))).with_layout(layout);

    printer.init().await;
    info!(status = %printer.status(), "Printer service initialized");

    let report = printer
        .print_pickup_receipt(document, config.with_signature)
        .await;
    info!(
        total_count = report.total_count,
        total_weight = %report.total_weight,
        complete = report.is_complete(),
        "Receipt done"
    );
    for step in report.degraded_steps() {
        warn!(?step, "Receipt section degraded");
    }

    let state = printer.query_status().await;
    info!(%state, ready = state.is_ready(), "Printer state");

    if config.is_dry_run() {
        let commands = recording.commands();
        info!(count = commands.len(), "Dry run, commands recorded");
        for command in &commands {
            tracing::debug!(?command);
        }
    }

    printer.deinit().await;
    Ok(())
}

fn load_document(path: &str) -> anyhow::Result<PickupDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pickup file {}", path))?;
    let document = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid pickup file {}", path))?;
    Ok(document)
}

fn sample_document() -> anyhow::Result<PickupDocument> {
    let timestamp = chrono::Local::now().format("%Y/%m/%d %H:%M").to_string();
    let parcels = vec![
        Parcel::new("تهران", Decimal::from(24), 4)?,
        Parcel::new("شیراز", Decimal::from(12), 5)?,
        Parcel::new("اصفهان", Decimal::from(2), 16)?,
    ];
    Ok(PickupDocument::new(timestamp, "1402987654", "mahex", parcels)?)
}

#[cfg(feature = "image")]
fn load_logo(config: &Config) -> Option<Bitmap> {
    let path = config.receipt_logo.as_deref()?;
    match image::open(path) {
        Ok(img) => Some(Bitmap::from_image(&img, config.paper().dots())),
        Err(e) => {
            warn!(path, error = %e, "Failed to load receipt logo, printing without it");
            None
        }
    }
}

#[cfg(not(feature = "image"))]
fn load_logo(config: &Config) -> Option<Bitmap> {
    if config.receipt_logo.is_some() {
        warn!("RECEIPT_LOGO set but image support is disabled");
    }
    None
}
