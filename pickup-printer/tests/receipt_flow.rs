use std::io::Write;
use std::sync::Arc;

use pickup_printer::device::recording::{DeviceCommand, Operation};
use pickup_printer::receipt::labels;
use pickup_printer::{
    Alignment, ConnectionStatus, Parcel, PickupDocument, PickupPrinter, ReceiptStep,
    RecordingConnector, RecordingDevice, ServiceHandle, pad_label,
};
use rust_decimal::Decimal;

fn three_parcels() -> PickupDocument {
    PickupDocument::new(
        "1402/08/15 10:30",
        "5001234",
        "ali",
        vec![
            Parcel::new("تهران", Decimal::from(24), 4).unwrap(),
            Parcel::new("شیراز", Decimal::from(12), 5).unwrap(),
            Parcel::new("اصفهان", Decimal::from(2), 16).unwrap(),
        ],
    )
    .unwrap()
}

fn printer_for(connector: RecordingConnector) -> PickupPrinter {
    PickupPrinter::new(Arc::new(ServiceHandle::new(Arc::new(connector))))
}

/// (value, label) cells of every bold row, in print order
fn rows(commands: &[DeviceCommand]) -> Vec<(String, String)> {
    commands
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::Columns { cells, .. } => Some((cells[0].clone(), cells[1].clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_three_parcel_receipt() {
    let device = Arc::new(RecordingDevice::new());
    let printer = printer_for(RecordingConnector::new(device.clone()));
    printer.init().await;
    assert_eq!(printer.status(), ConnectionStatus::Found);

    let report = printer.print_pickup_receipt(three_parcels(), true).await;

    // 1. Totals
    assert_eq!(report.total_count, 25);
    assert_eq!(report.total_weight, Decimal::from(38));
    assert!(report.is_complete());

    // 2. Summary, column header and parcel rows in order
    let commands = device.commands();
    let rows = rows(&commands);
    assert_eq!(rows.len(), 4 + 1 + 3);
    assert_eq!(rows[0], ("۱۴۰۲/۰۸/۱۵ ۱۰:۳۰".into(), labels::COLLECTED_AT.into()));
    assert_eq!(rows[1], ("۵۰۰۱۲۳۴".into(), labels::TRACKING_ID.into()));
    assert_eq!(rows[2], ("ali".into(), labels::AGENT.into()));
    assert_eq!(rows[3], ("۲۵ / ۳۸ کیلو".into(), labels::TOTALS.into()));
    assert_eq!(
        rows[4],
        (labels::COUNT_WEIGHT.into(), labels::DESTINATION.into())
    );
    assert_eq!(rows[5], (format!("۲۴ /{}", pad_label("۴")), "تهران".into()));
    assert_eq!(rows[6], (format!("۱۲ /{}", pad_label("۵")), "شیراز".into()));
    assert_eq!(rows[7], (format!("۲ /{}", pad_label("۱۶")), "اصفهان".into()));

    // 3. Signature box, then paper out last
    assert!(commands.iter().any(|c| matches!(
        c,
        DeviceCommand::Text { text, .. } if text.contains("امضا")
    )));
    assert_eq!(commands.last(), Some(&DeviceCommand::AutoOutPaper));
    assert_eq!(
        report.steps.iter().map(|s| s.step).collect::<Vec<_>>(),
        vec![
            ReceiptStep::Header,
            ReceiptStep::Summary,
            ReceiptStep::Separator,
            ReceiptStep::ColumnHeader,
            ReceiptStep::ParcelRows,
            ReceiptStep::SignatureBlock,
            ReceiptStep::FeedPaper,
        ]
    );
}

#[tokio::test]
async fn test_rows_are_right_aligned_key_value_columns() {
    let device = Arc::new(RecordingDevice::new());
    let printer = printer_for(RecordingConnector::new(device.clone()));
    printer.init().await;

    printer.print_pickup_receipt(three_parcels(), false).await;

    for command in device.commands() {
        if let DeviceCommand::Columns {
            widths, alignments, ..
        } = command
        {
            assert_eq!(widths, vec![8, 5]);
            assert_eq!(alignments, vec![Alignment::Right, Alignment::Right]);
        }
    }
    assert!(!device.style_state().bold);
}

#[tokio::test]
async fn test_receipt_without_printer() {
    let device = Arc::new(RecordingDevice::new());
    let printer = printer_for(RecordingConnector::new(device.clone()).rejecting());
    printer.init().await;
    assert_eq!(printer.status(), ConnectionStatus::NoPrinter);

    let report = printer.print_pickup_receipt(three_parcels(), true).await;

    assert!(device.commands().is_empty());
    assert_eq!(report.total_count, 25);
    assert_eq!(report.total_weight, Decimal::from(38));
    assert_eq!(report.degraded_steps().len(), report.steps.len());
}

#[tokio::test]
async fn test_receipt_continues_past_faults() {
    let device = Arc::new(RecordingDevice::new());
    let printer = printer_for(RecordingConnector::new(device.clone()));
    printer.init().await;
    device.fail(Operation::Columns);

    let report = printer.print_pickup_receipt(three_parcels(), false).await;

    assert_eq!(
        report.degraded_steps(),
        vec![
            ReceiptStep::Summary,
            ReceiptStep::ColumnHeader,
            ReceiptStep::ParcelRows
        ]
    );
    assert_eq!(device.commands().last(), Some(&DeviceCommand::AutoOutPaper));
}

#[tokio::test]
async fn test_old_service_gets_raw_style_bytes() {
    let device = Arc::new(RecordingDevice::new().with_style_rejection());
    let printer = printer_for(RecordingConnector::new(device.clone()));
    printer.init().await;

    assert!(printer.print_text("bold", 24.0, true, false).await.is_some());
    let state = device.style_state();
    assert!(state.bold);
    assert!(!state.underline);
    assert!(
        !device
            .commands()
            .iter()
            .any(|c| matches!(c, DeviceCommand::Style { .. }))
    );

    device.clear();
    printer.print_text("plain", 24.0, false, true).await;
    assert_eq!(
        device.commands()[..2],
        [
            DeviceCommand::Raw(vec![0x1B, 0x45, 0x00]),
            DeviceCommand::Raw(vec![0x1B, 0x2D, 0x01]),
        ]
    );
    let state = device.style_state();
    assert!(!state.bold);
    assert!(state.underline);
}

#[tokio::test]
async fn test_style_faults_fall_back_during_receipt() {
    let device = Arc::new(RecordingDevice::new());
    let printer = printer_for(RecordingConnector::new(device.clone()));
    printer.init().await;
    device.fail(Operation::Style);

    let report = printer.print_pickup_receipt(three_parcels(), true).await;

    assert!(report.is_complete());
    let commands = device.commands();
    assert!(
        !commands
            .iter()
            .any(|c| matches!(c, DeviceCommand::Style { .. }))
    );
    assert!(commands.contains(&DeviceCommand::Raw(vec![0x1B, 0x45, 0x00])));
    assert!(commands.contains(&DeviceCommand::Raw(vec![0x1B, 0x2D, 0x00])));
    assert!(!device.style_state().bold);
}

#[tokio::test]
async fn test_receipt_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "timestamp": "1402/08/15",
            "tracking_id": "42",
            "agent_name": "sara",
            "parcels": [
                {{"destination": "تبریز", "weight": "0.5", "count": 1}},
                {{"destination": "رشت", "weight": 2, "count": 2}}
            ]
        }}"#
    )
    .unwrap();

    let reader = std::fs::File::open(file.path()).unwrap();
    let document: PickupDocument = serde_json::from_reader(reader).unwrap();
    assert_eq!(document.parcels().len(), 2);

    let device = Arc::new(RecordingDevice::new());
    let printer = printer_for(RecordingConnector::new(device.clone()));
    printer.init().await;
    let report = printer.print_pickup_receipt(document, false).await;

    assert_eq!(report.total_count, 3);
    assert_eq!(report.total_weight, Decimal::new(25, 1));
    assert!(
        rows(&device.commands())
            .iter()
            .any(|(value, label)| label == labels::TOTALS && value == "۳ / ۲.۵ کیلو")
    );
}
