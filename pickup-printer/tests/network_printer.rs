use std::sync::Arc;
use std::time::Duration;

use pickup_printer::{
    Alignment, ConnectionStatus, NetworkConnector, PaperWidth, PickupPrinter, PrinterState,
    ServiceHandle, TextCodec,
};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Accept one connection and collect everything sent until it closes
async fn spawn_sink() -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });
    (addr, task)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn test_prints_over_tcp() {
    let (addr, sink) = spawn_sink().await;
    let connector = NetworkConnector::from_addr(&addr)
        .unwrap()
        .with_timeout(Duration::from_secs(2));
    let printer = PickupPrinter::new(Arc::new(ServiceHandle::new(Arc::new(connector))));

    // 1. Connect
    printer.init().await;
    assert_eq!(printer.status(), ConnectionStatus::Found);

    // 2. Styled text goes through the raw fallback
    assert!(printer.set_alignment(Alignment::Center).await.is_some());
    assert!(printer.print_text("سلام", 24.0, true, false).await.is_some());
    assert!(printer.feed_paper().await.is_some());

    // 3. Capabilities a raw printer lacks
    assert_eq!(printer.query_status().await, PrinterState::InterfaceTooLow);
    assert_eq!(printer.printed_length().await, None);
    assert_eq!(printer.paper_width().await, Some(PaperWidth::Mm80));
    assert!(!printer.is_label_mode().await);

    // 4. Close and inspect the byte stream
    printer.deinit().await;
    assert_eq!(printer.status(), ConnectionStatus::Lost);
    let received = tokio::time::timeout(Duration::from_secs(2), sink)
        .await
        .expect("sink did not see the connection close")
        .unwrap();

    assert_eq!(&received[..2], &[0x1B, 0x40]);
    assert!(contains(&received, &[0x1B, 0x61, 0x01]));
    assert!(contains(&received, &[0x1B, 0x45, 0x01]));
    assert!(contains(&received, &[0x1B, 0x2D, 0x00]));
    assert!(contains(&received, "سلام".as_bytes()));
    assert!(contains(&received, &[0x1D, 0x56, 0x42]));
}

#[tokio::test]
async fn test_code_page_is_selected_on_connect() {
    let (addr, sink) = spawn_sink().await;
    let codec = TextCodec::for_label("windows-1256", Some(50)).unwrap();
    let connector = NetworkConnector::from_addr(&addr)
        .unwrap()
        .with_codec(codec)
        .with_paper(PaperWidth::Mm58);
    let printer = PickupPrinter::new(Arc::new(ServiceHandle::new(Arc::new(connector))));

    printer.init().await;
    assert_eq!(printer.paper_width().await, Some(PaperWidth::Mm58));
    printer.deinit().await;

    let received = sink.await.unwrap();
    assert_eq!(&received[..5], &[0x1B, 0x40, 0x1B, 0x74, 50]);
}

#[tokio::test]
async fn test_unreachable_printer_is_no_printer() {
    // Grab a free port, then close it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let connector = NetworkConnector::from_addr(&addr)
        .unwrap()
        .with_timeout(Duration::from_secs(2));
    let printer = PickupPrinter::new(Arc::new(ServiceHandle::new(Arc::new(connector))));

    printer.init().await;
    assert_eq!(printer.status(), ConnectionStatus::NoPrinter);
    assert!(printer.print_text("x", 24.0, false, false).await.is_none());
}
