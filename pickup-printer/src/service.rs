//! Printer service handle
//!
//! Owns the (optional) live connection to the print service and the
//! connection status. Everything else reaches the device through
//! [`ServiceHandle::with_connection`], which absorbs missing connections and
//! transport faults.
//!
//! The device reference and the status live behind one lock. The lock is never
//! held across an `.await`: a guarded call clones the `Arc` out first, so a
//! concurrent disconnect only drops the handle's reference and the in-flight
//! call keeps a valid device.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::device::{ConnectionCallback, PrinterDevice, ServiceConnector};
use crate::error::DeviceResult;

/// Connection lifecycle state
///
/// ```text
/// Checking ──probe ok──▶ Found ──disconnect──▶ Lost
///     │                                          │
///     └──bind fails / no hardware──▶ NoPrinter   │
///                                        │       │
///              Checking ◀──── init ──────┴───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    NoPrinter,
    #[default]
    Checking,
    Found,
    Lost,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::NoPrinter => "no printer",
            ConnectionStatus::Checking => "checking printer",
            ConnectionStatus::Found => "printer found",
            ConnectionStatus::Lost => "printer lost",
        };
        f.write_str(s)
    }
}

struct SessionState {
    device: Option<Arc<dyn PrinterDevice>>,
    status: ConnectionStatus,
    /// Bumped whenever the held device changes
    generation: u64,
}

/// Shared between the handle and the connector (as its callback)
struct Session {
    connector: Arc<dyn ServiceConnector>,
    state: RwLock<SessionState>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl Session {
    fn set_status(&self, state: &mut SessionState, status: ConnectionStatus) {
        if state.status != status {
            debug!(from = %state.status, to = %status, "Connection status changed");
        }
        state.status = status;
        self.status_tx.send_replace(status);
    }
}

#[async_trait]
impl ConnectionCallback for Session {
    async fn on_connected(&self, device: Arc<dyn PrinterDevice>) {
        let generation = {
            let mut state = self.state.write();
            state.device = Some(device.clone());
            state.generation += 1;
            state.generation
        };
        info!("Printer service connected, probing hardware");

        let present = match self.connector.has_printer(device.as_ref()).await {
            Ok(present) => present,
            Err(e) => {
                warn!(error = %e, "Hardware probe failed");
                false
            }
        };

        let mut state = self.state.write();
        if state.generation != generation {
            debug!("Connection changed while probing, dropping probe result");
            return;
        }
        let status = if present {
            ConnectionStatus::Found
        } else {
            warn!("Service bound but no printer hardware present");
            ConnectionStatus::NoPrinter
        };
        self.set_status(&mut state, status);
    }

    fn on_disconnected(&self) {
        let mut state = self.state.write();
        state.device = None;
        state.generation += 1;
        self.set_status(&mut state, ConnectionStatus::Lost);
        warn!("Printer service disconnected");
    }
}

/// Handle to the printer service connection
pub struct ServiceHandle {
    session: Arc<Session>,
}

impl ServiceHandle {
    pub fn new(connector: Arc<dyn ServiceConnector>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Checking);
        Self {
            session: Arc::new(Session {
                connector,
                state: RwLock::new(SessionState {
                    device: None,
                    status: ConnectionStatus::Checking,
                    generation: 0,
                }),
                status_tx,
            }),
        }
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.session.state.read().status
    }

    /// Watch status changes (for host-side display)
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.session.status_tx.subscribe()
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.session.state.read().device.is_some()
    }

    /// Bind to the print service
    ///
    /// Status becomes Checking, then Found or NoPrinter once the connector
    /// reports back. Failures only show up in the status.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        {
            let mut state = self.session.state.write();
            if state.device.is_some() && state.status == ConnectionStatus::Found {
                debug!("Printer already connected, init skipped");
                return;
            }
            self.session.set_status(&mut state, ConnectionStatus::Checking);
        }

        let callback: Arc<dyn ConnectionCallback> = self.session.clone();
        match self.session.connector.bind(callback).await {
            Ok(true) => debug!("Printer service bind requested"),
            Ok(false) => {
                warn!("Printer service bind rejected");
                self.mark_no_printer();
            }
            Err(e) => {
                warn!(error = %e, "Printer service init error");
                self.mark_no_printer();
            }
        }
    }

    /// Release the print service if one is held
    #[instrument(skip(self))]
    pub async fn deinit(&self) {
        if !self.is_connected() {
            return;
        }
        if let Err(e) = self.session.connector.unbind().await {
            warn!(error = %e, "Printer service deinit error");
            return;
        }
        let mut state = self.session.state.write();
        state.device = None;
        state.generation += 1;
        self.session.set_status(&mut state, ConnectionStatus::Lost);
        info!("Printer service released");
    }

    /// Run `op` against the connected device
    ///
    /// Returns `None` without side effects when no connection is held, and
    /// `None` when `op` fails. Neither case is raised to the caller.
    pub async fn with_connection<T, F, Fut>(&self, op: F) -> Option<T>
    where
        F: FnOnce(Arc<dyn PrinterDevice>) -> Fut,
        Fut: Future<Output = DeviceResult<T>>,
    {
        let device = self.session.state.read().device.clone();
        let Some(device) = device else {
            warn!("Printer service not connected, call skipped");
            return None;
        };

        match op(device).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Printer call failed");
                None
            }
        }
    }

    fn mark_no_printer(&self) {
        let mut state = self.session.state.write();
        self.session.set_status(&mut state, ConnectionStatus::NoPrinter);
    }
}
