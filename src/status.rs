//! Service status store: health of the last remote translation call.
//! Last write wins, no history. Readers poll synchronously or hold a watch
//! receiver that always carries the latest snapshot.

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Health reported by the translation backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[default]
    Success,
    /// Usable text came back, but the backend fell back (e.g. original text).
    Limited,
    Error,
    Unavailable,
}

impl ServiceStatus {
    pub fn is_nominal(self) -> bool {
        self == ServiceStatus::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Success => "success",
            ServiceStatus::Limited => "limited",
            ServiceStatus::Error => "error",
            ServiceStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status plus the message that came with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: ServiceStatus,
    pub message: String,
}

pub struct ServiceStatusStore {
    state: RwLock<StatusSnapshot>,
    state_tx: watch::Sender<StatusSnapshot>,
    state_rx: watch::Receiver<StatusSnapshot>,
}

impl ServiceStatusStore {
    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(StatusSnapshot::default());
        Self {
            state: RwLock::new(StatusSnapshot::default()),
            state_tx,
            state_rx,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        self.state.read().status
    }

    pub fn message(&self) -> String {
        self.state.read().message.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.read().clone()
    }

    /// Overwrite status and message unconditionally.
    pub fn set_status(&self, status: ServiceStatus, message: impl Into<String>) {
        let next = StatusSnapshot {
            status,
            message: message.into(),
        };
        let mut state = self.state.write();
        let prev = state.status;
        *state = next.clone();
        let _ = self.state_tx.send(next);
        info!(from = %prev, to = %status, "service_status_changed");
    }

    /// Back to `success` with an empty message.
    pub fn clear_status(&self) {
        let mut state = self.state.write();
        *state = StatusSnapshot::default();
        let _ = self.state_tx.send(StatusSnapshot::default());
        info!("service_status_cleared");
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.state_rx.clone()
    }
}

impl Default for ServiceStatusStore {
    fn default() -> Self {
        Self::new()
    }
}
