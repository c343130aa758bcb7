use serde::{Deserialize, Serialize};

use crate::devices::DeviceDescriptor;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Transient: published when an acquisition fails, immediately followed by
    /// `Disconnected` with the error kept.
    Failed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

/// The single device session: which device is selected and whether it is
/// connected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub device: Option<DeviceDescriptor>,
    pub state: ConnectionState,
    pub error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn select(&mut self, device: DeviceDescriptor) {
        self.device = Some(device);
        self.error = None;
    }

    pub fn begin_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
        self.error = None;
    }

    pub fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.error = None;
    }

    pub fn mark_failed(&mut self, message: String) {
        self.state = ConnectionState::Failed;
        self.error = Some(message);
    }

    pub fn reset_after_failure(&mut self) {
        if self.state == ConnectionState::Failed {
            self.state = ConnectionState::Disconnected;
        }
    }

    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.error = None;
    }

    /// Rebuilds the in-memory session from what was saved, trusting the saved
    /// connection flag without touching the device.
    pub fn restore_from(&mut self, saved: &PersistedSession) {
        *self = Self {
            device: saved.device.clone(),
            state: if saved.connected && saved.device.is_some() {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            },
            error: None,
        };
    }

    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            connected: self.is_connected(),
            device: self.device.clone(),
        }
    }
}

/// On-disk shape of the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PersistedSession {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceDescriptor>,
}
