use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::{broadcast, watch, Mutex};

use crate::{
    devices::{resolve_selection, DeviceDescriptor, DevicePlatform},
    error::{AppError, Result},
    notices::NoticeCenter,
};

use super::{
    bus::{SessionBus, SessionSignal},
    state::{ConnectionState, PersistedSession, Session},
    store::SessionStore,
};

/// Owner of the process-wide device session.
///
/// All session mutations go through here. Operations are serialized, and
/// every `connect`/`disconnect` that changes the session publishes exactly one
/// [`SessionSignal::CameraStatusChanged`] before it returns.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<Mutex<Session>>,
    operation: Arc<Mutex<()>>,
    store: Arc<SessionStore>,
    platform: Arc<dyn DevicePlatform>,
    bus: SessionBus,
    live: Arc<watch::Sender<Session>>,
    notices: NoticeCenter,
}

impl SessionManager {
    pub fn new(
        store: Arc<SessionStore>,
        platform: Arc<dyn DevicePlatform>,
        notices: NoticeCenter,
    ) -> Self {
        let (live, _) = watch::channel(Session::new());
        Self {
            state: Arc::new(Mutex::new(Session::new())),
            operation: Arc::new(Mutex::new(())),
            store,
            platform,
            bus: SessionBus::new(),
            live: Arc::new(live),
            notices,
        }
    }

    /// Startup restore: trusts the saved connection flag without acquiring
    /// the device again.
    pub async fn restore(&self) -> Session {
        let _op = self.operation.lock().await;
        let saved = self.store.load();

        let snapshot = {
            let mut state = self.state.lock().await;
            state.restore_from(&saved);
            state.clone()
        };
        self.publish_live(&snapshot);

        info!(
            "Restored session: {:?} on {}",
            snapshot.state,
            snapshot
                .device
                .as_ref()
                .map(|d| d.label.as_str())
                .unwrap_or("no device")
        );
        snapshot
    }

    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.clone()
    }

    /// Session as last written to disk, for observers reacting to a signal.
    ///
    /// Falls back to the cached copy when the file cannot be read.
    pub fn persisted(&self) -> PersistedSession {
        self.store.read_from_disk().unwrap_or_else(|err| {
            warn!("Session file unreadable, using cached session: {err:#}");
            self.store.load()
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.bus.subscribe()
    }

    /// Live view including the intermediate `Connecting` and `Failed` states.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.live.subscribe()
    }

    /// Selects `device`. Switching away from a connected device disconnects
    /// first; the new device is never connected implicitly.
    pub async fn select_device(&self, device: DeviceDescriptor) -> Result<Session> {
        let _op = self.operation.lock().await;

        let (was_connected, unchanged) = {
            let state = self.state.lock().await;
            (
                state.is_connected(),
                state.device.as_ref() == Some(&device),
            )
        };
        if unchanged {
            return Ok(self.snapshot().await);
        }

        if was_connected {
            info!("Switching device; disconnecting current session first");
            self.disconnect_inner().await;
        }

        let snapshot = {
            let mut state = self.state.lock().await;
            state.select(device);
            state.clone()
        };
        self.persist(&snapshot);
        self.publish_live(&snapshot);

        info!(
            "Selected capture device {}",
            snapshot.device.as_ref().map(|d| d.id.as_str()).unwrap_or_default()
        );
        Ok(snapshot)
    }

    /// Reconciles the selection with a fresh enumeration: keeps the selected
    /// device when it is still present, otherwise falls back to the first one.
    pub async fn adopt_devices(&self, devices: &[DeviceDescriptor]) -> Result<Session> {
        let current = self.snapshot().await;
        let current_id = current.device.as_ref().map(|d| d.id.as_str());

        match resolve_selection(devices, current_id) {
            Some(device) if Some(device.id.as_str()) != current_id => {
                self.select_device(device).await
            }
            _ => Ok(current),
        }
    }

    pub async fn connect(&self) -> Result<Session> {
        let _op = self.operation.lock().await;

        let device = {
            let mut state = self.state.lock().await;
            if state.is_connected() {
                return Ok(state.clone());
            }
            let Some(device) = state.device.clone() else {
                drop(state);
                let err = AppError::NoDeviceSelected;
                self.notices.error(&err);
                return Err(err);
            };
            state.begin_connecting();
            self.publish_live(&state);
            device
        };

        info!("Connecting to {} ({})", device.label, device.id);

        match self.platform.acquire(&device).await {
            Ok(()) => {
                let snapshot = {
                    let mut state = self.state.lock().await;
                    state.mark_connected();
                    state.clone()
                };
                self.persist(&snapshot);
                self.publish_live(&snapshot);
                self.notify();

                info!("Camera {} connected", device.label);
                self.notices.success("Camera connected successfully!");
                Ok(snapshot)
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!("Camera connection to {} failed: {message}", device.id);

                {
                    let mut state = self.state.lock().await;
                    state.mark_failed(message.clone());
                    self.publish_live(&state);
                    state.reset_after_failure();
                    self.publish_live(&state);
                }
                self.notify();

                let err = AppError::ConnectionFailed(message);
                self.notices.error(&err);
                Err(err)
            }
        }
    }

    /// Disconnects a connected session; anything else is a no-op.
    pub async fn disconnect(&self) -> Result<Session> {
        let _op = self.operation.lock().await;
        if self.disconnect_inner().await {
            self.notices.info("Camera disconnected");
        }
        Ok(self.snapshot().await)
    }

    /// Caller must hold the operation lock. Returns whether anything changed.
    async fn disconnect_inner(&self) -> bool {
        let snapshot = {
            let mut state = self.state.lock().await;
            if !state.is_connected() {
                return false;
            }
            state.mark_disconnected();
            state.clone()
        };

        if let Some(device) = &snapshot.device {
            if let Err(err) = self.platform.release(device).await {
                warn!("Failed to release {}: {err:#}", device.id);
            }
        }
        self.persist(&snapshot);
        self.publish_live(&snapshot);
        self.notify();
        info!("Camera disconnected");
        true
    }

    fn persist(&self, session: &Session) {
        if let Err(err) = self.store.save(&session.to_persisted()) {
            error!("Failed to persist session state: {err:#}");
        }
    }

    fn publish_live(&self, session: &Session) {
        self.live.send_replace(session.clone());
    }

    fn notify(&self) {
        let reached = self.bus.publish(SessionSignal::CameraStatusChanged);
        info!(
            "{} delivered to {reached} subscriber(s)",
            SessionSignal::CameraStatusChanged.event_name()
        );
    }
}
