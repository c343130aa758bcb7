use tokio::sync::broadcast;

/// Event name used on every cross-surface channel.
pub const CAMERA_STATUS_CHANGED: &str = "cameraStatusChanged";

const BUS_CAPACITY: usize = 32;

/// Zero-payload session signals. Receivers re-read the session instead of
/// trusting anything pushed to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    CameraStatusChanged,
}

impl SessionSignal {
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionSignal::CameraStatusChanged => CAMERA_STATUS_CHANGED,
        }
    }
}

/// Publish/subscribe channel between the session manager and the surfaces
/// watching it.
#[derive(Clone)]
pub struct SessionBus {
    sender: broadcast::Sender<SessionSignal>,
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Queues the signal on every current subscriber before returning.
    /// Returns how many subscribers were reached.
    pub fn publish(&self, signal: SessionSignal) -> usize {
        // Sending only fails when nobody is subscribed.
        self.sender.send(signal).unwrap_or(0)
    }
}
