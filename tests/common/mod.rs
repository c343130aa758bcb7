#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use authenticator_lib::{
    analysis::{AnalysisResult, ScoringPolicy},
    capture::{CapturedImage, ImageData, ImageOrigin},
    devices::{DeviceDescriptor, SimulatedPlatform},
    log_store::{LogKey, LogOutcome, LogRecord, LogStore, MemoryLogStore},
    notices::NoticeCenter,
    session::{SessionManager, SessionStore},
};
use tokio::sync::{mpsc, oneshot};

pub fn webcam() -> DeviceDescriptor {
    DeviceDescriptor::new("cam1", "Webcam")
}

pub fn upload(name: &str) -> CapturedImage {
    CapturedImage::new(
        ImageData::inline("image/png", b"\x89PNG\r\n\x1a\n".to_vec()),
        ImageOrigin::Upload,
        Some(name.to_string()),
    )
}

pub struct SessionFixture {
    pub dir: tempfile::TempDir,
    pub platform: Arc<SimulatedPlatform>,
    pub store: Arc<SessionStore>,
    pub manager: SessionManager,
}

impl SessionFixture {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(SimulatedPlatform::with_devices(devices));
        let store = Arc::new(SessionStore::new(dir.path().join("session.json")).unwrap());
        let manager = SessionManager::new(store.clone(), platform.clone(), NoticeCenter::new());
        Self {
            dir,
            platform,
            store,
            manager,
        }
    }

    /// A second manager over the same session file, as after a restart.
    pub fn reopen(&self) -> SessionManager {
        let store = Arc::new(SessionStore::new(self.dir.path().join("session.json")).unwrap());
        SessionManager::new(store, self.platform.clone(), NoticeCenter::new())
    }
}

type Verdict = std::result::Result<AnalysisResult, String>;

/// Scoring policy whose calls block until the test releases them, keyed by
/// image name.
pub struct GatedScoringPolicy {
    gates: Mutex<HashMap<String, oneshot::Receiver<Verdict>>>,
    started: mpsc::UnboundedSender<String>,
}

pub struct ScoringGates {
    senders: HashMap<String, oneshot::Sender<Verdict>>,
    started: mpsc::UnboundedReceiver<String>,
}

pub fn gated_policy(names: &[&str]) -> (Arc<GatedScoringPolicy>, ScoringGates) {
    let mut receivers = HashMap::new();
    let mut senders = HashMap::new();
    for name in names {
        let (tx, rx) = oneshot::channel();
        senders.insert(name.to_string(), tx);
        receivers.insert(name.to_string(), rx);
    }
    let (started_tx, started_rx) = mpsc::unbounded_channel();

    (
        Arc::new(GatedScoringPolicy {
            gates: Mutex::new(receivers),
            started: started_tx,
        }),
        ScoringGates {
            senders,
            started: started_rx,
        },
    )
}

impl ScoringGates {
    /// Waits until the policy has been invoked for `name`.
    pub async fn wait_started(&mut self, name: &str) {
        let seen = self.started.recv().await.expect("policy dropped");
        assert_eq!(seen, name, "scoring started out of order");
    }

    pub fn release(&mut self, name: &str, verdict: Verdict) {
        let sender = self.senders.remove(name).expect("unknown or released gate");
        let _ = sender.send(verdict);
    }
}

#[async_trait]
impl ScoringPolicy for GatedScoringPolicy {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn classify(&self, image: &CapturedImage) -> Result<AnalysisResult> {
        let name = image.name.clone().unwrap_or_default();
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(&name)
            .ok_or_else(|| anyhow!("no gate for image {name}"))?;
        let _ = self.started.send(name);

        match gate.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(anyhow!(message)),
            Err(_) => bail!("gate dropped"),
        }
    }
}

/// Log store that records the order of calls, can hold appends until
/// released and can be told to fail.
#[derive(Default)]
pub struct RecordingLogStore {
    inner: MemoryLogStore,
    calls: Mutex<Vec<String>>,
    append_gate: Mutex<Option<oneshot::Receiver<()>>>,
    failing: bool,
}

impl RecordingLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Holds the next append until the returned sender fires.
    pub fn hold_next_append(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.append_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get(&self, key: &LogKey) -> Option<LogRecord> {
        self.inner.get(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl LogStore for RecordingLogStore {
    async fn append(&self, record: LogRecord) -> Result<LogKey> {
        let gate = self.append_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.calls.lock().unwrap().push(format!("append {}", record.key));
        if self.failing {
            bail!("log service unreachable");
        }
        self.inner.append(record).await
    }

    async fn update(&self, key: &LogKey, outcome: LogOutcome) -> Result<()> {
        self.calls.lock().unwrap().push(format!("update {key}"));
        if self.failing {
            bail!("log service unreachable");
        }
        self.inner.update(key, outcome).await
    }
}
