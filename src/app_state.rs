use std::sync::Arc;

use anyhow::Result;
use log::{error, info};

use crate::{
    analysis::{AnalysisPipeline, Completion, RandomScoringPolicy},
    capture::{CaptureSource, StubCapturePolicy},
    config::{AppConfig, PlatformKind},
    db::Database,
    devices::{DeviceDescriptor, DevicePlatform, DeviceRegistry, SimulatedPlatform, SysfsPlatform},
    log_store::{LogStore, MemoryLogStore},
    notices::NoticeCenter,
    session::{Session, SessionManager, SessionStore},
};

/// Every long-lived service, wired together once at startup.
pub struct AppState {
    pub devices: DeviceRegistry,
    pub session: SessionManager,
    pub capture: CaptureSource,
    pub pipeline: AnalysisPipeline,
    /// `None` when the database could not be opened and logs stay in memory.
    pub db: Option<Database>,
    pub notices: NoticeCenter,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let platform: Arc<dyn DevicePlatform> = match config.platform {
            PlatformKind::Sysfs => Arc::new(SysfsPlatform::default()),
            PlatformKind::Simulated => {
                Arc::new(SimulatedPlatform::wifi_camera(config.connect_delay()))
            }
        };

        let (db, log_store): (Option<Database>, Arc<dyn LogStore>) =
            match Database::new(config.log_database_path()) {
                Ok(db) => (Some(db.clone()), Arc::new(db)),
                Err(err) => {
                    error!("Analysis log database unavailable, keeping logs in memory: {err:#}");
                    (None, Arc::new(MemoryLogStore::new()))
                }
            };

        let notices = NoticeCenter::new();
        let store = Arc::new(SessionStore::new(config.session_path())?);
        let session = SessionManager::new(store, platform.clone(), notices.clone());
        let pipeline = AnalysisPipeline::new(
            Arc::new(RandomScoringPolicy::new(config.analysis_delay())),
            log_store,
            notices.clone(),
        );
        let capture = CaptureSource::new(
            session.clone(),
            Arc::new(StubCapturePolicy::new(config.stub_images.clone())),
            pipeline.clone(),
            notices.clone(),
        );

        info!(
            "Services ready ({} platform, data in {})",
            platform.name(),
            config.data_dir.display()
        );

        Ok(Self {
            devices: DeviceRegistry::new(platform),
            session,
            capture,
            pipeline,
            db,
            notices,
        })
    }

    /// Restores the saved session. Call once before serving any operation.
    pub async fn start(&self) -> Session {
        self.session.restore().await
    }

    /// Re-enumerates devices and reconciles the selection with the result.
    pub async fn refresh_devices(&self) -> crate::error::Result<Vec<DeviceDescriptor>> {
        let devices = match self.devices.list_devices().await {
            Ok(devices) => devices,
            Err(err) => {
                self.notices.error(&err);
                return Err(err);
            }
        };
        self.session.adopt_devices(&devices).await?;
        Ok(devices)
    }

    /// Analyzes whatever image the capture source currently holds.
    pub async fn analyze_current(&self) -> crate::error::Result<Completion> {
        self.pipeline.submit(self.capture.current().await).await
    }
}
