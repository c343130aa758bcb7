use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::{
    analysis::AnalysisPipeline,
    error::{AppError, Result},
    notices::NoticeCenter,
    session::SessionManager,
};

use super::{
    image::{is_image_media_type, CapturedImage, ImageData, ImageOrigin, UploadFile},
    policy::CapturePolicy,
};

/// Produces the image the next analysis runs on.
///
/// A new capture replaces the current image and retires whatever result or
/// running analysis belonged to the previous one.
#[derive(Clone)]
pub struct CaptureSource {
    session: SessionManager,
    policy: Arc<dyn CapturePolicy>,
    pipeline: AnalysisPipeline,
    current: Arc<Mutex<Option<CapturedImage>>>,
    notices: NoticeCenter,
}

impl CaptureSource {
    pub fn new(
        session: SessionManager,
        policy: Arc<dyn CapturePolicy>,
        pipeline: AnalysisPipeline,
        notices: NoticeCenter,
    ) -> Self {
        Self {
            session,
            policy,
            pipeline,
            current: Arc::new(Mutex::new(None)),
            notices,
        }
    }

    pub async fn current(&self) -> Option<CapturedImage> {
        self.current.lock().await.clone()
    }

    /// Accepts a user-selected file. Non-image files are rejected and leave
    /// the current image untouched.
    pub async fn from_file(&self, file: UploadFile) -> Result<CapturedImage> {
        let media_type = file.resolved_media_type().unwrap_or_default();
        if !is_image_media_type(&media_type) {
            warn!("Rejected upload {} ({media_type:?})", file.name);
            let err = AppError::UnsupportedFileType(media_type);
            self.notices.error(&err);
            return Err(err);
        }

        let image = CapturedImage::new(
            ImageData::inline(media_type, file.bytes),
            ImageOrigin::Upload,
            Some(file.name),
        );
        self.replace(image.clone()).await;

        info!(
            "Uploaded {}",
            image.name.as_deref().unwrap_or("unnamed image")
        );
        self.notices.success("Image uploaded successfully!");
        Ok(image)
    }

    /// Grabs a frame from the connected device.
    pub async fn from_device(&self) -> Result<CapturedImage> {
        let session = self.session.snapshot().await;
        let device = match session.device {
            Some(device) if session.is_connected() => device,
            _ => {
                let err = AppError::NotConnected;
                self.notices.error(&err);
                return Err(err);
            }
        };

        let data = match self.policy.capture(&device).await {
            Ok(data) => data,
            Err(err) => {
                let message = format!("{err:#}");
                warn!("Capture from {} failed: {message}", device.id);
                let err = AppError::ConnectionFailed(message);
                self.notices.error(&err);
                return Err(err);
            }
        };

        let image = CapturedImage::new(data, ImageOrigin::Device, Some(device.label.clone()));
        self.replace(image.clone()).await;

        info!(
            "Captured image from {} via {} policy",
            device.label,
            self.policy.name()
        );
        self.notices.success("Image captured from camera!");
        Ok(image)
    }

    async fn replace(&self, image: CapturedImage) {
        let mut current = self.current.lock().await;
        self.pipeline.invalidate(Some(&image)).await;
        *current = Some(image);
    }
}
