use thiserror::Error;

/// Failures surfaced by the session, capture and analysis operations.
///
/// Everything except [`AppError::LogWriteFailed`] is user-facing: callers turn
/// it into a transient notice and the state machine it came from is left as it
/// was before the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("camera permission was denied")]
    PermissionDenied,
    #[error("no capture device selected")]
    NoDeviceSelected,
    #[error("failed to connect to camera: {0}")]
    ConnectionFailed(String),
    #[error("camera is not connected")]
    NotConnected,
    #[error("unsupported file type {0:?}; an image is required")]
    UnsupportedFileType(String),
    #[error("no image to analyze")]
    NoImage,
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("analysis log write failed: {0}")]
    LogWriteFailed(String),
}

impl AppError {
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, AppError::LogWriteFailed(_))
    }

    /// Text shown in the transient notice for this error.
    pub fn notice_message(&self) -> &'static str {
        match self {
            AppError::PermissionDenied => "Camera permission denied",
            AppError::NoDeviceSelected => "Please select a camera first",
            AppError::ConnectionFailed(_) => "Failed to connect to camera",
            AppError::NotConnected => "Please connect to a camera first",
            AppError::UnsupportedFileType(_) => "Please select an image file",
            AppError::NoImage => "Please upload an image first",
            AppError::AnalysisFailed(_) => "There was an error analyzing the image",
            AppError::LogWriteFailed(_) => "Analysis log unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
