use log::{error, info};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::AppError;

pub const NOTICE_EVENT: &str = "notice";

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A transient, user-facing message (a toast).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Fan-out of transient notices to whatever surface shows them.
#[derive(Clone)]
pub struct NoticeCenter {
    sender: broadcast::Sender<Notice>,
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeCenter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into());
    }

    /// Shows a user-facing error. Diagnostic-only errors are logged instead.
    pub fn error(&self, err: &AppError) {
        if err.is_user_facing() {
            self.publish(NoticeLevel::Error, err.notice_message().to_string());
        } else {
            error!("{err}");
        }
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        info!("notice ({level:?}): {message}");
        let _ = self.sender.send(Notice { level, message });
    }
}
