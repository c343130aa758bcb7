use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};

use super::registry::{DeviceDescriptor, DevicePlatform, PermissionState};

const VIDEO4LINUX_CLASS_DIR: &str = "/sys/class/video4linux";
const DEV_DIR: &str = "/dev";

/// V4L2 capture devices discovered through sysfs.
///
/// Ids are device node paths (`/dev/video0`), labels come from the driver's
/// `name` attribute. An acquired node stays open until it is released.
pub struct SysfsPlatform {
    class_dir: PathBuf,
    dev_dir: PathBuf,
    held: Mutex<HashMap<String, tokio::fs::File>>,
}

impl Default for SysfsPlatform {
    fn default() -> Self {
        Self::new(VIDEO4LINUX_CLASS_DIR, DEV_DIR)
    }
}

impl SysfsPlatform {
    pub fn new(class_dir: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            class_dir: class_dir.into(),
            dev_dir: dev_dir.into(),
            held: Mutex::new(HashMap::new()),
        }
    }

    fn held(&self) -> MutexGuard<'_, HashMap<String, tokio::fs::File>> {
        match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn scan(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut entries = match tokio::fs::read_dir(&self.class_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read {}", self.class_dir.display())
                })
            }
        };

        let mut found: Vec<(u32, DeviceDescriptor)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let node = entry.file_name().to_string_lossy().into_owned();
            let Some(index) = video_index(&node) else {
                continue;
            };

            let label = match tokio::fs::read_to_string(entry.path().join("name")).await {
                Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => node.clone(),
            };

            found.push((
                index,
                DeviceDescriptor {
                    id: self.dev_dir.join(&node).to_string_lossy().into_owned(),
                    label,
                },
            ));
        }

        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, device)| device).collect())
    }
}

fn video_index(node: &str) -> Option<u32> {
    node.strip_prefix("video")
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}

#[async_trait]
impl DevicePlatform for SysfsPlatform {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    async fn request_permission(&self) -> Result<PermissionState> {
        let devices = self.scan().await?;
        if devices.is_empty() {
            return Ok(PermissionState::Granted);
        }

        let mut denied = 0;
        for device in &devices {
            match tokio::fs::File::open(Path::new(&device.id)).await {
                Ok(_) => return Ok(PermissionState::Granted),
                Err(err) if err.kind() == ErrorKind::PermissionDenied => denied += 1,
                Err(err) => debug!("{} not openable: {err}", device.id),
            }
        }

        if denied == devices.len() {
            Ok(PermissionState::Denied)
        } else {
            Ok(PermissionState::Granted)
        }
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        self.scan().await
    }

    async fn acquire(&self, device: &DeviceDescriptor) -> Result<()> {
        let node = tokio::fs::OpenOptions::new()
            .read(true)
            .open(Path::new(&device.id))
            .await
            .with_context(|| format!("failed to open {}", device.id))?;
        self.held().insert(device.id.clone(), node);
        info!("Opened capture device {} ({})", device.label, device.id);
        Ok(())
    }

    async fn release(&self, device: &DeviceDescriptor) -> Result<()> {
        if self.held().remove(&device.id).is_some() {
            info!("Closed capture device {} ({})", device.label, device.id);
        }
        Ok(())
    }
}
