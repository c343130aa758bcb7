use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A capture device as reported by the platform. Unique by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
}

/// Platform capability for camera permission, enumeration and acquisition.
///
/// Implementations may suspend on any call (a permission prompt, a slow
/// network camera). None of them may touch session state.
#[async_trait]
pub trait DevicePlatform: Send + Sync {
    fn name(&self) -> &'static str;

    async fn request_permission(&self) -> anyhow::Result<PermissionState>;

    /// Device labels are only meaningful after permission was granted.
    async fn enumerate(&self) -> anyhow::Result<Vec<DeviceDescriptor>>;

    /// Opens the device for capture and holds it until [`Self::release`].
    async fn acquire(&self, device: &DeviceDescriptor) -> anyhow::Result<()>;

    /// Gives back a device taken by `acquire`. Releasing a device that is not
    /// held is a no-op.
    async fn release(&self, _device: &DeviceDescriptor) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct DeviceRegistry {
    platform: Arc<dyn DevicePlatform>,
}

impl DeviceRegistry {
    pub fn new(platform: Arc<dyn DevicePlatform>) -> Self {
        Self { platform }
    }

    /// Asks for permission, then enumerates.
    ///
    /// A denied (or failed) permission request yields
    /// [`AppError::PermissionDenied`] and no devices. Enumeration failures
    /// after a grant are logged and yield an empty list.
    pub async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let permission = match self.platform.request_permission().await {
            Ok(permission) => permission,
            Err(err) => {
                warn!(
                    "Permission request on {} platform failed: {err:#}",
                    self.platform.name()
                );
                PermissionState::Denied
            }
        };

        if permission == PermissionState::Denied {
            info!("Camera permission denied on {} platform", self.platform.name());
            return Err(AppError::PermissionDenied);
        }

        let devices = match self.platform.enumerate().await {
            Ok(devices) => devices,
            Err(err) => {
                warn!("Device enumeration failed: {err:#}");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let devices: Vec<_> = devices
            .into_iter()
            .filter(|device| seen.insert(device.id.clone()))
            .collect();

        info!(
            "Enumerated {} capture device(s) on {} platform",
            devices.len(),
            self.platform.name()
        );
        Ok(devices)
    }
}

/// Picks the device to preselect: the previously selected one when it is still
/// present, otherwise the first enumerated device.
pub fn resolve_selection(
    devices: &[DeviceDescriptor],
    previous_id: Option<&str>,
) -> Option<DeviceDescriptor> {
    previous_id
        .and_then(|id| devices.iter().find(|device| device.id == id))
        .or_else(|| devices.first())
        .cloned()
}
