use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;

use super::registry::{DeviceDescriptor, DevicePlatform, PermissionState};

pub const WIFI_CAMERA_ID: &str = "wifi-camera";
pub const WIFI_CAMERA_LABEL: &str = "Wi-Fi Camera";

/// In-process stand-in for a platform camera stack.
///
/// By default it exposes one Wi-Fi camera that connects after a fixed delay.
/// The device list, permission answer and acquisition outcome can all be
/// scripted.
pub struct SimulatedPlatform {
    devices: Vec<DeviceDescriptor>,
    permission: PermissionState,
    acquire_delay: Duration,
    acquire_error: Mutex<Option<String>>,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
}

impl SimulatedPlatform {
    pub fn wifi_camera(acquire_delay: Duration) -> Self {
        Self::with_devices(vec![DeviceDescriptor::new(
            WIFI_CAMERA_ID,
            WIFI_CAMERA_LABEL,
        )])
        .with_acquire_delay(acquire_delay)
    }

    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            permission: PermissionState::Granted,
            acquire_delay: Duration::ZERO,
            acquire_error: Mutex::new(None),
            acquisitions: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn deny_permission(mut self) -> Self {
        self.permission = PermissionState::Denied;
        self
    }

    /// Makes every following acquisition fail with `message` (or succeed again
    /// with `None`).
    pub fn set_acquire_error(&self, message: Option<&str>) {
        let mut guard = match self.acquire_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = message.map(str::to_string);
    }

    /// Number of acquisition attempts seen so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Number of releases seen so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevicePlatform for SimulatedPlatform {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn request_permission(&self) -> Result<PermissionState> {
        Ok(self.permission)
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        if self.permission == PermissionState::Denied {
            return Ok(Vec::new());
        }
        Ok(self.devices.clone())
    }

    async fn acquire(&self, device: &DeviceDescriptor) -> Result<()> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        let scripted = match self.acquire_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(message) = scripted {
            return Err(anyhow!(message));
        }

        if !self.devices.iter().any(|known| known.id == device.id) {
            return Err(anyhow!("device {} is not available", device.id));
        }

        info!("Simulated camera {} acquired", device.label);
        Ok(())
    }

    async fn release(&self, device: &DeviceDescriptor) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        info!("Simulated camera {} released", device.label);
        Ok(())
    }
}
