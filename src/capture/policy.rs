use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::devices::DeviceDescriptor;

use super::image::ImageData;

/// Where device captures come from. Swap in a frame grabber to use a live
/// stream.
#[async_trait]
pub trait CapturePolicy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn capture(&self, device: &DeviceDescriptor) -> Result<ImageData>;
}

/// Hands out one of a fixed set of images at random.
pub struct StubCapturePolicy {
    images: Vec<String>,
}

impl StubCapturePolicy {
    pub fn new(images: Vec<String>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl CapturePolicy for StubCapturePolicy {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn capture(&self, device: &DeviceDescriptor) -> Result<ImageData> {
        let picked = self
            .images
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| anyhow!("no stub images configured for {}", device.label))?;
        Ok(ImageData::remote(picked))
    }
}
