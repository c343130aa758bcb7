use std::{ops::Range, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::capture::CapturedImage;

/// Reported confidence, in percent.
pub const CONFIDENCE_RANGE: Range<u8> = 70..95;

/// Explanation tags attached to an AI verdict, in display order.
pub const AI_INDICATORS: [&str; 3] = [
    "Face features",
    "Background inconsistency",
    "Lighting artifacts",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_ai: bool,
    pub confidence: u8,
    pub areas: Vec<String>,
}

impl AnalysisResult {
    /// Builds a result with the standard tags for an AI verdict and none
    /// otherwise.
    pub fn new(is_ai: bool, confidence: u8) -> Self {
        let areas = if is_ai {
            AI_INDICATORS.iter().map(|area| area.to_string()).collect()
        } else {
            Vec::new()
        };
        Self {
            is_ai,
            confidence,
            areas,
        }
    }

    /// Checks the invariants every published result holds.
    pub fn validate(&self) -> Result<()> {
        if !CONFIDENCE_RANGE.contains(&self.confidence) {
            bail!(
                "confidence {} outside {}..{}",
                self.confidence,
                CONFIDENCE_RANGE.start,
                CONFIDENCE_RANGE.end
            );
        }
        if !self.is_ai && !self.areas.is_empty() {
            bail!("authentic verdict must not carry suspicious areas");
        }
        Ok(())
    }
}

/// Maps a captured image to a verdict. The pipeline does not care how.
#[async_trait]
pub trait ScoringPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, image: &CapturedImage) -> Result<AnalysisResult>;
}

/// Demo policy: a coin flip and a random confidence after a fixed delay.
pub struct RandomScoringPolicy {
    latency: Duration,
}

impl RandomScoringPolicy {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl ScoringPolicy for RandomScoringPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn classify(&self, _image: &CapturedImage) -> Result<AnalysisResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let (is_ai, confidence) = {
            let mut rng = rand::thread_rng();
            (rng.gen_bool(0.5), rng.gen_range(CONFIDENCE_RANGE))
        };
        Ok(AnalysisResult::new(is_ai, confidence))
    }
}

/// Always returns the same verdict.
pub struct FixedScoringPolicy {
    result: AnalysisResult,
    latency: Duration,
}

impl FixedScoringPolicy {
    pub fn new(is_ai: bool, confidence: u8) -> Self {
        Self {
            result: AnalysisResult::new(is_ai, confidence),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl ScoringPolicy for FixedScoringPolicy {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn classify(&self, _image: &CapturedImage) -> Result<AnalysisResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.result.clone())
    }
}
