use std::{collections::HashMap, fmt, sync::Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::ImageOrigin;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    Upload,
    Device,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Upload => "upload",
            SourceType::Device => "device",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "upload" => Ok(SourceType::Upload),
            "device" => Ok(SourceType::Device),
            other => Err(anyhow!("unknown source type {other}")),
        }
    }
}

impl From<ImageOrigin> for SourceType {
    fn from(origin: ImageOrigin) -> Self {
        match origin {
            ImageOrigin::Upload => SourceType::Upload,
            ImageOrigin::Device => SourceType::Device,
        }
    }
}

/// Identity of a log record, chosen by the writer when the record is
/// appended (the analysis job id).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LogKey(pub Uuid);

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub key: LogKey,
    pub analyzed_at: DateTime<Utc>,
    pub source_type: SourceType,
    pub is_ai: Option<bool>,
    pub confidence: Option<u8>,
}

impl LogRecord {
    pub fn started(key: LogKey, analyzed_at: DateTime<Utc>, source_type: SourceType) -> Self {
        Self {
            key,
            analyzed_at,
            source_type,
            is_ai: None,
            confidence: None,
        }
    }
}

/// Outcome written back onto a record once its analysis completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogOutcome {
    pub is_ai: bool,
    pub confidence: u8,
}

/// Audit trail of analysis attempts.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, record: LogRecord) -> Result<LogKey>;

    /// Fails when no record with `key` exists.
    async fn update(&self, key: &LogKey, outcome: LogOutcome) -> Result<()>;
}

/// Process-local log store, used when the database cannot be opened.
#[derive(Default)]
pub struct MemoryLogStore {
    records: Mutex<HashMap<LogKey, LogRecord>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LogKey) -> Option<LogRecord> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<LogKey, LogRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, record: LogRecord) -> Result<LogKey> {
        let key = record.key;
        let mut records = self.lock();
        if records.contains_key(&key) {
            bail!("analysis log {key} already exists");
        }
        records.insert(key, record);
        Ok(key)
    }

    async fn update(&self, key: &LogKey, outcome: LogOutcome) -> Result<()> {
        let mut records = self.lock();
        let record = records
            .get_mut(key)
            .ok_or_else(|| anyhow!("no analysis log with key {key}"))?;
        record.is_ai = Some(outcome.is_ai);
        record.confidence = Some(outcome.confidence);
        Ok(())
    }
}
