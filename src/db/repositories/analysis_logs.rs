use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    db::{
        helpers::{parse_datetime, to_confidence},
        Database,
    },
    log_store::{LogKey, LogOutcome, LogRecord, LogStore, SourceType},
};

const SELECT_COLUMNS: &str =
    "SELECT id, analyzed_at, source_type, is_ai, confidence FROM analysis_logs";

fn row_to_record(row: &Row) -> Result<LogRecord> {
    let id: String = row.get("id")?;
    let analyzed_at: String = row.get("analyzed_at")?;
    let source_type: String = row.get("source_type")?;

    Ok(LogRecord {
        key: LogKey(Uuid::parse_str(&id).with_context(|| format!("invalid log id {id}"))?),
        analyzed_at: parse_datetime(&analyzed_at, "analyzed_at")?,
        source_type: SourceType::parse(&source_type)?,
        is_ai: row.get("is_ai")?,
        confidence: to_confidence(row.get("confidence")?)?,
    })
}

impl Database {
    /// Most recent analysis attempts first.
    pub async fn recent_analysis_logs(&self, limit: usize) -> Result<Vec<LogRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} ORDER BY analyzed_at DESC, created_at DESC LIMIT ?1"
            ))?;
            let mut rows = stmt.query(params![limit])?;

            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn get_analysis_log(&self, key: &LogKey) -> Result<Option<LogRecord>> {
        let id = key.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            stmt.query_row(params![id], |row| Ok(row_to_record(row)))
                .optional()?
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl LogStore for Database {
    async fn append(&self, record: LogRecord) -> Result<LogKey> {
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO analysis_logs
                     (id, analyzed_at, source_type, is_ai, confidence, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.key.to_string(),
                    record.analyzed_at.to_rfc3339(),
                    record.source_type.as_str(),
                    record.is_ai,
                    record.confidence,
                    now,
                    now,
                ],
            )
            .with_context(|| format!("failed to insert analysis log {}", record.key))?;
            Ok(record.key)
        })
        .await
    }

    async fn update(&self, key: &LogKey, outcome: LogOutcome) -> Result<()> {
        let key = *key;
        self.execute(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE analysis_logs
                     SET is_ai = ?1,
                         confidence = ?2,
                         updated_at = ?3
                     WHERE id = ?4",
                    params![
                        outcome.is_ai,
                        outcome.confidence,
                        Utc::now().to_rfc3339(),
                        key.to_string(),
                    ],
                )
                .with_context(|| format!("failed to update analysis log {key}"))?;
            if changed == 0 {
                bail!("no analysis log with key {key}");
            }
            Ok(())
        })
        .await
    }
}
