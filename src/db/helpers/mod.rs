use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn to_confidence(value: Option<i64>) -> Result<Option<u8>> {
    value
        .map(|raw| {
            u8::try_from(raw).map_err(|_| anyhow!("confidence {raw} is out of range"))
        })
        .transpose()
}
