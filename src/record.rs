//! Captured frame records
//!
//! A frame record is one characteristic notification as captured off the air:
//! the device it came from, the characteristic, and the raw payload as hex.
//! Records are exchanged as NDJSON (one per line) or as a JSON array.

use crate::error::TelemetryError;
use crate::gatt::Characteristic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One captured characteristic notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub device_id: String,
    /// Characteristic name, short assigned number, or full UUID
    pub characteristic: String,
    pub payload_hex: String,
    /// Capture time; decode time is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FrameRecord {
    pub fn new(
        device_id: impl Into<String>,
        characteristic: Characteristic,
        payload: &[u8],
    ) -> Self {
        Self {
            device_id: device_id.into(),
            characteristic: characteristic.as_str().to_string(),
            payload_hex: hex::encode(payload),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn characteristic(&self) -> Result<Characteristic, TelemetryError> {
        Ok(self.characteristic.parse::<Characteristic>()?)
    }

    /// Raw payload bytes; whitespace and an optional `0x` prefix are tolerated
    pub fn payload(&self) -> Result<Vec<u8>, TelemetryError> {
        parse_hex(&self.payload_hex)
    }
}

/// Parse a hex payload such as `"00 4b"` or `"0x004B"`
pub fn parse_hex(payload: &str) -> Result<Vec<u8>, TelemetryError> {
    let trimmed = payload.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    Ok(hex::decode(digits)?)
}

/// Parse a JSON array of frame records
pub fn parse_array(json: &str) -> Result<Vec<FrameRecord>, TelemetryError> {
    let records: Vec<FrameRecord> = serde_json::from_str(json)?;
    Ok(records)
}

/// Parse NDJSON frame records, skipping blank lines
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<FrameRecord>, TelemetryError> {
    let mut records = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<FrameRecord>(trimmed).map_err(|e| {
            TelemetryError::ParseError(format!("line {}: {}", line_num + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}
