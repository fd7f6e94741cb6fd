//! Snapshot encoding
//!
//! This module encodes a device's rolling window summary into a JSON snapshot
//! carrying producer and device provenance.

use crate::error::TelemetryError;
use crate::types::{ConnectionState, Device};
use crate::window::WindowSummary;
use crate::{PRODUCER_NAME, WEARWIRE_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Snapshot producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Device provenance of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDevice {
    pub id: String,
    pub name: Option<String>,
    pub battery_level: Option<u8>,
    pub state: Option<ConnectionState>,
}

/// Rolling statistics for one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub snapshot_version: String,
    pub producer: SnapshotProducer,
    pub device: SnapshotDevice,
    pub computed_at_utc: String,
    pub window_size: usize,
    pub summary: WindowSummary,
}

/// Encoder for telemetry snapshots
pub struct SnapshotEncoder {
    instance_id: String,
}

impl Default for SnapshotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build a snapshot. `device` is `None` for readings from unregistered ids.
    pub fn encode(
        &self,
        device_id: &str,
        device: Option<&Device>,
        window_size: usize,
        summary: WindowSummary,
    ) -> TelemetrySnapshot {
        TelemetrySnapshot {
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            producer: SnapshotProducer {
                name: PRODUCER_NAME.to_string(),
                version: WEARWIRE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            device: SnapshotDevice {
                id: device_id.to_string(),
                name: device.map(|d| d.name.clone()),
                battery_level: device.and_then(|d| d.battery_level),
                state: device.map(|d| d.state),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            window_size,
            summary,
        }
    }

    pub fn encode_to_json(
        &self,
        device_id: &str,
        device: Option<&Device>,
        window_size: usize,
        summary: WindowSummary,
    ) -> Result<String, TelemetryError> {
        let snapshot = self.encode(device_id, device, window_size, summary);
        serde_json::to_string(&snapshot).map_err(TelemetryError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::RollingWindow;

    #[test]
    fn test_encode_with_device() {
        let encoder = SnapshotEncoder::with_instance_id("test-instance".to_string());
        let mut device = Device::new("strap", "Chest Strap");
        device.battery_level = Some(64);
        let summary = RollingWindow::new(5).summary(0.3, 3);

        let json = encoder
            .encode_to_json("strap", Some(&device), 5, summary)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["snapshot_version"], "1.0.0");
        assert_eq!(value["producer"]["name"], "wearwire");
        assert_eq!(value["producer"]["instance_id"], "test-instance");
        assert_eq!(value["device"]["name"], "Chest Strap");
        assert_eq!(value["device"]["battery_level"], 64);
        assert_eq!(value["device"]["state"], "connected");
        assert_eq!(value["window_size"], 5);
        assert_eq!(value["summary"]["heart_rate_samples"], 0);
    }

    #[test]
    fn test_encode_unregistered_device() {
        let encoder = SnapshotEncoder::new();
        let summary = RollingWindow::new(5).summary(0.3, 3);
        let snapshot = encoder.encode("anon", None, 5, summary);

        assert_eq!(snapshot.device.id, "anon");
        assert!(snapshot.device.name.is_none());
        assert!(!encoder.instance_id().is_empty());
    }
}
