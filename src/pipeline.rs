//! Pipeline orchestration
//!
//! This module provides the public API for Wearwire. It ties the stages
//! together: frame decoding → device attribution → rolling window aggregation →
//! listener dispatch → snapshot encoding.

use crate::config::ProcessorConfig;
use crate::decoder::{decode_frame, decode_frame_at};
use crate::encoder::{SnapshotEncoder, TelemetrySnapshot};
use crate::error::TelemetryError;
use crate::gatt::Characteristic;
use crate::record::{parse_hex, FrameRecord};
use crate::registry::{DeviceRegistry, ListenerId, ReadingListener};
use crate::types::{Device, Reading};
use crate::window::{RollingWindow, WindowSummary};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Decode one hex-encoded frame into reading JSON.
///
/// # Arguments
/// * `characteristic` - Characteristic name, short assigned number or full UUID
/// * `payload_hex` - Frame payload as hex
/// * `device_id` - Device the frame was received from
///
/// # Example
/// ```ignore
/// let json = decode_frame_to_json("2a37", "004b", "strap-1")?;
/// ```
pub fn decode_frame_to_json(
    characteristic: &str,
    payload_hex: &str,
    device_id: &str,
) -> Result<String, TelemetryError> {
    let characteristic: Characteristic = characteristic.parse()?;
    let payload = parse_hex(payload_hex)?;
    let reading = decode_frame(characteristic, &payload)?.with_device_id(device_id);
    Ok(serde_json::to_string(&reading)?)
}

/// Stateful processor owning the device registry and per-device windows.
///
/// Decode failures never escape `ingest`: the frame is dropped, logged and
/// counted, and the caller carries on with the next notification.
pub struct TelemetryProcessor {
    config: ProcessorConfig,
    registry: DeviceRegistry,
    windows: HashMap<String, RollingWindow>,
    encoder: SnapshotEncoder,
    decoded_frames: u64,
    dropped_frames: u64,
}

impl Default for TelemetryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::build(ProcessorConfig::default())
    }

    /// Create a processor from validated configuration
    pub fn with_config(config: ProcessorConfig) -> Result<Self, TelemetryError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a processor with a specific window size
    pub fn with_window_size(window_size: usize) -> Self {
        Self::build(ProcessorConfig::default().with_window_size(window_size.max(1)))
    }

    fn build(config: ProcessorConfig) -> Self {
        Self {
            config,
            registry: DeviceRegistry::new(),
            windows: HashMap::new(),
            encoder: SnapshotEncoder::new(),
            decoded_frames: 0,
            dropped_frames: 0,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    pub fn register_device(&mut self, device: Device) -> Option<Device> {
        self.registry.register(device)
    }

    pub fn subscribe(&mut self, listener: impl ReadingListener + 'static) -> ListenerId {
        self.registry.subscribe(listener)
    }

    /// Frames decoded successfully since creation
    pub fn decoded_frames(&self) -> u64 {
        self.decoded_frames
    }

    /// Frames and records dropped as malformed or unparseable since creation
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Decode a notification and route the reading.
    ///
    /// Returns `None` when the frame is malformed.
    pub fn ingest(
        &mut self,
        device_id: &str,
        characteristic: Characteristic,
        frame: &[u8],
    ) -> Option<Reading> {
        self.ingest_at(device_id, characteristic, frame, Utc::now())
    }

    /// Decode a notification captured at `timestamp` and route the reading
    pub fn ingest_at(
        &mut self,
        device_id: &str,
        characteristic: Characteristic,
        frame: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Option<Reading> {
        let reading = match decode_frame_at(characteristic, frame, timestamp) {
            Ok(reading) => reading.with_device_id(device_id),
            Err(e) => {
                self.dropped_frames += 1;
                warn!(device_id, %characteristic, error = %e, "dropping frame");
                return None;
            }
        };
        self.decoded_frames += 1;

        if self.registry.contains(device_id) {
            if let Err(e) = self.registry.observe(&reading) {
                debug!(device_id, error = %e, "device state not updated");
            }
        }

        let window_size = self.config.window_size;
        self.windows
            .entry(device_id.to_string())
            .or_insert_with(|| RollingWindow::new(window_size))
            .push(&reading);

        self.registry.dispatch(&reading);
        Some(reading)
    }

    /// Ingest a captured frame record.
    ///
    /// A record whose characteristic or hex payload cannot be parsed is
    /// dropped and counted like a malformed frame.
    pub fn ingest_record(&mut self, record: &FrameRecord) -> Option<Reading> {
        let parsed = record
            .characteristic()
            .and_then(|characteristic| Ok((characteristic, record.payload()?)));
        let (characteristic, payload) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                self.dropped_frames += 1;
                warn!(device_id = %record.device_id, error = %e, "dropping frame record");
                return None;
            }
        };
        let timestamp = record.timestamp.unwrap_or_else(Utc::now);
        self.ingest_at(&record.device_id, characteristic, &payload, timestamp)
    }

    /// Current summary for a device, if any reading has been seen
    pub fn summary(&self, device_id: &str) -> Option<WindowSummary> {
        self.windows.get(device_id).map(|window| {
            window.summary(
                self.config.significance_threshold,
                self.config.min_correlation_samples,
            )
        })
    }

    /// Snapshot of one device
    pub fn snapshot(&self, device_id: &str) -> Option<TelemetrySnapshot> {
        let window = self.windows.get(device_id)?;
        let summary = window.summary(
            self.config.significance_threshold,
            self.config.min_correlation_samples,
        );
        Some(self.encoder.encode(
            device_id,
            self.registry.get(device_id),
            window.window_size(),
            summary,
        ))
    }

    /// Snapshots of every device with a window, sorted by device id
    pub fn snapshots(&self) -> Vec<TelemetrySnapshot> {
        let mut ids: Vec<&String> = self.windows.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.snapshot(id)).collect()
    }

    pub fn snapshot_json(&self, device_id: &str) -> Result<Option<String>, TelemetryError> {
        self.snapshot(device_id)
            .map(|snapshot| serde_json::to_string(&snapshot).map_err(TelemetryError::JsonError))
            .transpose()
    }

    /// Drop a device's window
    pub fn reset_window(&mut self, device_id: &str) -> bool {
        self.windows.remove(device_id).is_some()
    }

    /// Save all device windows to JSON
    pub fn save_windows(&self) -> Result<String, TelemetryError> {
        let ordered: BTreeMap<&String, &RollingWindow> = self.windows.iter().collect();
        serde_json::to_string(&ordered).map_err(TelemetryError::JsonError)
    }

    /// Load device windows from JSON, replacing current windows.
    ///
    /// Loaded windows are resized to the configured window size.
    pub fn load_windows(&mut self, json: &str) -> Result<(), TelemetryError> {
        let mut windows: HashMap<String, RollingWindow> = serde_json::from_str(json)
            .map_err(|e| TelemetryError::ParseError(e.to_string()))?;
        for window in windows.values_mut() {
            window.resize(self.config.window_size);
        }
        self.windows = windows;
        Ok(())
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}
