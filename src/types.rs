//! Core types for Wearwire
//!
//! This module defines the typed readings produced by the frame decoders and the
//! logical device identity they are attributed to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound of the confidence scale
pub const MAX_CONFIDENCE: u8 = 100;

/// Capability a peripheral exposes through a GATT characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    HeartRate,
    RunningSpeedCadence,
    BatteryLevel,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::HeartRate => "heart_rate",
            Capability::RunningSpeedCadence => "running_speed_cadence",
            Capability::BatteryLevel => "battery_level",
        }
    }
}

/// Connection state tracked for a registered device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Logical identity of a paired peripheral
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Platform-assigned device identifier
    pub id: String,
    /// Display name advertised by the peripheral
    pub name: String,
    /// Characteristics the device is known to expose
    pub capabilities: Vec<Capability>,
    /// Last reported battery level (0-100)
    pub battery_level: Option<u8>,
    /// Owning user, when the caller persists devices per user
    pub user_id: Option<String>,
    /// When the device was paired with this registry
    pub paired_at: DateTime<Utc>,
    /// Current connection state
    pub state: ConnectionState,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: Vec::new(),
            battery_level: None,
            user_id: None,
            paired_at: Utc::now(),
            state: ConnectionState::Connected,
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Heart rate measurement decoded from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateReading {
    /// Source device (empty until stamped by the caller)
    pub device_id: String,
    /// Decode time
    pub timestamp: DateTime<Utc>,
    /// Heart rate (beats per minute)
    pub heart_rate: u16,
    /// Energy expended since last reset (kJ)
    pub energy_expended_kj: Option<u16>,
    /// RR-intervals (ms)
    pub rr_intervals_ms: Option<Vec<f64>>,
    /// Skin contact, when the sensor supports contact detection
    pub sensor_contact: Option<bool>,
    /// Confidence score (0-100)
    pub confidence: u8,
}

/// Running speed and cadence measurement decoded from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityReading {
    /// Source device (empty until stamped by the caller)
    pub device_id: String,
    /// Decode time
    pub timestamp: DateTime<Utc>,
    /// Instantaneous speed (m/s)
    pub speed_mps: f64,
    /// Instantaneous cadence (steps per minute)
    pub cadence_spm: u8,
    /// Instantaneous stride length (m)
    pub stride_length_m: Option<f64>,
    /// Total distance (m)
    pub distance_m: Option<u32>,
    /// Pace derived from speed (min/km), 0 when stationary
    pub pace_min_per_km: f64,
    /// Linear calorie estimate (kcal)
    pub calories: u32,
    /// Confidence score (0-100)
    pub confidence: u8,
}

/// Battery level decoded from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    /// Remaining charge (0-100)
    pub level_percent: u8,
}

/// Any reading a frame can decode into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    HeartRate(HeartRateReading),
    Activity(ActivityReading),
    Battery(BatteryReading),
}

impl Reading {
    pub fn device_id(&self) -> &str {
        match self {
            Reading::HeartRate(r) => &r.device_id,
            Reading::Activity(r) => &r.device_id,
            Reading::Battery(r) => &r.device_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Reading::HeartRate(r) => r.timestamp,
            Reading::Activity(r) => r.timestamp,
            Reading::Battery(r) => r.timestamp,
        }
    }

    /// Confidence of the reading; battery levels are reported as certain
    pub fn confidence(&self) -> u8 {
        match self {
            Reading::HeartRate(r) => r.confidence,
            Reading::Activity(r) => r.confidence,
            Reading::Battery(_) => MAX_CONFIDENCE,
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Reading::HeartRate(_) => Capability::HeartRate,
            Reading::Activity(_) => Capability::RunningSpeedCadence,
            Reading::Battery(_) => Capability::BatteryLevel,
        }
    }

    /// Attribute the reading to a device
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();
        match &mut self {
            Reading::HeartRate(r) => r.device_id = device_id,
            Reading::Activity(r) => r.device_id = device_id,
            Reading::Battery(r) => r.device_id = device_id,
        }
        self
    }
}

impl From<HeartRateReading> for Reading {
    fn from(r: HeartRateReading) -> Self {
        Reading::HeartRate(r)
    }
}

impl From<ActivityReading> for Reading {
    fn from(r: ActivityReading) -> Self {
        Reading::Activity(r)
    }
}

impl From<BatteryReading> for Reading {
    fn from(r: BatteryReading) -> Self {
        Reading::Battery(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_heart_rate() -> HeartRateReading {
        HeartRateReading {
            device_id: String::new(),
            timestamp: Utc::now(),
            heart_rate: 72,
            energy_expended_kj: None,
            rr_intervals_ms: Some(vec![812.5]),
            sensor_contact: Some(true),
            confidence: 95,
        }
    }

    #[test]
    fn test_with_device_id_stamps_reading() {
        let reading = Reading::from(sample_heart_rate()).with_device_id("strap-1");
        assert_eq!(reading.device_id(), "strap-1");
        assert_eq!(reading.capability(), Capability::HeartRate);
        assert_eq!(reading.confidence(), 95);
    }

    #[test]
    fn test_reading_serializes_with_kind_tag() {
        let reading = Reading::from(sample_heart_rate());
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["kind"], "heart_rate");
        assert_eq!(value["heart_rate"], 72);
        assert_eq!(value["rr_intervals_ms"][0], 812.5);
    }

    #[test]
    fn test_device_capabilities_are_deduplicated() {
        let device = Device::new("pod-1", "Foot Pod")
            .with_capability(Capability::RunningSpeedCadence)
            .with_capability(Capability::RunningSpeedCadence)
            .with_capability(Capability::BatteryLevel);

        assert_eq!(device.capabilities.len(), 2);
        assert!(device.supports(Capability::BatteryLevel));
        assert!(!device.supports(Capability::HeartRate));
        assert_eq!(device.state, ConnectionState::Connected);
    }
}
