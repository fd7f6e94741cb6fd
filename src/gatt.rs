//! GATT characteristic identifiers
//!
//! Maps Bluetooth SIG assigned numbers (16-bit short form or the full 128-bit
//! UUID built on the Bluetooth base UUID) to the characteristics Wearwire decodes.

use crate::error::DecodeError;
use crate::types::Capability;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Heart Rate Measurement characteristic
pub const HEART_RATE_MEASUREMENT: u16 = 0x2A37;

/// RSC Measurement characteristic
pub const RSC_MEASUREMENT: u16 = 0x2A53;

/// Battery Level characteristic
pub const BATTERY_LEVEL: u16 = 0x2A19;

/// Suffix shared by every UUID derived from the Bluetooth base UUID
const BASE_UUID_SUFFIX: &str = "-0000-1000-8000-00805f9b34fb";

/// Characteristic a frame was received on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    HeartRateMeasurement,
    RscMeasurement,
    BatteryLevel,
}

impl Characteristic {
    pub fn assigned_number(&self) -> u16 {
        match self {
            Characteristic::HeartRateMeasurement => HEART_RATE_MEASUREMENT,
            Characteristic::RscMeasurement => RSC_MEASUREMENT,
            Characteristic::BatteryLevel => BATTERY_LEVEL,
        }
    }

    pub fn from_assigned_number(number: u16) -> Option<Self> {
        match number {
            HEART_RATE_MEASUREMENT => Some(Characteristic::HeartRateMeasurement),
            RSC_MEASUREMENT => Some(Characteristic::RscMeasurement),
            BATTERY_LEVEL => Some(Characteristic::BatteryLevel),
            _ => None,
        }
    }

    /// Full 128-bit UUID string
    pub fn uuid(&self) -> String {
        format!("0000{:04x}{}", self.assigned_number(), BASE_UUID_SUFFIX)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Characteristic::HeartRateMeasurement => "heart_rate",
            Characteristic::RscMeasurement => "running_speed_cadence",
            Characteristic::BatteryLevel => "battery_level",
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Characteristic::HeartRateMeasurement => Capability::HeartRate,
            Characteristic::RscMeasurement => Capability::RunningSpeedCadence,
            Characteristic::BatteryLevel => Capability::BatteryLevel,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Characteristic {
    type Err = DecodeError;

    /// Accepts a name (`heart_rate`), a short number (`2a37`, `0x2A37`) or a
    /// full base UUID
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();

        match lowered.as_str() {
            "heart_rate" | "heart_rate_measurement" => {
                return Ok(Characteristic::HeartRateMeasurement)
            }
            "running_speed_cadence" | "rsc" | "rsc_measurement" => {
                return Ok(Characteristic::RscMeasurement)
            }
            "battery" | "battery_level" => return Ok(Characteristic::BatteryLevel),
            _ => {}
        }

        let short = if let Some(prefix) = lowered.strip_suffix(BASE_UUID_SUFFIX) {
            prefix.strip_prefix("0000").unwrap_or(prefix)
        } else {
            lowered.strip_prefix("0x").unwrap_or(&lowered)
        };

        if short.len() != 4 {
            return Err(DecodeError::UnknownCharacteristic(s.to_string()));
        }

        u16::from_str_radix(short, 16)
            .ok()
            .and_then(Characteristic::from_assigned_number)
            .ok_or_else(|| DecodeError::UnknownCharacteristic(s.to_string()))
    }
}
