//! Battery Level (0x2A19) decoder

use super::{FrameDecoder, FrameReader};
use crate::error::DecodeError;
use crate::gatt::Characteristic;
use crate::types::{BatteryReading, Reading};
use chrono::{DateTime, Utc};

const CHARACTERISTIC: &str = "battery_level";

const MAX_LEVEL: u8 = 100;

/// Battery level decoder
pub struct BatteryDecoder;

impl FrameDecoder for BatteryDecoder {
    fn characteristic(&self) -> Characteristic {
        Characteristic::BatteryLevel
    }

    fn decode(&self, frame: &[u8], timestamp: DateTime<Utc>) -> Result<Reading, DecodeError> {
        decode_battery_level_at(frame, timestamp).map(Reading::Battery)
    }
}

/// Decode a battery level frame at the current time
pub fn decode_battery_level(frame: &[u8]) -> Result<BatteryReading, DecodeError> {
    decode_battery_level_at(frame, Utc::now())
}

/// Decode a battery level frame captured at `timestamp`.
///
/// Layout: a single u8 percentage, rejected above 100.
pub fn decode_battery_level_at(
    frame: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<BatteryReading, DecodeError> {
    let level_percent = FrameReader::new(frame, CHARACTERISTIC).read_u8("battery level")?;
    if level_percent > MAX_LEVEL {
        return Err(DecodeError::malformed(
            CHARACTERISTIC,
            format!("level {level_percent} exceeds {MAX_LEVEL}"),
        ));
    }

    Ok(BatteryReading {
        device_id: String::new(),
        timestamp,
        level_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_level() {
        assert_eq!(decode_battery_level(&[0x64]).unwrap().level_percent, 100);
        assert_eq!(decode_battery_level(&[0x00]).unwrap().level_percent, 0);
    }

    #[test]
    fn test_battery_level_out_of_range() {
        assert!(decode_battery_level(&[0x65]).unwrap_err().is_malformed());
    }

    #[test]
    fn test_battery_level_empty_frame() {
        assert!(decode_battery_level(&[]).unwrap_err().is_malformed());
    }
}
