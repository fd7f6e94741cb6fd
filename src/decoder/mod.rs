//! GATT frame decoders
//!
//! This module turns raw characteristic notification payloads into typed
//! readings. Every decoder is a pure function of its input buffer: no state is
//! shared between calls, so decoders may run concurrently for different devices.

mod battery;
mod heart_rate;
mod running;

pub use battery::{decode_battery_level, decode_battery_level_at, BatteryDecoder};
pub use heart_rate::{
    decode_heart_rate, decode_heart_rate_at, rr_raw_to_ms, HeartRateDecoder, HeartRateFlags,
};
pub use running::{
    decode_running_speed_cadence, decode_running_speed_cadence_at, RscDecoder, RscFlags,
};

use crate::error::DecodeError;
use crate::gatt::Characteristic;
use crate::types::Reading;
use chrono::{DateTime, Utc};

/// Trait for characteristic frame decoders
pub trait FrameDecoder: Send + Sync {
    /// Characteristic this decoder understands
    fn characteristic(&self) -> Characteristic;

    /// Decode one frame, stamping the reading with `timestamp`
    fn decode(&self, frame: &[u8], timestamp: DateTime<Utc>) -> Result<Reading, DecodeError>;
}

/// Decoder registered for a characteristic
pub fn decoder_for(characteristic: Characteristic) -> &'static dyn FrameDecoder {
    match characteristic {
        Characteristic::HeartRateMeasurement => &HeartRateDecoder,
        Characteristic::RscMeasurement => &RscDecoder,
        Characteristic::BatteryLevel => &BatteryDecoder,
    }
}

/// Decode a frame received on `characteristic` at the current time
pub fn decode_frame(characteristic: Characteristic, frame: &[u8]) -> Result<Reading, DecodeError> {
    decode_frame_at(characteristic, frame, Utc::now())
}

/// Decode a frame received on `characteristic` with an explicit timestamp
pub fn decode_frame_at(
    characteristic: Characteristic,
    frame: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Reading, DecodeError> {
    decoder_for(characteristic).decode(frame, timestamp)
}

/// Bounds-checked little-endian cursor over a frame
pub(crate) struct FrameReader<'a> {
    frame: &'a [u8],
    offset: usize,
    characteristic: &'static str,
}

impl<'a> FrameReader<'a> {
    pub(crate) fn new(frame: &'a [u8], characteristic: &'static str) -> Self {
        Self {
            frame,
            offset: 0,
            characteristic,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.frame.len().saturating_sub(self.offset)
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn read_u8(&mut self, field: &str) -> Result<u8, DecodeError> {
        let [b] = self.take::<1>(field)?;
        Ok(b)
    }

    pub(crate) fn read_u16_le(&mut self, field: &str) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take::<2>(field)?))
    }

    pub(crate) fn read_u32_le(&mut self, field: &str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take::<4>(field)?))
    }

    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N], DecodeError> {
        let bytes = self
            .frame
            .get(self.offset..self.offset + N)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or_else(|| {
                DecodeError::malformed(
                    self.characteristic,
                    format!(
                        "{field} needs {N} byte(s) at offset {}, frame has {}",
                        self.offset,
                        self.frame.len()
                    ),
                )
            })?;
        self.offset += N;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_reader_little_endian() {
        let frame = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = FrameReader::new(&frame, "test");

        assert_eq!(reader.read_u8("flags").unwrap(), 0x01);
        assert_eq!(reader.read_u16_le("short").unwrap(), 0x1234);
        assert_eq!(reader.read_u32_le("long").unwrap(), 0x1234_5678);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.offset(), 7);
    }

    #[test]
    fn test_frame_reader_rejects_overrun() {
        let frame = [0x01, 0x34];
        let mut reader = FrameReader::new(&frame, "test");
        reader.read_u8("flags").unwrap();

        let err = reader.read_u16_le("value").unwrap_err();
        assert!(err.is_malformed());
        // A failed read does not advance the cursor
        assert_eq!(reader.offset(), 1);
    }

    #[test]
    fn test_decode_frame_dispatches_by_characteristic() {
        let reading = decode_frame(Characteristic::HeartRateMeasurement, &[0x00, 0x4B]).unwrap();
        assert!(matches!(reading, Reading::HeartRate(ref r) if r.heart_rate == 75));

        let reading = decode_frame(Characteristic::BatteryLevel, &[0x50]).unwrap();
        assert!(matches!(reading, Reading::Battery(ref r) if r.level_percent == 80));

        let reading =
            decode_frame(Characteristic::RscMeasurement, &[0x00, 0x00, 0x02]).unwrap();
        assert!(matches!(reading, Reading::Activity(ref r) if r.speed_mps == 2.0));
    }

    #[test]
    fn test_decoder_for_reports_characteristic() {
        for characteristic in [
            Characteristic::HeartRateMeasurement,
            Characteristic::RscMeasurement,
            Characteristic::BatteryLevel,
        ] {
            assert_eq!(decoder_for(characteristic).characteristic(), characteristic);
        }
    }
}
