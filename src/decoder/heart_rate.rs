//! Heart Rate Measurement (0x2A37) decoder

use super::{FrameDecoder, FrameReader};
use crate::error::DecodeError;
use crate::gatt::Characteristic;
use crate::types::{HeartRateReading, Reading};
use chrono::{DateTime, Utc};
use tracing::debug;

const CHARACTERISTIC: &str = "heart_rate";

/// Flags byte plus a one-byte heart rate
const MIN_FRAME_LEN: usize = 2;

/// Confidence when skin contact is supported and detected
const CONTACT_CONFIDENCE: u8 = 95;

/// Confidence when contact cannot be verified
const UNVERIFIED_CONFIDENCE: u8 = 80;

/// Decoded flags byte of a heart rate measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateFlags {
    /// Heart rate is a u16 rather than a u8
    pub wide_value: bool,
    pub contact_detected: bool,
    pub contact_supported: bool,
    pub energy_expended: bool,
    pub rr_intervals: bool,
}

impl HeartRateFlags {
    pub fn from_byte(flags: u8) -> Self {
        Self {
            wide_value: flags & 0x01 != 0,
            contact_detected: flags & 0x02 != 0,
            contact_supported: flags & 0x04 != 0,
            energy_expended: flags & 0x08 != 0,
            rr_intervals: flags & 0x10 != 0,
        }
    }

    fn confidence(&self) -> u8 {
        if self.contact_detected && self.contact_supported {
            CONTACT_CONFIDENCE
        } else {
            UNVERIFIED_CONFIDENCE
        }
    }
}

/// Convert an RR-interval from 1/1024 s wire units to milliseconds
pub fn rr_raw_to_ms(raw: u16) -> f64 {
    f64::from(raw) * 1000.0 / 1024.0
}

/// Heart rate measurement decoder
pub struct HeartRateDecoder;

impl FrameDecoder for HeartRateDecoder {
    fn characteristic(&self) -> Characteristic {
        Characteristic::HeartRateMeasurement
    }

    fn decode(&self, frame: &[u8], timestamp: DateTime<Utc>) -> Result<Reading, DecodeError> {
        decode_heart_rate_at(frame, timestamp).map(Reading::HeartRate)
    }
}

/// Decode a heart rate measurement frame at the current time
pub fn decode_heart_rate(frame: &[u8]) -> Result<HeartRateReading, DecodeError> {
    decode_heart_rate_at(frame, Utc::now())
}

/// Decode a heart rate measurement frame
///
/// Layout: flags, heart rate (u8 or u16), optional energy expended (u16),
/// then zero or more RR-intervals (u16 each) filling the rest of the frame.
pub fn decode_heart_rate_at(
    frame: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<HeartRateReading, DecodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(DecodeError::malformed(
            CHARACTERISTIC,
            format!("frame has {} byte(s), need at least {MIN_FRAME_LEN}", frame.len()),
        ));
    }

    let mut reader = FrameReader::new(frame, CHARACTERISTIC);
    let flags = HeartRateFlags::from_byte(reader.read_u8("flags")?);

    let heart_rate = if flags.wide_value {
        reader.read_u16_le("heart rate")?
    } else {
        u16::from(reader.read_u8("heart rate")?)
    };

    let energy_expended_kj = if flags.energy_expended {
        Some(reader.read_u16_le("energy expended")?)
    } else {
        None
    };

    let rr_intervals_ms = if flags.rr_intervals {
        Some(read_rr_intervals(&mut reader)?)
    } else {
        None
    };

    let sensor_contact = flags.contact_supported.then_some(flags.contact_detected);

    debug!(
        heart_rate,
        rr_count = rr_intervals_ms.as_ref().map_or(0, Vec::len),
        "decoded heart rate frame"
    );

    Ok(HeartRateReading {
        device_id: String::new(),
        timestamp,
        heart_rate,
        energy_expended_kj,
        rr_intervals_ms,
        sensor_contact,
        confidence: flags.confidence(),
    })
}

fn read_rr_intervals(reader: &mut FrameReader<'_>) -> Result<Vec<f64>, DecodeError> {
    let count = reader.remaining() / 2;
    if reader.remaining() % 2 != 0 {
        debug!(offset = reader.offset(), "ignoring trailing byte after RR-intervals");
    }

    let mut intervals = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = reader.offset();
        let raw = reader.read_u16_le("RR-interval")?;
        if raw == 0 {
            return Err(DecodeError::malformed(
                CHARACTERISTIC,
                format!("zero RR-interval at offset {offset}"),
            ));
        }
        intervals.push(rr_raw_to_ms(raw));
    }
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_one_byte_value_without_contact() {
        let reading = decode_heart_rate(&[0x00, 0x4B]).unwrap();

        assert_eq!(reading.heart_rate, 75);
        assert_eq!(reading.energy_expended_kj, None);
        assert_eq!(reading.rr_intervals_ms, None);
        assert_eq!(reading.sensor_contact, None);
        assert_eq!(reading.confidence, 80);
        assert!(reading.device_id.is_empty());
    }

    #[test]
    fn test_two_byte_value() {
        for value in [0u16, 75, 255, 256, 0x1234, u16::MAX] {
            let [lo, hi] = value.to_le_bytes();
            let reading = decode_heart_rate(&[0x01, lo, hi]).unwrap();
            assert_eq!(reading.heart_rate, value);
            assert_eq!(reading.energy_expended_kj, None);
            assert_eq!(reading.rr_intervals_ms, None);
        }
    }

    #[test]
    fn test_two_byte_value_truncated() {
        let err = decode_heart_rate(&[0x01, 0x4B]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_too_short_frames() {
        assert!(decode_heart_rate(&[]).unwrap_err().is_malformed());
        assert!(decode_heart_rate(&[0x00]).unwrap_err().is_malformed());
    }

    #[test]
    fn test_contact_flags_drive_confidence() {
        // supported + detected
        let reading = decode_heart_rate(&[0x06, 60]).unwrap();
        assert_eq!(reading.sensor_contact, Some(true));
        assert_eq!(reading.confidence, 95);

        // supported, not detected
        let reading = decode_heart_rate(&[0x04, 60]).unwrap();
        assert_eq!(reading.sensor_contact, Some(false));
        assert_eq!(reading.confidence, 80);

        // detected bit without feature support is not trusted
        let reading = decode_heart_rate(&[0x02, 60]).unwrap();
        assert_eq!(reading.sensor_contact, None);
        assert_eq!(reading.confidence, 80);
    }

    #[test]
    fn test_energy_expended() {
        let reading = decode_heart_rate(&[0x08, 90, 0x10, 0x02]).unwrap();
        assert_eq!(reading.heart_rate, 90);
        assert_eq!(reading.energy_expended_kj, Some(0x0210));
        assert_eq!(reading.rr_intervals_ms, None);
    }

    #[test]
    fn test_energy_expended_truncated() {
        let err = decode_heart_rate(&[0x08, 90, 0x10]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_rr_intervals_converted_to_ms() {
        // 1024 -> 1000ms, 512 -> 500ms, 820 -> 800.78125ms
        let frame = [0x10, 72, 0x00, 0x04, 0x00, 0x02, 0x34, 0x03];
        let reading = decode_heart_rate(&frame).unwrap();

        assert_eq!(
            reading.rr_intervals_ms,
            Some(vec![1000.0, 500.0, rr_raw_to_ms(820)])
        );
        assert!((rr_raw_to_ms(820) - 800.78125).abs() < 1e-9);
    }

    #[test]
    fn test_rr_interval_count_matches_remaining_length() {
        for count in 0..6usize {
            let mut frame = vec![0x11, 0x48, 0x00];
            for i in 0..count {
                frame.extend_from_slice(&(700 + i as u16).to_le_bytes());
            }
            let reading = decode_heart_rate(&frame).unwrap();
            let intervals = reading.rr_intervals_ms.unwrap();

            assert_eq!(intervals.len(), (frame.len() - 3) / 2);
            for (i, ms) in intervals.iter().enumerate() {
                assert_eq!(*ms, f64::from(700 + i as u16) * 1000.0 / 1024.0);
            }
        }
    }

    #[test]
    fn test_rr_intervals_after_energy_and_wide_value() {
        let frame = [0x19, 0x2C, 0x01, 0x05, 0x00, 0x00, 0x03];
        let reading = decode_heart_rate(&frame).unwrap();

        assert_eq!(reading.heart_rate, 300);
        assert_eq!(reading.energy_expended_kj, Some(5));
        assert_eq!(reading.rr_intervals_ms, Some(vec![750.0]));
    }

    #[test]
    fn test_trailing_odd_byte_is_ignored() {
        let frame = [0x10, 72, 0x00, 0x04, 0xFF];
        let reading = decode_heart_rate(&frame).unwrap();
        assert_eq!(reading.rr_intervals_ms, Some(vec![1000.0]));
    }

    #[test]
    fn test_zero_rr_interval_is_malformed() {
        let err = decode_heart_rate(&[0x10, 72, 0x00, 0x00]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_all_flag_combinations_decode_when_fields_present() {
        for flags in 0u8..32 {
            let parsed = HeartRateFlags::from_byte(flags);
            let mut frame = vec![flags, 100];
            if parsed.wide_value {
                frame.push(0);
            }
            if parsed.energy_expended {
                frame.extend_from_slice(&42u16.to_le_bytes());
            }
            if parsed.rr_intervals {
                frame.extend_from_slice(&1024u16.to_le_bytes());
            }

            let reading = decode_heart_rate(&frame).unwrap();
            assert_eq!(reading.heart_rate, 100);
            assert_eq!(reading.energy_expended_kj.is_some(), parsed.energy_expended);
            assert_eq!(reading.rr_intervals_ms.is_some(), parsed.rr_intervals);
            assert!(reading.confidence <= 100);
        }
    }

    #[test]
    fn test_unknown_flag_bits_are_ignored() {
        let reading = decode_heart_rate(&[0xE0, 61]).unwrap();
        assert_eq!(reading.heart_rate, 61);
        assert_eq!(reading.energy_expended_kj, None);
    }
}
