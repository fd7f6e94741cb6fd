//! Running Speed and Cadence Measurement (0x2A53) decoder

use super::{FrameDecoder, FrameReader};
use crate::error::DecodeError;
use crate::gatt::Characteristic;
use crate::types::{ActivityReading, Reading};
use chrono::{DateTime, Utc};
use tracing::debug;

const CHARACTERISTIC: &str = "running_speed_cadence";

/// Flags byte plus the always-present speed field
const MIN_FRAME_LEN: usize = 3;

/// Speed resolution is 1/256 m/s
const SPEED_SCALE: f64 = 256.0;

/// Stride length resolution is 1/100 m
const STRIDE_SCALE: f64 = 100.0;

/// Linear calorie factor (kcal per meter). Not a physiological model.
const CALORIES_PER_METER: f64 = 0.06;

const RSC_CONFIDENCE: u8 = 90;

/// Decoded flags byte of an RSC measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RscFlags {
    pub pace_present: bool,
    pub cadence_present: bool,
    pub stride_length_present: bool,
    pub distance_present: bool,
}

impl RscFlags {
    pub fn from_byte(flags: u8) -> Self {
        Self {
            pace_present: flags & 0x01 != 0,
            cadence_present: flags & 0x02 != 0,
            stride_length_present: flags & 0x04 != 0,
            distance_present: flags & 0x08 != 0,
        }
    }
}

/// Running speed and cadence decoder
pub struct RscDecoder;

impl FrameDecoder for RscDecoder {
    fn characteristic(&self) -> Characteristic {
        Characteristic::RscMeasurement
    }

    fn decode(&self, frame: &[u8], timestamp: DateTime<Utc>) -> Result<Reading, DecodeError> {
        decode_running_speed_cadence_at(frame, timestamp).map(Reading::Activity)
    }
}

/// Decode a running speed and cadence frame at the current time
pub fn decode_running_speed_cadence(frame: &[u8]) -> Result<ActivityReading, DecodeError> {
    decode_running_speed_cadence_at(frame, Utc::now())
}

/// Decode a running speed and cadence frame
///
/// Layout: flags, speed (u16, 1/256 m/s), optional cadence (u8), optional
/// stride length (u16, 1/100 m), optional total distance (u32, m).
pub fn decode_running_speed_cadence_at(
    frame: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<ActivityReading, DecodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(DecodeError::malformed(
            CHARACTERISTIC,
            format!("frame has {} byte(s), need at least {MIN_FRAME_LEN}", frame.len()),
        ));
    }

    let mut reader = FrameReader::new(frame, CHARACTERISTIC);
    let flags = RscFlags::from_byte(reader.read_u8("flags")?);

    let speed_mps = f64::from(reader.read_u16_le("speed")?) / SPEED_SCALE;

    let cadence_spm = if flags.cadence_present {
        reader.read_u8("cadence")?
    } else {
        0
    };

    let stride_length_m = if flags.stride_length_present {
        Some(f64::from(reader.read_u16_le("stride length")?) / STRIDE_SCALE)
    } else {
        None
    };

    let distance_m = if flags.distance_present {
        Some(reader.read_u32_le("total distance")?)
    } else {
        None
    };

    let calories = estimate_calories(distance_m.unwrap_or(0), speed_mps);
    let pace_min_per_km = pace_from_speed(speed_mps);

    debug!(speed_mps, cadence_spm, "decoded running speed and cadence frame");

    Ok(ActivityReading {
        device_id: String::new(),
        timestamp,
        speed_mps,
        cadence_spm,
        stride_length_m,
        distance_m,
        pace_min_per_km,
        calories,
        confidence: RSC_CONFIDENCE,
    })
}

/// Pace in minutes per kilometer, 0 when stationary
fn pace_from_speed(speed_mps: f64) -> f64 {
    if speed_mps > 0.0 {
        (1000.0 / 60.0) / speed_mps
    } else {
        0.0
    }
}

/// Crude linear estimate from distance, falling back to one minute at the current speed
fn estimate_calories(distance_m: u32, speed_mps: f64) -> u32 {
    let estimate = if distance_m > 0 {
        f64::from(distance_m) * CALORIES_PER_METER
    } else {
        speed_mps * 60.0 * CALORIES_PER_METER
    };
    estimate.round() as u32
}
