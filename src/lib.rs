//! Wearwire - On-device decoder for Bluetooth health-device telemetry
//!
//! Wearwire turns raw GATT characteristic notifications into typed readings and
//! keeps rolling per-device statistics over them: frame decoding → device
//! attribution → rolling window aggregation → listener dispatch → snapshot
//! encoding.
//!
//! ## Modules
//!
//! - **Decoders**: Heart Rate Measurement, Running Speed and Cadence, Battery Level
//! - **Statistics**: mean, standard deviation, Pearson correlation, RMSSD
//! - **Registry**: owned device registry with reading listeners

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod gatt;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod stats;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ProcessorConfig;
pub use decoder::{
    decode_battery_level, decode_frame, decode_heart_rate, decode_running_speed_cadence,
};
pub use error::{DecodeError, TelemetryError};
pub use gatt::Characteristic;
pub use pipeline::{decode_frame_to_json, TelemetryProcessor};
pub use registry::{ChannelListener, DeviceRegistry, ReadingListener};
pub use stats::{average, is_significant, pearson_correlation, standard_deviation};
pub use types::{ActivityReading, BatteryReading, Device, HeartRateReading, Reading};

/// Wearwire version embedded in all snapshots
pub const WEARWIRE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshots
pub const PRODUCER_NAME: &str = "wearwire";
