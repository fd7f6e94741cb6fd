//! Error types for Wearwire

use thiserror::Error;

/// Errors raised while decoding a characteristic frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed {characteristic} frame: {reason}")]
    MalformedFrame {
        characteristic: &'static str,
        reason: String,
    },

    #[error("Unknown characteristic: {0}")]
    UnknownCharacteristic(String),
}

impl DecodeError {
    pub(crate) fn malformed(characteristic: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedFrame {
            characteristic,
            reason: reason.into(),
        }
    }

    /// True for frames that were rejected because of their contents
    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::MalformedFrame { .. })
    }
}

/// Errors that can occur outside of frame decoding
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse frame record: {0}")]
    ParseError(String),

    #[error("Invalid hex payload: {0}")]
    InvalidHex(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hex::FromHexError> for TelemetryError {
    fn from(e: hex::FromHexError) -> Self {
        TelemetryError::InvalidHex(e.to_string())
    }
}
