//! Per-device aggregate record and its 42-byte wire layout
//!
//! ```text
//! offset  size  field
//! 0       6     identity
//! 6       1     identity_kind
//! 7       1     last_event_kind
//! 8       1     last_signal_level (i8)
//! 9       1     payload_len
//! 10      31    payload (zero-padded)
//! 41      1     event_count (saturating)
//! ```

use super::{IDENTITY_LEN, Identity, PAYLOAD_MAX, RECORD_LEN};
use crate::{BufferError, Result};

const IDENTITY_KIND_OFFSET: usize = 6;
const EVENT_KIND_OFFSET: usize = 7;
const SIGNAL_LEVEL_OFFSET: usize = 8;
const PAYLOAD_LEN_OFFSET: usize = 9;
const PAYLOAD_OFFSET: usize = 10;
const EVENT_COUNT_OFFSET: usize = PAYLOAD_OFFSET + PAYLOAD_MAX;

/// Aggregated state for one unique device within the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Advertiser address (deduplication key)
    pub identity: Identity,
    /// Address-type classification of the latest event
    pub identity_kind: u8,
    /// Advertisement type of the latest event
    pub last_event_kind: u8,
    /// Signal strength of the latest event
    pub last_signal_level: i8,
    /// Number of meaningful bytes in `payload` (always <= [`PAYLOAD_MAX`])
    pub payload_len: u8,
    /// Latest payload, zero-padded beyond `payload_len`
    pub payload: [u8; PAYLOAD_MAX],
    /// Admitted events for this device in the window (saturates at 255)
    pub event_count: u8,
}

impl DeviceRecord {
    /// Fresh record for a newly seen identity with no events applied
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            identity_kind: 0,
            last_event_kind: 0,
            last_signal_level: 0,
            payload_len: 0,
            payload: [0; PAYLOAD_MAX],
            event_count: 0,
        }
    }

    /// The meaningful part of the stored payload
    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.payload_len).min(PAYLOAD_MAX);
        &self.payload[..len]
    }

    /// Serialize into the fixed wire layout
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[..IDENTITY_LEN].copy_from_slice(self.identity.as_bytes());
        out[IDENTITY_KIND_OFFSET] = self.identity_kind;
        out[EVENT_KIND_OFFSET] = self.last_event_kind;
        out[SIGNAL_LEVEL_OFFSET] = self.last_signal_level.to_le_bytes()[0];
        out[PAYLOAD_LEN_OFFSET] = self.payload_len;
        out[PAYLOAD_OFFSET..EVENT_COUNT_OFFSET].copy_from_slice(&self.payload);
        out[EVENT_COUNT_OFFSET] = self.event_count;
        out
    }

    /// Parse one record from the start of `data`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_LEN {
            return Err(BufferError::parse(
                "Device record decoding",
                format!("need {} bytes, have {}", RECORD_LEN, data.len()),
            ));
        }

        let payload_len = data[PAYLOAD_LEN_OFFSET];
        if usize::from(payload_len) > PAYLOAD_MAX {
            return Err(BufferError::parse(
                "Device record decoding",
                format!("payload_len {} exceeds maximum {}", payload_len, PAYLOAD_MAX),
            ));
        }

        let mut payload = [0u8; PAYLOAD_MAX];
        payload.copy_from_slice(&data[PAYLOAD_OFFSET..EVENT_COUNT_OFFSET]);

        Ok(Self {
            identity: Identity::from_slice(data)?,
            identity_kind: data[IDENTITY_KIND_OFFSET],
            last_event_kind: data[EVENT_KIND_OFFSET],
            last_signal_level: i8::from_le_bytes([data[SIGNAL_LEVEL_OFFSET]]),
            payload_len,
            payload,
            event_count: data[EVENT_COUNT_OFFSET],
        })
    }
}
