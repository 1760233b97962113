//! Snapshot header and its 9-byte wire layout
//!
//! ```text
//! offset  size  field
//! 0       4     sync pattern 0x55 0x55 0x55 0x55
//! 4       1     sequence (wraps 255 -> 0)
//! 5       2     raw_event_count (u16, little-endian)
//! 7       2     unique_count (u16, little-endian)
//! ```
//!
//! Counters are little-endian to match the receivers, which unpack them with `<H`.

use serde::Serialize;
use tracing::trace;

use super::{HEADER_LEN, RECORD_LEN, SYNC_PATTERN};
use crate::{BufferError, Result};

const SEQUENCE_OFFSET: usize = 4;
const RAW_COUNT_OFFSET: usize = 5;
const UNIQUE_COUNT_OFFSET: usize = 7;

/// Metadata describing one sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotHeader {
    /// Frame start marker, always [`SYNC_PATTERN`] for locally built headers
    pub sync: [u8; 4],
    /// Window sequence number, used by receivers to detect lost frames
    pub sequence: u8,
    /// All admitted events in the window, duplicates included
    pub raw_event_count: u16,
    /// Distinct devices recorded in the window
    pub unique_count: u16,
}

impl SnapshotHeader {
    /// Header for an empty window with the given sequence number
    pub fn new(sequence: u8) -> Self {
        Self { sync: SYNC_PATTERN, sequence, raw_event_count: 0, unique_count: 0 }
    }

    /// Rewrite the sync pattern, zero both counters and set the sequence
    pub fn reset(&mut self, sequence: u8) {
        *self = Self::new(sequence);
    }

    /// Count one admitted event (saturating)
    pub fn record_raw_event(&mut self) {
        self.raw_event_count = self.raw_event_count.saturating_add(1);
    }

    /// Total encoded frame size for this header's record count
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + RECORD_LEN * usize::from(self.unique_count)
    }

    /// Serialize into the fixed wire layout
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..SEQUENCE_OFFSET].copy_from_slice(&self.sync);
        out[SEQUENCE_OFFSET] = self.sequence;
        out[RAW_COUNT_OFFSET..UNIQUE_COUNT_OFFSET]
            .copy_from_slice(&self.raw_event_count.to_le_bytes());
        out[UNIQUE_COUNT_OFFSET..HEADER_LEN].copy_from_slice(&self.unique_count.to_le_bytes());
        out
    }

    /// Parse a header from the start of `data`, validating the sync pattern
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(BufferError::parse(
                "Snapshot header decoding",
                format!("need {} bytes, have {}", HEADER_LEN, data.len()),
            ));
        }

        if data[..SEQUENCE_OFFSET] != SYNC_PATTERN {
            return Err(BufferError::parse(
                "Snapshot header decoding",
                format!("bad sync pattern {:02X?}", &data[..SEQUENCE_OFFSET]),
            ));
        }

        let header = Self {
            sync: SYNC_PATTERN,
            sequence: data[SEQUENCE_OFFSET],
            raw_event_count: parse_u16_le(data, RAW_COUNT_OFFSET)?,
            unique_count: parse_u16_le(data, UNIQUE_COUNT_OFFSET)?,
        };

        trace!(
            sequence = header.sequence,
            raw_event_count = header.raw_event_count,
            unique_count = header.unique_count,
            "Parsed snapshot header"
        );

        Ok(header)
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new(0)
    }
}

fn parse_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    match data.get(offset..offset + 2) {
        Some(&[lo, hi]) => Ok(u16::from_le_bytes([lo, hi])),
        _ => Err(BufferError::parse(
            "Integer parsing",
            format!(
                "Insufficient data for u16 at offset {} (have {} bytes)",
                offset,
                data.len()
            ),
        )),
    }
}
