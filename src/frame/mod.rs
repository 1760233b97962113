//! Snapshot framing
//!
//! A frame is the header of one window followed by every occupied registry
//! record in slot-scan order:
//!
//! ```text
//! [55 55 55 55][seq][raw lo raw hi][uniq lo uniq hi] + uniq x [42-byte record]
//! ```
//!
//! Encoding writes straight into a [`Transport`]. Decoding comes in three forms:
//! - [`Frame::decode`] for a buffer holding exactly one frame
//! - [`FrameDecoder`] for an unaligned byte stream (hunts for the sync pattern)
//! - [`FrameStream`] adapting any `AsyncRead` into a stream of frames

mod decoder;
mod stream;

pub use decoder::{FrameDecoder, SequenceTracker};
pub use stream::FrameStream;

use tracing::trace;

use crate::registry::DeviceRegistry;
use crate::transport::Transport;
use crate::types::{DeviceRecord, HEADER_LEN, Identity, RECORD_LEN, SnapshotHeader};
use crate::{BufferError, Result};

/// Write `header` and all occupied records of `registry` to `transport`.
///
/// Returns the number of bytes written.
pub fn encode_frame<T>(
    header: &SnapshotHeader,
    registry: &DeviceRegistry,
    transport: &mut T,
) -> Result<usize>
where
    T: Transport + ?Sized,
{
    transport.write_all(&header.to_bytes())?;
    let mut written = HEADER_LEN;

    for record in registry.occupied() {
        transport.write_all(&record.to_bytes())?;
        written += RECORD_LEN;
    }

    transport.end_frame()?;
    trace!(sequence = header.sequence, bytes = written, "Frame encoded");
    Ok(written)
}

/// Encode a frame into a fresh buffer
pub fn encode_to_vec(header: &SnapshotHeader, registry: &DeviceRegistry) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + RECORD_LEN * registry.len());
    out.extend_from_slice(&header.to_bytes());
    for record in registry.occupied() {
        out.extend_from_slice(&record.to_bytes());
    }
    out
}

/// A decoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Window metadata
    pub header: SnapshotHeader,
    /// Records in transmission order
    pub records: Vec<DeviceRecord>,
}

impl Frame {
    /// Decode a buffer that holds exactly one frame
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = SnapshotHeader::from_bytes(data)?;
        let expected = header.frame_len();

        if data.len() != expected {
            return Err(BufferError::parse(
                "Frame decoding",
                format!(
                    "header announces {} records ({} bytes) but buffer has {} bytes",
                    header.unique_count,
                    expected,
                    data.len()
                ),
            ));
        }

        let records = data[HEADER_LEN..]
            .chunks_exact(RECORD_LEN)
            .map(DeviceRecord::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, records })
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + RECORD_LEN * self.records.len()
    }

    /// Re-encode this frame
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.header.to_bytes());
        for record in &self.records {
            out.extend_from_slice(&record.to_bytes());
        }
        out
    }

    /// Find the record for one identity
    pub fn record(&self, identity: &Identity) -> Option<&DeviceRecord> {
        self.records.iter().find(|r| r.identity == *identity)
    }

    /// Sum of per-device event counters
    pub fn total_events(&self) -> u64 {
        self.records.iter().map(|r| u64::from(r.event_count)).sum()
    }
}
