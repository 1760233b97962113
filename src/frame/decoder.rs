//! Incremental frame decoding for receivers reading an unaligned byte stream

use tracing::{debug, warn};

use super::Frame;
use crate::types::{
    DEFAULT_CAPACITY, DeviceRecord, HEADER_LEN, RECORD_LEN, SYNC_PATTERN, SnapshotHeader,
};

/// Reassembles frames from arbitrary chunks of a serial stream.
///
/// Bytes before a sync pattern are discarded. A header announcing more records
/// than `max_records`, or a record that fails to decode, is treated as a false
/// sync: one byte is skipped and the hunt resumes.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_records: usize,
    skipped_bytes: u64,
}

impl FrameDecoder {
    /// Decoder accepting up to `max_records` records per frame
    pub fn new(max_records: usize) -> Self {
        Self { buffer: Vec::new(), max_records, skipped_bytes: 0 }
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes discarded while hunting for a sync pattern
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Extract the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            self.discard_until_sync();

            if self.buffer.len() < HEADER_LEN {
                return None;
            }

            let header = match SnapshotHeader::from_bytes(&self.buffer) {
                Ok(header) => header,
                Err(_) => {
                    self.skip(1);
                    continue;
                }
            };

            if usize::from(header.unique_count) > self.max_records
                || header.raw_event_count < header.unique_count
            {
                debug!(
                    unique_count = header.unique_count,
                    raw_event_count = header.raw_event_count,
                    "Implausible header, resynchronising"
                );
                self.skip(1);
                continue;
            }

            let frame_len = header.frame_len();
            if self.buffer.len() < frame_len {
                return None;
            }

            let records: Result<Vec<DeviceRecord>, _> = self.buffer[HEADER_LEN..frame_len]
                .chunks_exact(RECORD_LEN)
                .map(DeviceRecord::from_bytes)
                .collect();

            match records {
                Ok(records) => {
                    self.buffer.drain(..frame_len);
                    return Some(Frame { header, records });
                }
                Err(e) => {
                    warn!(sequence = header.sequence, "Discarding corrupt frame: {}", e);
                    self.skip(1);
                }
            }
        }
    }

    fn discard_until_sync(&mut self) {
        let found = self.buffer.windows(SYNC_PATTERN.len()).position(|w| w == SYNC_PATTERN);
        let discard = match found {
            Some(position) => position,
            // Keep a possible partial pattern at the tail
            None => self.buffer.len().saturating_sub(SYNC_PATTERN.len() - 1),
        };
        self.skip(discard);
    }

    fn skip(&mut self, count: usize) {
        let count = count.min(self.buffer.len());
        if count > 0 {
            self.buffer.drain(..count);
            self.skipped_bytes += count as u64;
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Detects frames lost between consecutive receptions.
#[derive(Debug, Default, Clone)]
pub struct SequenceTracker {
    last: Option<u8>,
    lost: u64,
}

impl SequenceTracker {
    /// Fresh tracker; the first observed sequence is never reported as a gap
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a received sequence number and return how many frames were missed before it
    pub fn observe(&mut self, sequence: u8) -> u8 {
        let missed = match self.last {
            None => 0,
            Some(last) if last == sequence => {
                warn!(sequence, "Duplicate frame sequence");
                0
            }
            Some(last) => sequence.wrapping_sub(last).wrapping_sub(1),
        };

        if missed > 0 {
            warn!(
                expected = self.last.map(|l| l.wrapping_add(1)),
                received = sequence,
                missed,
                "Frames lost"
            );
            self.lost += u64::from(missed);
        }

        self.last = Some(sequence);
        missed
    }

    /// Total frames reported missing so far
    pub fn lost_frames(&self) -> u64 {
        self.lost
    }

    /// Last sequence observed
    pub fn last_sequence(&self) -> Option<u8> {
        self.last
    }
}
