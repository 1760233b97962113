//! Test utilities shared by unit tests and benchmarks
//!
//! Provides deterministic identities and events plus a cloneable in-memory
//! transport whose captured bytes can be decoded back into frames.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::Arc;

use parking_lot::Mutex;

use crate::Result;
use crate::frame::{Frame, FrameDecoder};
use crate::transport::Transport;
use crate::types::{AdvertisementEvent, Identity, MAX_CAPACITY};

/// Fixed vendor prefix used for generated identities.
pub const TEST_PREFIX: [u8; 5] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];

/// Identity sharing [`TEST_PREFIX`] and ending in `last`.
pub fn identity(last: u8) -> Identity {
    let [a, b, c, d, e] = TEST_PREFIX;
    Identity::new([a, b, c, d, e, last])
}

/// Advertisement from [`identity`]`(last)` with a one-byte payload of `last`.
pub fn event(last: u8, signal_level: i8) -> AdvertisementEvent {
    AdvertisementEvent::new(identity(last), 0, signal_level, 0, vec![last])
}

/// `count` distinct identities spread over the whole address space.
///
/// Neighbouring indices differ in several bytes so they do not all land in
/// adjacent registry slots.
pub fn spread_identities(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| {
            let i = i as u32;
            let mixed = i.wrapping_mul(0x9E37_79B9);
            let [m0, m1, m2, m3] = mixed.to_le_bytes();
            Identity::new([m0, m1, m2, m3, (i >> 8) as u8, i as u8])
        })
        .collect()
}

/// Cloneable in-memory transport; every clone shares one byte log.
#[derive(Debug, Clone, Default)]
pub struct SharedTransport {
    bytes: Arc<Mutex<Vec<u8>>>,
    frames: Arc<Mutex<usize>>,
}

impl SharedTransport {
    /// Empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Number of completed frames signalled through `end_frame`
    pub fn frames_ended(&self) -> usize {
        *self.frames.lock()
    }

    /// Decode every complete frame written so far
    pub fn frames(&self) -> Vec<Frame> {
        let mut decoder = FrameDecoder::new(MAX_CAPACITY);
        decoder.push(&self.bytes.lock());
        std::iter::from_fn(|| decoder.next_frame()).collect()
    }
}

impl Transport for SharedTransport {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.bytes.lock().push(byte);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        *self.frames.lock() += 1;
        Ok(())
    }
}
