//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use beaconbuf::{Frame, FrameDecoder, Identity, MAX_CAPACITY, Transport};
use parking_lot::Mutex;

/// Install a fmt subscriber once per test binary; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Identity unique per `(producer, index)` pair
pub fn producer_identity(producer: u8, index: u8) -> Identity {
    Identity::new([0x02, 0x00, 0x5E, 0x10, producer, index])
}

/// Transport whose clones all append to one shared byte log
#[derive(Debug, Clone, Default)]
pub struct CaptureTransport {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        decode_all(&self.bytes())
    }
}

impl Transport for CaptureTransport {
    fn write_byte(&mut self, byte: u8) -> beaconbuf::Result<()> {
        self.bytes.lock().push(byte);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> beaconbuf::Result<()> {
        self.bytes.lock().extend_from_slice(bytes);
        Ok(())
    }
}

/// Decode every complete frame in `wire`
pub fn decode_all(wire: &[u8]) -> Vec<Frame> {
    let mut decoder = FrameDecoder::new(MAX_CAPACITY);
    decoder.push(wire);
    std::iter::from_fn(|| decoder.next_frame()).collect()
}
