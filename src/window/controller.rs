//! Window controller: producer admission and the flush/reset cycle
//!
//! Two pre-allocated [`WindowBuffer`]s alternate roles. Producers lock the
//! active buffer for the duration of a single admission. A flush:
//!
//! 1. locks the standby buffer (serialising concurrent flushes)
//! 2. locks the active buffer just long enough to swap the two boxes and stamp
//!    the next sequence number on the incoming buffer
//! 3. encodes, transmits and resets the swapped-out buffer with the producer
//!    lock released
//!
//! Transmission therefore never blocks admission, and no event can land in a
//! buffer while it is being read or cleared.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::{Admission, WindowBuffer};
use crate::transport::Transport;
use crate::types::{AdvertisementEvent, DeviceRecord, Identity, SnapshotHeader};
use crate::{Result, ScannerConfig};

/// Summary of one completed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Sequence number carried by the transmitted frame
    pub sequence: u8,
    /// Admitted events, duplicates included
    pub raw_event_count: u16,
    /// Distinct devices transmitted
    pub unique_count: u16,
    /// Events dropped because the registry was full
    pub dropped_events: u32,
    /// Bytes handed to the transport
    pub frame_len: usize,
    /// Time spent encoding and transmitting
    pub elapsed: Duration,
}

/// Owns the window buffers and coordinates producer and flush contexts.
#[derive(Debug)]
pub struct WindowController {
    active: Mutex<Box<WindowBuffer>>,
    standby: Mutex<Box<WindowBuffer>>,
    completed_windows: AtomicU64,
}

impl WindowController {
    /// Controller with two buffers of `capacity` slots; the first window has sequence 0
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            active: Mutex::new(Box::new(WindowBuffer::new(capacity, 0)?)),
            standby: Mutex::new(Box::new(WindowBuffer::new(capacity, 0)?)),
            completed_windows: AtomicU64::new(0),
        })
    }

    /// Controller sized from configuration
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.capacity)
    }

    /// Registry capacity of each buffer
    pub fn capacity(&self) -> usize {
        self.active.lock().registry().capacity()
    }

    /// Windows flushed so far
    pub fn completed_windows(&self) -> u64 {
        self.completed_windows.load(Ordering::Relaxed)
    }

    /// Producer entry point for an owned event
    pub fn try_admit(&self, event: &AdvertisementEvent) -> Admission {
        self.admit(
            &event.identity,
            event.identity_kind,
            event.signal_level,
            event.event_kind,
            &event.payload,
        )
    }

    /// Producer entry point for borrowed radio data
    pub fn admit(
        &self,
        identity: &Identity,
        identity_kind: u8,
        signal_level: i8,
        event_kind: u8,
        payload: &[u8],
    ) -> Admission {
        let admission =
            self.active.lock().admit(identity, identity_kind, signal_level, event_kind, payload);
        trace!(%identity, signal_level, ?admission, "Advertisement admitted");
        admission
    }

    /// Close the current window, transmit it and open the next one.
    ///
    /// The swapped-out buffer is reset even if transmission fails, so a broken
    /// transport loses that window but never stalls or corrupts the next.
    pub fn flush<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<FlushReport> {
        let mut draining = self.standby.lock();

        {
            let mut active = self.active.lock();
            let next_sequence = active.header().sequence.wrapping_add(1);
            draining.set_sequence(next_sequence);
            std::mem::swap(&mut *active, &mut *draining);
        }

        draining.begin_drain();
        let started = Instant::now();
        let header = *draining.header();
        let dropped_events = draining.dropped_events();

        let result = draining.encode(transport);
        let elapsed = started.elapsed();

        let next_sequence = header.sequence.wrapping_add(1);
        draining.reset(next_sequence);
        self.completed_windows.fetch_add(1, Ordering::Relaxed);

        if dropped_events > 0 {
            warn!(sequence = header.sequence, dropped_events, "Window closed with dropped events");
        }

        let frame_len = result?;
        debug!(
            sequence = header.sequence,
            raw_event_count = header.raw_event_count,
            unique_count = header.unique_count,
            frame_len,
            ?elapsed,
            "Window flushed"
        );

        Ok(FlushReport {
            sequence: header.sequence,
            raw_event_count: header.raw_event_count,
            unique_count: header.unique_count,
            dropped_events,
            frame_len,
            elapsed,
        })
    }

    /// Copy of the active window's header and records
    pub fn snapshot(&self) -> (SnapshotHeader, Vec<DeviceRecord>) {
        let active = self.active.lock();
        (*active.header(), active.registry().occupied().cloned().collect())
    }

    /// Header of the active window
    pub fn header(&self) -> SnapshotHeader {
        *self.active.lock().header()
    }
}
