//! Sampling windows
//!
//! A [`WindowBuffer`] is one header plus one registry: everything observed
//! during a single sampling window. The [`WindowController`] owns two of them
//! and hands them back and forth between the producer and the flush cycle.
//!
//! # Phases
//!
//! ```text
//!            flush swaps buffer out
//! Admitting ───────────────────────▶ Draining
//!     ▲                                  │
//!     └──────── encode + reset ──────────┘
//! ```
//!
//! The buffer the producer writes to is always `Admitting`. The swapped-out
//! buffer is `Draining` while it is encoded and transmitted, then reset and
//! parked as the next standby buffer.

mod controller;

pub use controller::{FlushReport, WindowController};

use tracing::{debug, warn};

use crate::registry::DeviceRegistry;
use crate::transport::Transport;
use crate::types::{Identity, SnapshotHeader};
use crate::{BufferError, Result};

/// Lifecycle phase of a window buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// Accepting producer events
    Admitting,
    /// Being serialized; producer events are rejected
    Draining,
}

/// Outcome of one producer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored; `new_device` is set when the identity was first seen in this window
    Accepted { new_device: bool },
    /// Counted in `raw_event_count` but not stored: the registry is full
    Dropped { capacity: usize },
    /// Not counted at all: the buffer is draining
    Rejected,
}

impl Admission {
    /// Whether the event was stored in the registry
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }
}

/// Header and registry for one sampling window.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    header: SnapshotHeader,
    registry: DeviceRegistry,
    phase: WindowPhase,
    dropped_events: u32,
}

impl WindowBuffer {
    /// Empty, admitting buffer with `capacity` registry slots
    pub fn new(capacity: usize, sequence: u8) -> Result<Self> {
        Ok(Self {
            header: SnapshotHeader::new(sequence),
            registry: DeviceRegistry::new(capacity)?,
            phase: WindowPhase::Admitting,
            dropped_events: 0,
        })
    }

    /// Current header
    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    /// Current registry contents
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Current phase
    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    /// Events dropped for lack of capacity in this window
    pub fn dropped_events(&self) -> u32 {
        self.dropped_events
    }

    /// Admit one advertisement.
    ///
    /// Every admitted call counts towards `raw_event_count`, including duplicates
    /// of known devices and events dropped because the registry is full.
    pub fn admit(
        &mut self,
        identity: &Identity,
        identity_kind: u8,
        signal_level: i8,
        event_kind: u8,
        payload: &[u8],
    ) -> Admission {
        if self.phase == WindowPhase::Draining {
            return Admission::Rejected;
        }

        self.header.record_raw_event();

        let before = self.registry.len();
        match self.registry.find_or_create(identity) {
            Ok(record) => {
                record.identity_kind = identity_kind;
                DeviceRegistry::apply_event(record, signal_level, event_kind, payload);
                let new_device = self.registry.len() > before;
                if new_device {
                    self.header.unique_count = self.registry.len() as u16;
                }
                Admission::Accepted { new_device }
            }
            Err(BufferError::CapacityExceeded { capacity }) => {
                self.dropped_events = self.dropped_events.saturating_add(1);
                if self.dropped_events == 1 {
                    warn!(
                        %identity,
                        capacity,
                        sequence = self.header.sequence,
                        "Registry full, dropping events for new devices until next flush"
                    );
                } else {
                    debug!(
                        %identity,
                        dropped = self.dropped_events,
                        "Registry full, event dropped"
                    );
                }
                Admission::Dropped { capacity }
            }
            Err(e) => {
                warn!(%identity, "Unexpected registry error: {}", e);
                Admission::Dropped { capacity: self.registry.capacity() }
            }
        }
    }

    /// Mark the buffer as draining
    pub fn begin_drain(&mut self) {
        self.phase = WindowPhase::Draining;
    }

    /// Serialize header and records to `transport`
    pub fn encode<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<usize> {
        crate::frame::encode_frame(&self.header, &self.registry, transport)
    }

    /// Clear the registry, reset the header for `sequence` and resume admitting
    pub fn reset(&mut self, sequence: u8) {
        self.registry.clear();
        self.header.reset(sequence);
        self.dropped_events = 0;
        self.phase = WindowPhase::Admitting;
    }

    pub(crate) fn set_sequence(&mut self, sequence: u8) {
        self.header.sequence = sequence;
    }
}
