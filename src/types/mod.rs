//! Core types for advertisement aggregation.
//!
//! This module provides the data structures shared by the registry, the window
//! controller and the frame codec, together with the wire-format constants.
//!
//! ## Architecture
//!
//! - [`Identity`] is the 6-byte advertiser address used as the deduplication key
//! - [`AdvertisementEvent`] is one raw observation handed over by the radio stack
//! - [`DeviceRecord`] aggregates all observations of one identity within a window
//! - [`SnapshotHeader`] describes one window (sync, sequence, raw and unique counts)
//!
//! ## Wire Layout
//!
//! Both [`DeviceRecord`] and [`SnapshotHeader`] serialize through explicit
//! `to_bytes` / `from_bytes` routines rather than in-memory layout, so the frame
//! is byte-exact regardless of target:
//!
//! ```text
//! frame = header (9 bytes) + unique_count x record (42 bytes)
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use beaconbuf::types::{DeviceRecord, Identity, SnapshotHeader, HEADER_LEN, RECORD_LEN};
//!
//! let identity: Identity = "AA:BB:CC:DD:EE:FF".parse().unwrap();
//! let record = DeviceRecord::new(identity);
//! assert_eq!(record.to_bytes().len(), RECORD_LEN);
//!
//! let header = SnapshotHeader::new(0);
//! assert_eq!(header.to_bytes().len(), HEADER_LEN);
//! ```

use std::time::Duration;

mod event;
mod header;
mod identity;
mod record;

pub use event::AdvertisementEvent;
pub use header::SnapshotHeader;
pub use identity::Identity;
pub use record::DeviceRecord;

/// Byte repeated four times at the start of every frame (`01010101`)
pub const SYNC_BYTE: u8 = 0x55;

/// Frame start marker
pub const SYNC_PATTERN: [u8; 4] = [SYNC_BYTE; 4];

/// Length of an advertiser address
pub const IDENTITY_LEN: usize = 6;

/// Largest payload stored per device; longer payloads are truncated
pub const PAYLOAD_MAX: usize = 31;

/// Encoded size of [`SnapshotHeader`]
pub const HEADER_LEN: usize = 9;

/// Encoded size of [`DeviceRecord`]
pub const RECORD_LEN: usize = IDENTITY_LEN + 4 + PAYLOAD_MAX + 1;

/// Default number of registry slots
pub const DEFAULT_CAPACITY: usize = 1024;

/// Largest supported registry capacity (`unique_count` is a u16 on the wire)
pub const MAX_CAPACITY: usize = 32768;

/// Default sampling window length
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_millis(7000);
