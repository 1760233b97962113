//! Deduplicating buffer for BLE advertisement scans.
//!
//! beaconbuf aggregates a high-rate stream of advertisement observations into
//! one record per advertiser over a fixed sampling window, then emits each
//! window as a self-delimiting binary frame over a byte-oriented transport.
//!
//! # Features
//!
//! - **Fixed memory**: open-addressing registry, pre-allocated per window
//! - **Non-blocking admission**: double-buffered windows, transmission never stalls producers
//! - **Byte-exact framing**: 9-byte header plus 42-byte records, little-endian counters
//! - **Receiver side**: sync-hunting decoder, async frame stream, sequence gap tracking
//!
//! # Frame Layout
//!
//! ```text
//! 55 55 55 55 | seq | raw_lo raw_hi | uniq_lo uniq_hi | uniq x record
//! record = identity[6] kind event rssi len payload[31] count
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use beaconbuf::{Scanner, ScannerConfig, WriterTransport};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> beaconbuf::Result<()> {
//!     let serial = std::fs::OpenOptions::new().write(true).open("/dev/ttyUSB0")?;
//!     let scanner = Scanner::start(ScannerConfig::default(), WriterTransport::new(serial))?;
//!
//!     let id: beaconbuf::Identity = "AA:BB:CC:DD:EE:FF".parse()?;
//!     scanner.on_advertisement(&id, 0, -40, 0, &[0x02, 0x01, 0x06]);
//!
//!     let mut reports = Box::pin(scanner.reports());
//!     while let Some(report) = reports.next().await {
//!         println!("window {} carried {} devices", report.sequence, report.unique_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Synchronous use
//!
//! ```rust
//! use beaconbuf::{Frame, WindowController};
//!
//! let controller = WindowController::new(1024)?;
//! let id: beaconbuf::Identity = "AA:BB:CC:DD:EE:FF".parse()?;
//! controller.admit(&id, 0, -40, 0, &[1, 2, 3]);
//! controller.admit(&id, 0, -42, 0, &[4, 5]);
//!
//! let mut wire: Vec<u8> = Vec::new();
//! let report = controller.flush(&mut wire)?;
//! assert_eq!(report.unique_count, 1);
//!
//! let frame = Frame::decode(&wire)?;
//! assert_eq!(frame.records[0].payload(), &[4, 5]);
//! assert_eq!(frame.records[0].event_count, 2);
//! # Ok::<(), beaconbuf::BufferError>(())
//! ```

// Core types and error handling
mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Aggregation and framing
pub mod frame;
pub mod registry;
pub mod transport;
pub mod window;

// Task-based runtime
pub mod driver;
pub mod provider;
pub mod providers;
mod scanner;

// Core exports
pub use config::ScannerConfig;
pub use error::*;
pub use types::*;

// Main API exports
pub use frame::{Frame, FrameDecoder, FrameStream, SequenceTracker};
pub use provider::EventSource;
pub use registry::DeviceRegistry;
pub use scanner::Scanner;
pub use transport::{Transport, WriterTransport};
pub use window::{Admission, FlushReport, WindowController};
