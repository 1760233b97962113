//! Error types for the scan buffer.
//!
//! All errors implement the `std::error::Error` trait and carry structured context
//! for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Capacity Errors**: The device registry has no free slot for a new identity
//! - **Transport Errors**: The serial collaborator is missing or a byte write failed
//! - **Parse Errors**: A received frame or a configuration document is malformed
//! - **Configuration Errors**: A configuration value is out of range
//! - **File Errors**: Configuration or event script files could not be read
//!
//! Oversized payloads are not an error category: they are truncated to
//! [`PAYLOAD_MAX`](crate::PAYLOAD_MAX) at admission and never surface here.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use beaconbuf::BufferError;
//!
//! let error = BufferError::transport_unavailable("uart0 not ready");
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scan buffer operations.
pub type Result<T, E = BufferError> = std::result::Result<T, E>;

/// Main error type for scan buffer operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BufferError {
    #[error("Device registry full: all {capacity} slots occupied")]
    CapacityExceeded { capacity: usize },

    #[error("Transport unavailable: {reason}")]
    TransportUnavailable {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transport write failed after {bytes_written} bytes")]
    Transport {
        bytes_written: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration for '{field}': {reason}")]
    Config { field: String, reason: String },

    #[error("File error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BufferError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BufferError::CapacityExceeded { .. } => true,
            BufferError::Transport { .. } => true,
            BufferError::TransportUnavailable { .. } => false,
            BufferError::Parse { .. } => false,
            BufferError::Config { .. } => false,
            BufferError::Io { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BufferError::CapacityExceeded { .. } => vec![
                "Shorten the sampling interval",
                "Increase the registry capacity",
                "Events resume being stored after the next flush",
            ],
            BufferError::TransportUnavailable { .. } => vec![
                "Check the serial device is present and configured",
                "Verify the device tree / port name",
                "Restart the scanner once the transport is ready",
            ],
            BufferError::Transport { .. } => vec![
                "Check the serial cable and receiver",
                "Verify the baud rate matches the receiver",
                "The next window will be transmitted normally",
            ],
            BufferError::Parse { .. } => vec![
                "Check the data source produces the expected frame layout",
                "Verify both ends agree on little-endian counters",
                "Resynchronise on the next sync pattern",
            ],
            BufferError::Config { .. } => vec![
                "Check the configuration value against its documented range",
                "Remove the field to fall back to its default",
            ],
            BufferError::Io { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for capacity errors.
    pub fn capacity_exceeded(capacity: usize) -> Self {
        BufferError::CapacityExceeded { capacity }
    }

    /// Helper constructor for transport availability errors.
    pub fn transport_unavailable(reason: impl Into<String>) -> Self {
        BufferError::TransportUnavailable { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport availability errors with source.
    pub fn transport_unavailable_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BufferError::TransportUnavailable { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        BufferError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BufferError::Config { field: field.into(), reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        BufferError::Io { path, source }
    }
}

impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        BufferError::Transport { bytes_written: 0, source: err }
    }
}
