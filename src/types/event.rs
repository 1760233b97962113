//! Producer-side advertisement events

use serde::{Deserialize, Serialize};

use super::Identity;

/// One observed advertisement as delivered by the radio stack.
///
/// The payload is an opaque blob. It may be longer than
/// [`PAYLOAD_MAX`](super::PAYLOAD_MAX); admission truncates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisementEvent {
    /// Advertiser address
    pub identity: Identity,

    /// Address-type classification (public, random, ...)
    #[serde(default)]
    pub identity_kind: u8,

    /// Received signal strength in dBm
    pub signal_level: i8,

    /// Advertisement PDU type
    #[serde(default)]
    pub event_kind: u8,

    /// Raw advertisement data
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl AdvertisementEvent {
    /// Create a new advertisement event
    pub fn new(
        identity: Identity,
        identity_kind: u8,
        signal_level: i8,
        event_kind: u8,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self { identity, identity_kind, signal_level, event_kind, payload: payload.into() }
    }
}
