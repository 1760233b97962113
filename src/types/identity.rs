//! Device identity (6-byte advertiser address)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::IDENTITY_LEN;
use crate::{BufferError, Result};

/// Advertiser address used as the deduplication key.
///
/// Compared byte-wise. Displays and parses as `AA:BB:CC:DD:EE:FF`, which is
/// also its serde representation so event scripts stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; IDENTITY_LEN]);

impl Identity {
    /// Wrap raw address bytes
    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Build an identity from the first six bytes of `bytes`
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; IDENTITY_LEN] = bytes
            .get(..IDENTITY_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or_else(|| {
                BufferError::parse(
                    "Identity decoding",
                    format!("need {} bytes, have {}", IDENTITY_LEN, bytes.len()),
                )
            })?;
        Ok(Self(array))
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for Identity {
    type Err = BufferError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; IDENTITY_LEN];
        let mut parts = s.trim().split(':');

        for (index, byte) in bytes.iter_mut().enumerate() {
            let part = parts.next().ok_or_else(|| {
                BufferError::parse("Identity parsing", format!("'{s}' has only {index} octets"))
            })?;
            if part.len() != 2 {
                return Err(BufferError::parse(
                    "Identity parsing",
                    format!("octet '{part}' in '{s}' is not two hex digits"),
                ));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|e| {
                BufferError::parse("Identity parsing", format!("octet '{part}' in '{s}': {e}"))
            })?;
        }

        if parts.next().is_some() {
            return Err(BufferError::parse(
                "Identity parsing",
                format!("'{s}' has more than {IDENTITY_LEN} octets"),
            ));
        }

        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Identity {
    type Error = BufferError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_string()
    }
}
