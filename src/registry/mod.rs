//! Fixed-capacity device registry
//!
//! An open-addressing table of [`Slot`]s keyed by [`Identity`]. The table is
//! allocated once at construction and never grows: insertion is refused with
//! [`BufferError::CapacityExceeded`] once every slot is taken.
//!
//! # Probing
//!
//! Lookup starts at [`hash_identity`] and walks forward with wraparound:
//! - an `Occupied` slot with a matching identity ends the search
//! - an `Empty` slot ends the search and is the insertion point
//! - a `Deleted` slot never matches and does not end the search; the first one
//!   seen is reused if the identity turns out to be absent
//!
//! A full cycle without reaching an `Empty` slot or a match means the table is full.

mod hash;

use tracing::debug;

pub use hash::{hash_identity, rolling_hash};

use crate::types::{DEFAULT_CAPACITY, DeviceRecord, Identity, MAX_CAPACITY, PAYLOAD_MAX};
use crate::{BufferError, Result};

/// One storage location of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot {
    /// Never used since the last clear
    #[default]
    Empty,
    /// Holds the record of one device
    Occupied(DeviceRecord),
    /// Previously used; reserved for per-record removal, never produced today
    Deleted,
}

impl Slot {
    /// The record stored in this slot, if any
    pub fn record(&self) -> Option<&DeviceRecord> {
        match self {
            Slot::Occupied(record) => Some(record),
            Slot::Empty | Slot::Deleted => None,
        }
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

/// Open-addressing table of per-device records.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    slots: Box<[Slot]>,
    unique_count: usize,
}

impl DeviceRegistry {
    /// Allocate a registry with `capacity` slots.
    ///
    /// `capacity` must be a power of two no larger than [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        validate_capacity(capacity)?;
        Ok(Self { slots: vec![Slot::Empty; capacity].into_boxed_slice(), unique_count: 0 })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.unique_count
    }

    /// Whether no device has been recorded
    pub fn is_empty(&self) -> bool {
        self.unique_count == 0
    }

    /// Whether every slot is occupied
    pub fn is_full(&self) -> bool {
        self.unique_count >= self.slots.len()
    }

    /// Raw slot view, in index order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Occupied records in slot-scan order (index 0 upward)
    pub fn occupied(&self) -> impl Iterator<Item = &DeviceRecord> + '_ {
        self.slots.iter().filter_map(Slot::record)
    }

    /// Look up an identity without inserting
    pub fn get(&self, identity: &Identity) -> Option<&DeviceRecord> {
        match self.probe(identity) {
            Probe::Found(index) => self.slots[index].record(),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    /// Return the record for `identity`, claiming a slot if it is new.
    ///
    /// New records start with `event_count == 0`.
    pub fn find_or_create(&mut self, identity: &Identity) -> Result<&mut DeviceRecord> {
        let capacity = self.slots.len();

        let index = match self.probe(identity) {
            Probe::Found(index) => index,
            Probe::Vacant(index) => {
                if self.unique_count >= capacity {
                    return Err(BufferError::capacity_exceeded(capacity));
                }
                self.slots[index] = Slot::Occupied(DeviceRecord::new(*identity));
                self.unique_count += 1;
                index
            }
            Probe::Full => return Err(BufferError::capacity_exceeded(capacity)),
        };

        match &mut self.slots[index] {
            Slot::Occupied(record) => Ok(record),
            Slot::Empty | Slot::Deleted => Err(BufferError::capacity_exceeded(capacity)),
        }
    }

    /// Overwrite a record with the latest observation and bump its counter.
    ///
    /// Payloads longer than [`PAYLOAD_MAX`] are truncated. The stored buffer is
    /// zeroed before copying so bytes from an earlier, longer payload never survive.
    pub fn apply_event(
        record: &mut DeviceRecord,
        signal_level: i8,
        event_kind: u8,
        payload: &[u8],
    ) {
        let len = payload.len().min(PAYLOAD_MAX);
        if payload.len() > PAYLOAD_MAX {
            debug!(
                identity = %record.identity,
                payload_len = payload.len(),
                "Truncating payload to {} bytes",
                PAYLOAD_MAX
            );
        }

        record.last_signal_level = signal_level;
        record.last_event_kind = event_kind;
        record.payload_len = len as u8;
        record.payload = [0; PAYLOAD_MAX];
        record.payload[..len].copy_from_slice(&payload[..len]);
        record.event_count = record.event_count.saturating_add(1);
    }

    /// Reset every slot to `Empty`
    pub fn clear(&mut self) {
        self.slots.fill(Slot::Empty);
        self.unique_count = 0;
    }

    fn probe(&self, identity: &Identity) -> Probe {
        let capacity = self.slots.len();
        let start = hash_identity(identity, capacity);
        let mut first_deleted = None;

        for step in 0..capacity {
            let index = (start + step) & (capacity - 1);
            match &self.slots[index] {
                Slot::Occupied(record) if record.identity == *identity => {
                    return Probe::Found(index);
                }
                Slot::Occupied(_) => {}
                Slot::Deleted => {
                    first_deleted.get_or_insert(index);
                }
                Slot::Empty => return Probe::Vacant(first_deleted.unwrap_or(index)),
            }
        }

        match first_deleted {
            Some(index) => Probe::Vacant(index),
            None => Probe::Full,
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self { slots: vec![Slot::Empty; DEFAULT_CAPACITY].into_boxed_slice(), unique_count: 0 }
    }
}

/// Check that `capacity` is usable as a registry size
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 || !capacity.is_power_of_two() {
        return Err(BufferError::config(
            "capacity",
            format!("{capacity} is not a non-zero power of two"),
        ));
    }
    if capacity > MAX_CAPACITY {
        return Err(BufferError::config(
            "capacity",
            format!("{capacity} exceeds the maximum of {MAX_CAPACITY}"),
        ));
    }
    Ok(())
}
