//! Identity hashing for slot selection

use crate::types::Identity;

/// Multiplicative rolling hash over the address bytes (`h = h * 33 + byte`).
pub fn rolling_hash(identity: &Identity) -> u32 {
    identity
        .as_bytes()
        .iter()
        .fold(0u32, |hash, &byte| (hash << 5).wrapping_add(hash).wrapping_add(u32::from(byte)))
}

/// Home slot of `identity` in a table of `capacity` slots.
///
/// `capacity` must be a power of two; the hash is folded with a mask.
pub fn hash_identity(identity: &Identity, capacity: usize) -> usize {
    let mask = capacity.wrapping_sub(1);
    rolling_hash(identity) as usize & mask
}
