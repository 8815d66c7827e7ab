//! Hash functions for Sieve
//!
//! xxHash64 over filter text, used to derive element hiding keys.

use std::hash::Hasher;

use twox_hash::XxHash64;

/// Default seed for key derivation.
pub const KEY_SEED: u64 = 0x9e37_79b9_7f4a_7c15; // Golden ratio

/// xxHash64 of `data` with `seed`.
#[inline]
pub fn hash64(data: &[u8], seed: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(data);
    hasher.finish()
}

/// Hex key for a filter text. `attempt` re-seeds the hash after a collision.
pub fn filter_key(text: &str, attempt: u64) -> String {
    format!("{:016x}", hash64(text.as_bytes(), KEY_SEED.wrapping_add(attempt)))
}
