//! Seeded MurmurHash3 (x86, 32-bit) as used by BIP37.
use std::io::Cursor;

use crate::params::SEED_MULTIPLIER;

/// MurmurHash3 x86_32 of `data` under `seed`.
pub fn murmur3(seed: u32, data: &[u8]) -> u32 {
    // An in-memory cursor never returns an I/O error.
    murmur3::murmur3_32(&mut Cursor::new(data), seed).unwrap_or_default()
}

/// Seed for the `n`-th hash function of a filter with the given `tweak`.
pub fn bloom_seed(n: u32, tweak: u32) -> u32 {
    n.wrapping_mul(SEED_MULTIPLIER).wrapping_add(tweak)
}
