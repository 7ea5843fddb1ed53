//! Filter sizing.
//!
//! For `n` elements and a target false-positive rate `p` the optimal filter is
//!
//! ```text
//!   bits  = -n * ln(p) / ln(2)^2
//!   funcs = bits / n * ln(2)
//! ```
//!
//! Both are floored at every step and clamped to the BIP37 limits, so peers
//! computing the same dimensions arrive at the same byte length.
use std::f64::consts::LN_2;

use crate::error::Error;

/// Largest filter a peer will accept, in bytes.
pub const MAX_FILTER_BYTES: usize = 36_000;

/// Largest number of hash functions a peer will accept.
pub const MAX_HASH_FUNCS: u32 = 50;

/// Multiplier applied to the hash function index when deriving its seed.
pub const SEED_MULTIPLIER: u32 = 0xFBA4_C795;

/// Rate used when an element source does not pick one.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Byte length and hash function count of a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterDimensions {
    /// Length of the bit vector in bytes (`1..=MAX_FILTER_BYTES`).
    pub size_bytes: usize,
    /// Number of seeded hash evaluations per insert/contains (`1..=MAX_HASH_FUNCS`).
    pub hash_funcs: u32,
}

/// Reject rates outside `(0, 1]`, NaN included.
pub fn check_false_positive_rate(false_positive_rate: f64) -> Result<(), Error> {
    if false_positive_rate > 0.0 && false_positive_rate <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidFalsePositiveRate(false_positive_rate))
    }
}

/// Optimal byte length for `elements` at `false_positive_rate`.
///
/// The rate is assumed valid; see [`optimal_dimensions`].
pub fn filter_size_bytes(elements: u32, false_positive_rate: f64) -> usize {
    let bits = -1.0 / (LN_2 * LN_2) * f64::from(elements) * false_positive_rate.ln();
    // `as` saturates, so huge element counts land on the ceiling below.
    let bits = (bits as usize).min(MAX_FILTER_BYTES * 8);
    (bits / 8).max(1)
}

/// Optimal hash function count for a filter of `size_bytes` holding `elements`.
pub fn hash_func_count(size_bytes: usize, elements: u32) -> u32 {
    if elements == 0 {
        return 1;
    }
    let funcs = (size_bytes * 8) as f64 / f64::from(elements) * LN_2;
    (funcs as u32).clamp(1, MAX_HASH_FUNCS)
}

/// Validate the rate and compute both dimensions.
pub fn optimal_dimensions(
    elements: u32,
    false_positive_rate: f64,
) -> Result<FilterDimensions, Error> {
    check_false_positive_rate(false_positive_rate)?;
    let size_bytes = filter_size_bytes(elements, false_positive_rate);
    Ok(FilterDimensions {
        size_bytes,
        hash_funcs: hash_func_count(size_bytes, elements),
    })
}

/// Expected false-positive probability once `elements` items are inserted:
/// `(1 - e^(-k * n / m))^k`.
pub fn false_positive_probability(size_bytes: usize, hash_funcs: u32, elements: u32) -> f64 {
    let m = (size_bytes * 8) as f64;
    let k = f64::from(hash_funcs);
    let exponent = -k * f64::from(elements) / m;
    (1.0 - exponent.exp()).powf(k)
}
