//! Error types for filter construction and `filterload` decoding.
use bitcoin::consensus::encode;

use crate::params::{MAX_FILTER_BYTES, MAX_HASH_FUNCS};

/// Everything that can go wrong while building or decoding a bloom filter.
///
/// Construction only fails on a bad false-positive rate; every other variant
/// describes a malformed wire message (see [`Error::is_malformed`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested false-positive rate is outside `(0, 1]`.
    #[error("invalid false positive rate {0}, must be in (0, 1]")]
    InvalidFalsePositiveRate(f64),

    /// Declared filter length exceeds the protocol maximum.
    #[error("filter of {0} bytes exceeds the maximum of {max} bytes", max = MAX_FILTER_BYTES)]
    FilterTooLarge(u64),

    /// Declared filter length is zero.
    #[error("filter must hold at least one byte")]
    EmptyFilter,

    /// Hash function count exceeds the protocol maximum.
    #[error("hash function count {0} exceeds the maximum of {max}", max = MAX_HASH_FUNCS)]
    TooManyHashFuncs(u32),

    /// Update policy byte is not 0, 1 or 2.
    #[error("unknown bloom update policy {0}")]
    UnknownUpdatePolicy(u8),

    /// Bytes left over after a complete message.
    #[error("{0} trailing bytes after filterload payload")]
    TrailingBytes(usize),

    /// Truncated input or a non-canonical compact size.
    #[error("decode filterload: {0}")]
    Decode(#[from] encode::Error),

    /// Hex input was not valid hex.
    #[error("decode hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Error {
    /// `true` for errors raised while decoding a received message, `false`
    /// for construction-time parameter errors.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Error::InvalidFalsePositiveRate(_))
    }
}
