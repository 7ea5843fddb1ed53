//! The BIP37 bloom filter itself.
use bitvec::prelude::*;

use crate::{
    error::Error,
    hash::{bloom_seed, murmur3},
    params::{self, MAX_FILTER_BYTES, MAX_HASH_FUNCS},
};

/// Receiver-side hint on how to extend the filter when an output matches.
///
/// The filter only stores and serializes it; [`crate::matcher`] acts on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BloomUpdate {
    /// Never add matched outpoints.
    None,
    /// Add the outpoint of every matched output.
    All,
    /// Add outpoints only for matched pay-to-pubkey and bare multisig outputs.
    #[default]
    P2PubkeyOnly,
}

impl BloomUpdate {
    /// Wire byte for this policy.
    pub fn to_u8(self) -> u8 {
        match self {
            BloomUpdate::None => 0,
            BloomUpdate::All => 1,
            BloomUpdate::P2PubkeyOnly => 2,
        }
    }
}

impl TryFrom<u8> for BloomUpdate {
    type Error = Error;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0 => Ok(BloomUpdate::None),
            1 => Ok(BloomUpdate::All),
            2 => Ok(BloomUpdate::P2PubkeyOnly),
            other => Err(Error::UnknownUpdatePolicy(other)),
        }
    }
}

/// A BIP37 bloom filter: bit vector, hash function count, tweak and update policy.
///
/// Dimensions and tweak are fixed at construction. Only the bits change, through
/// [`insert`](Self::insert) and [`clear`](Self::clear). A filter for a different
/// element set is built anew, never resized or merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    bits: BitVec<u8, Lsb0>,
    hash_funcs: u32,
    tweak: u32,
    update: BloomUpdate,
}

impl BloomFilter {
    /// Size a filter for `elements` items at `false_positive_rate` and allocate it.
    ///
    /// `update` defaults to [`BloomUpdate::P2PubkeyOnly`]. Dimensions are clamped to
    /// the protocol limits, so extreme requests degrade instead of failing.
    ///
    /// # Errors
    /// [`Error::InvalidFalsePositiveRate`] unless `0 < false_positive_rate <= 1`.
    pub fn new(
        elements: u32,
        false_positive_rate: f64,
        tweak: u32,
        update: Option<BloomUpdate>,
    ) -> Result<Self, Error> {
        let dims = params::optimal_dimensions(elements, false_positive_rate)?;
        Ok(Self {
            bits: BitVec::repeat(false, dims.size_bytes * 8),
            hash_funcs: dims.hash_funcs,
            tweak,
            update: update.unwrap_or_default(),
        })
    }

    /// Rebuild a filter from raw components, checking the protocol limits.
    pub fn from_parts(
        data: Vec<u8>,
        hash_funcs: u32,
        tweak: u32,
        update: BloomUpdate,
    ) -> Result<Self, Error> {
        if data.is_empty() {
            return Err(Error::EmptyFilter);
        }
        if data.len() > MAX_FILTER_BYTES {
            return Err(Error::FilterTooLarge(data.len() as u64));
        }
        if hash_funcs > MAX_HASH_FUNCS {
            return Err(Error::TooManyHashFuncs(hash_funcs));
        }
        Ok(Self {
            bits: BitVec::from_vec(data),
            hash_funcs,
            tweak,
            update,
        })
    }

    fn bit_index(&self, n: u32, data: &[u8]) -> usize {
        let hash = murmur3(bloom_seed(n, self.tweak), data);
        (hash as usize) % self.bits.len()
    }

    /// Insert `data`. Inserting the same bytes twice is a no-op.
    pub fn insert(&mut self, data: &[u8]) {
        for n in 0..self.hash_funcs {
            let idx = self.bit_index(n, data);
            self.bits.set(idx, true);
        }
    }

    /// `true` if `data` may have been inserted; `false` means it never was.
    pub fn contains(&self, data: &[u8]) -> bool {
        (0..self.hash_funcs).all(|n| self.bits[self.bit_index(n, data)])
    }

    /// Zero every bit, keeping dimensions, tweak and policy.
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// `true` if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Length of the bit vector in bytes.
    pub fn len(&self) -> usize {
        self.bits.len() / 8
    }

    /// Number of hash functions.
    pub fn hash_funcs(&self) -> u32 {
        self.hash_funcs
    }

    /// Per-filter nonce mixed into every seed.
    pub fn tweak(&self) -> u32 {
        self.tweak
    }

    /// Update policy carried for the receiver.
    pub fn update(&self) -> BloomUpdate {
        self.update
    }

    /// The bit vector as it goes on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Expected false-positive rate once `elements` items have been inserted.
    pub fn false_positive_rate(&self, elements: u32) -> f64 {
        params::false_positive_probability(self.len(), self.hash_funcs, elements)
    }
}

impl Extend<Vec<u8>> for BloomFilter {
    fn extend<I: IntoIterator<Item = Vec<u8>>>(&mut self, iter: I) {
        for data in iter {
            self.insert(&data);
        }
    }
}
