//! `filterload` payload encoding.
//!
//! ```text
//! compact_size(len) | filter[len] | u32 hash_funcs | u32 tweak | u8 update
//! ```
//!
//! All integers little-endian, no padding. Decoding enforces the same limits as
//! construction and refuses trailing bytes.
use bitcoin::{
    consensus::{encode, encode::VarInt, Decodable, Encodable},
    io::{self, Read, Write},
};
use tracing::debug;

use crate::{
    error::Error,
    filter::{BloomFilter, BloomUpdate},
    params::MAX_FILTER_BYTES,
};

impl Encodable for BloomUpdate {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.to_u8().consensus_encode(w)
    }
}

impl Decodable for BloomUpdate {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        BloomUpdate::try_from(u8::consensus_decode(r)?)
            .map_err(|_| encode::Error::ParseFailed("unknown bloom update policy"))
    }
}

impl Encodable for BloomFilter {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let data = self.as_bytes();
        let mut len = VarInt(data.len() as u64).consensus_encode(w)?;
        w.write_all(data)?;
        len += data.len();
        len += self.hash_funcs().consensus_encode(w)?;
        len += self.tweak().consensus_encode(w)?;
        len += self.update().consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for BloomFilter {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        decode_filter(r).map_err(|e| match e {
            Error::Decode(inner) => inner,
            _ => encode::Error::ParseFailed("bloom filter violates protocol limits"),
        })
    }
}

fn decode_filter<R: Read + ?Sized>(r: &mut R) -> Result<BloomFilter, Error> {
    let declared = VarInt::consensus_decode(r)?.0;
    if declared > MAX_FILTER_BYTES as u64 {
        return Err(Error::FilterTooLarge(declared));
    }
    let mut data = vec![0u8; declared as usize];
    r.read_exact(&mut data).map_err(encode::Error::from)?;

    let hash_funcs = u32::consensus_decode(r)?;
    let tweak = u32::consensus_decode(r)?;
    let update = BloomUpdate::try_from(u8::consensus_decode(r)?)?;

    BloomFilter::from_parts(data, hash_funcs, tweak, update)
}

/// Encode `filter` as a `filterload` payload.
pub fn serialize(filter: &BloomFilter) -> Vec<u8> {
    encode::serialize(filter)
}

/// Decode a complete `filterload` payload.
///
/// # Errors
/// Any malformed-message [`Error`]: truncated input, trailing bytes, a zero or
/// oversized filter, too many hash functions, or an unknown update policy.
pub fn deserialize(bytes: &[u8]) -> Result<BloomFilter, Error> {
    let mut reader = bytes;
    let filter = decode_filter(&mut reader).inspect_err(|e| {
        debug!(len = bytes.len(), error = %e, "rejecting filterload payload");
    })?;
    if !reader.is_empty() {
        debug!(trailing = reader.len(), "rejecting filterload payload");
        return Err(Error::TrailingBytes(reader.len()));
    }
    Ok(filter)
}

/// Hex form of [`serialize`].
pub fn to_hex(filter: &BloomFilter) -> String {
    hex::encode(serialize(filter))
}

/// Parse the hex form produced by [`to_hex`].
pub fn from_hex(s: &str) -> Result<BloomFilter, Error> {
    deserialize(&hex::decode(s)?)
}
