#![forbid(unsafe_code)]
#![deny(missing_docs)]
//! spv-bloom: BIP-37 bloom filters for SPV wallets.
//!
//! ## What you implement
//! - [`ElementSource`]: enumerate the byte strings to watch (keys, key hashes,
//!   outpoints, script pushes) and pick rate / tweak / update policy.
//!   [`WalletElements`] is a ready-made in-memory source.
//! - [`Store`]: keep the wallet's tweak and the last payload sent.
//!
//! ## What the crate does
//! - Sizes the filter from the element count and false-positive rate, clamped to
//!   the protocol limits (36,000 bytes, 50 hash functions).
//! - Inserts elements with BIP-37's seeded Murmur3 family.
//! - Encodes/decodes the `filterload` payload byte-for-byte with Bitcoin Core.
//! - Matches transactions on the receiving side and applies the update policy.
//!
//! ## Minimal usage
//! ```rust,ignore
//! use spv_bloom::prelude::*;
//!
//! let mut filter = BloomFilter::new(3, 0.01, 0, Some(BloomUpdate::All))?;
//! filter.insert(&hex::decode("99108ad8ed9bb6274d3980bab5a85c048f0950c8")?);
//! assert_eq!(codec::to_hex(&filter), "03614e9b050000000000000001");
//!
//! // Or let the engine drive a wallet:
//! async fn run(wallet: WalletElements) -> anyhow::Result<()> {
//!     let engine = FilterEngine::new(SqliteStore::new("filter.db")?, wallet);
//!     let refresh = engine.refresh().await?;
//!     if refresh.changed {
//!         // send refresh.payload as a `filterload` message
//!     }
//!     Ok(())
//! }
//! ```
/// `filterload` payload encoding and decoding.
pub mod codec;

/// Wallet material to filter elements, plus an in-memory [`ElementSource`].
pub mod elements;

/// Error type shared by construction and decoding.
pub mod error;

/// The bloom filter: bits, hash count, tweak, update policy.
pub mod filter;

/// Seeded Murmur3 hash family.
pub mod hash;

/// Receiver-side transaction matching and filter updates.
pub mod matcher;

/// Sizing formulas and protocol limits.
pub mod params;

/// Engine that builds, serializes and tracks the wallet's filter.
#[cfg(feature = "runtime")]
pub mod engine;

/// Wallet callbacks: supply the elements and filter parameters.
#[cfg(feature = "runtime")]
pub mod hooks;

/// Persistence layer (traits and SQLite implementation).
#[cfg(feature = "runtime")]
pub mod store;

// Public re-exports
pub use elements::WalletElements;
#[cfg(feature = "runtime")]
pub use engine::{FilterEngine, FilterRefresh};
pub use error::Error;
pub use filter::{BloomFilter, BloomUpdate};
#[cfg(feature = "runtime")]
pub use hooks::ElementSource;
pub use params::{MAX_FILTER_BYTES, MAX_HASH_FUNCS};
#[cfg(all(feature = "runtime", feature = "store-sqlite"))]
pub use store::SqliteStore;
#[cfg(feature = "runtime")]
pub use store::Store;

/// Convenience prelude for end users.
pub mod prelude {
    pub use crate::{codec, BloomFilter, BloomUpdate, Error, WalletElements};
    #[cfg(all(feature = "runtime", feature = "store-sqlite"))]
    pub use crate::SqliteStore;
    #[cfg(feature = "runtime")]
    pub use crate::{ElementSource, FilterEngine, Store};
}
