//! Wallet glue: the key/script manager tells the engine what to put in the filter.
use async_trait::async_trait;

use crate::{filter::BloomUpdate, params::DEFAULT_FALSE_POSITIVE_RATE};

#[async_trait]
/// Supplies the byte strings a filter must contain and how it should be sized.
pub trait ElementSource: Send + Sync {
    /// Every byte string to insert: public keys, key hashes, outpoints, script pushes.
    /// May be called once per filter build, so it must be restartable.
    async fn filter_elements(&self) -> anyhow::Result<Vec<Vec<u8>>>;

    /// Expected number of distinct elements, used for sizing.
    async fn element_count(&self) -> anyhow::Result<u32> {
        Ok(u32::try_from(self.filter_elements().await?.len())?)
    }

    /// Target false-positive rate, in `(0, 1]`.
    fn false_positive_rate(&self) -> f64 {
        DEFAULT_FALSE_POSITIVE_RATE
    }

    /// Fixed tweak, or `None` to let the engine pick and persist a random one.
    fn tweak(&self) -> Option<u32> {
        None
    }

    /// Update policy to request from the peer.
    fn update_policy(&self) -> BloomUpdate {
        BloomUpdate::P2PubkeyOnly
    }
}
