//! Persistence interfaces and implementations used by the engine
//! (the wallet's filter tweak and the last filter handed to the network).
use async_trait::async_trait;

/// Minimal persistence interface. No key material, just filter state.
#[async_trait]
pub trait Store: Send + Sync {
    /// Tweak chosen for this wallet, if one was saved.
    async fn load_tweak(&self) -> anyhow::Result<Option<u32>>;

    /// Remember the wallet's tweak.
    async fn save_tweak(&self, tweak: u32) -> anyhow::Result<()>;

    /// Serialized `filterload` payload last handed to the network.
    async fn load_last_filter(&self) -> anyhow::Result<Option<Vec<u8>>>;

    /// Record the payload just handed to the network.
    async fn save_last_filter(&self, payload: &[u8]) -> anyhow::Result<()>;

    /// (Optional) forget the last payload so the next refresh reports a change.
    async fn clear_last_filter(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// submodules / concrete stores live here
#[cfg(feature = "store-sqlite")]
pub mod sqlite_store;
#[cfg(feature = "store-sqlite")]
pub use sqlite_store::SqliteStore;
