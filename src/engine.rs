//! Orchestrator for the SPV filter flow:
//! 1) resolve the tweak (pinned, source-provided, stored, or fresh random),
//! 2) size a filter for the source's elements and insert them,
//! 3) serialize it and report whether it differs from the last payload sent.
use anyhow::Context;
use tracing::debug;

use crate::{codec, filter::BloomFilter, hooks::ElementSource, store::Store};

/// Outcome of [`FilterEngine::refresh`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterRefresh {
    /// The freshly built filter.
    pub filter: BloomFilter,
    /// Its `filterload` payload.
    pub payload: Vec<u8>,
    /// `true` if `payload` differs from the one last recorded in the store.
    pub changed: bool,
}

/// Core engine. `S` = store, `E` = element source.
pub struct FilterEngine<S, E> {
    store: S,
    source: E,
    tweak: Option<u32>,
}

impl<S, E> FilterEngine<S, E>
where
    S: Store + 'static,
    E: ElementSource + 'static,
{
    /// Create a new engine over a store and an element source.
    pub fn new(store: S, source: E) -> Self {
        Self {
            store,
            source,
            tweak: None,
        }
    }

    /// Pin the tweak, overriding both the source and the store.
    pub fn with_tweak(mut self, tweak: u32) -> Self {
        self.tweak = Some(tweak);
        self
    }

    /// The element source backing this engine.
    pub fn source(&self) -> &E {
        &self.source
    }

    /// Mutable access to the element source, e.g. to track new keys.
    pub fn source_mut(&mut self) -> &mut E {
        &mut self.source
    }

    async fn resolve_tweak(&self) -> anyhow::Result<u32> {
        if let Some(t) = self.tweak {
            debug!(tweak = t, "using pinned tweak");
            return Ok(t);
        }
        if let Some(t) = self.source.tweak() {
            debug!(tweak = t, "using element source tweak");
            return Ok(t);
        }
        if let Some(t) = self.store.load_tweak().await.context("load tweak")? {
            debug!(tweak = t, "using stored tweak");
            return Ok(t);
        }
        let t = rand::random::<u32>();
        self.store.save_tweak(t).await.context("save tweak")?;
        debug!(tweak = t, "generated new tweak");
        Ok(t)
    }

    /// Build and populate a filter from the element source.
    ///
    /// # Errors
    /// Returns an error if the source fails, its false-positive rate is invalid,
    /// or the store cannot provide or persist the tweak.
    pub async fn build_filter(&self) -> anyhow::Result<BloomFilter> {
        let tweak = self.resolve_tweak().await?;
        let count = self
            .source
            .element_count()
            .await
            .context("element_count")?;
        let rate = self.source.false_positive_rate();

        let mut filter = BloomFilter::new(count, rate, tweak, Some(self.source.update_policy()))
            .with_context(|| format!("size filter for {count} elements at {rate}"))?;

        let elements = self
            .source
            .filter_elements()
            .await
            .context("filter_elements")?;
        debug!(
            count,
            inserted = elements.len(),
            bytes = filter.len(),
            hash_funcs = filter.hash_funcs(),
            "built bloom filter"
        );
        filter.extend(elements);
        Ok(filter)
    }

    /// Rebuild the filter, serialize it, and record the payload.
    ///
    /// `changed` tells the caller whether a new `filterload` has to go out.
    pub async fn refresh(&self) -> anyhow::Result<FilterRefresh> {
        let filter = self.build_filter().await?;
        let payload = codec::serialize(&filter);

        let last = self
            .store
            .load_last_filter()
            .await
            .context("load last filter")?;
        let changed = last.as_deref() != Some(payload.as_slice());
        if changed {
            self.store
                .save_last_filter(&payload)
                .await
                .context("save last filter")?;
        }
        debug!(changed, payload = %hex::encode(&payload), "filter refresh");

        Ok(FilterRefresh {
            filter,
            payload,
            changed,
        })
    }

    /// Forget the last payload, e.g. after reconnecting to a new peer.
    pub async fn reset(&self) -> anyhow::Result<()> {
        self.store.clear_last_filter().await
    }
}
