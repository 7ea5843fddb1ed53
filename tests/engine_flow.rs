use async_trait::async_trait;
use spv_bloom::prelude::*; // FilterEngine, Store, ElementSource, BloomFilter
use std::sync::{Arc, Mutex};

/// Minimal in-memory Store for tests (keeps engine generic & fast).
#[derive(Default)]
struct MemStore {
    tweak: Mutex<Option<u32>>,
    last_filter: Mutex<Option<Vec<u8>>>,
    saves: Arc<Mutex<usize>>,
}

#[async_trait]
impl Store for MemStore {
    async fn load_tweak(&self) -> anyhow::Result<Option<u32>> {
        Ok(*self.tweak.lock().unwrap())
    }
    async fn save_tweak(&self, tweak: u32) -> anyhow::Result<()> {
        *self.tweak.lock().unwrap() = Some(tweak);
        Ok(())
    }
    async fn load_last_filter(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.last_filter.lock().unwrap().clone())
    }
    async fn save_last_filter(&self, payload: &[u8]) -> anyhow::Result<()> {
        *self.last_filter.lock().unwrap() = Some(payload.to_vec());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
    async fn clear_last_filter(&self) -> anyhow::Result<()> {
        *self.last_filter.lock().unwrap() = None;
        Ok(())
    }
}

/// Element source over a fixed list, leaving tweak/rate/policy to the defaults.
struct FixedElements {
    items: Mutex<Vec<Vec<u8>>>,
}

impl FixedElements {
    fn new(items: &[&[u8]]) -> Self {
        Self {
            items: Mutex::new(items.iter().map(|i| i.to_vec()).collect()),
        }
    }
}

#[async_trait]
impl ElementSource for FixedElements {
    async fn filter_elements(&self) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Source whose rate is out of range.
struct BadRate;

#[async_trait]
impl ElementSource for BadRate {
    async fn filter_elements(&self) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(vec![b"x".to_vec()])
    }
    fn false_positive_rate(&self) -> f64 {
        0.0
    }
}

#[tokio::test]
async fn builds_filter_with_every_element() -> anyhow::Result<()> {
    let source = FixedElements::new(&[b"alpha", b"beta", b"gamma"]);
    let engine = FilterEngine::new(MemStore::default(), source).with_tweak(7);

    let filter = engine.build_filter().await?;
    assert_eq!(filter.tweak(), 7);
    assert_eq!(filter.update(), BloomUpdate::P2PubkeyOnly);
    for item in [&b"alpha"[..], b"beta", b"gamma"] {
        assert!(filter.contains(item));
    }
    Ok(())
}

#[tokio::test]
async fn random_tweak_is_generated_once_and_persisted() -> anyhow::Result<()> {
    let store = MemStore::default();
    let engine = FilterEngine::new(store, FixedElements::new(&[b"a"]));

    let first = engine.build_filter().await?;
    let second = engine.build_filter().await?;
    assert_eq!(first.tweak(), second.tweak());
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn stored_tweak_is_reused() -> anyhow::Result<()> {
    let store = MemStore::default();
    store.save_tweak(0xfeed).await?;
    let engine = FilterEngine::new(store, FixedElements::new(&[b"a"]));
    assert_eq!(engine.build_filter().await?.tweak(), 0xfeed);
    Ok(())
}

#[tokio::test]
async fn source_tweak_beats_stored_one() -> anyhow::Result<()> {
    let store = MemStore::default();
    store.save_tweak(1).await?;
    let wallet = WalletElements::new().with_tweak(2);
    let engine = FilterEngine::new(store, wallet);
    assert_eq!(engine.build_filter().await?.tweak(), 2);
    Ok(())
}

#[tokio::test]
async fn refresh_reports_changes_only() -> anyhow::Result<()> {
    let saves = Arc::new(Mutex::new(0));
    let store = MemStore {
        saves: saves.clone(),
        ..MemStore::default()
    };
    let engine = FilterEngine::new(store, FixedElements::new(&[b"one", b"two"])).with_tweak(0);

    let r = engine.refresh().await?;
    assert!(r.changed);
    assert_eq!(codec::deserialize(&r.payload)?, r.filter);

    let again = engine.refresh().await?;
    assert!(!again.changed);
    assert_eq!(again.payload, r.payload);
    assert_eq!(*saves.lock().unwrap(), 1);

    engine.source().items.lock().unwrap().push(b"three".to_vec());
    let grown = engine.refresh().await?;
    assert!(grown.changed);
    assert!(grown.filter.contains(b"three"));
    assert_eq!(*saves.lock().unwrap(), 2);

    engine.reset().await?;
    assert!(engine.refresh().await?.changed);
    Ok(())
}

#[tokio::test]
async fn invalid_rate_surfaces_as_error() {
    let engine = FilterEngine::new(MemStore::default(), BadRate).with_tweak(0);
    let err = engine.build_filter().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidFalsePositiveRate(_))
    ));
}
