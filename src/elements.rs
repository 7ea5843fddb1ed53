//! Wallet material → filter elements.
//!
//! A key contributes its serialized form and its HASH160, an outpoint its 36-byte
//! consensus encoding, a watched script each of its data pushes.
#[cfg(feature = "runtime")]
use async_trait::async_trait;
use bitcoin::{
    consensus, hashes::Hash as _, script::Instruction, OutPoint, PublicKey, Script, ScriptBuf,
    Transaction,
};

#[cfg(feature = "runtime")]
use crate::hooks::ElementSource;
use crate::{filter::BloomUpdate, params::DEFAULT_FALSE_POSITIVE_RATE};

/// The serialized public key and its HASH160.
pub fn pubkey_elements(key: &PublicKey) -> [Vec<u8>; 2] {
    [key.to_bytes(), key.pubkey_hash().to_byte_array().to_vec()]
}

/// Txid in internal byte order followed by the little-endian output index.
pub fn outpoint_element(outpoint: &OutPoint) -> Vec<u8> {
    consensus::serialize(outpoint)
}

/// Every non-empty data push in `script`. Stops at the first malformed instruction.
pub fn script_push_elements(script: &Script) -> Vec<Vec<u8>> {
    script
        .instructions()
        .map_while(Result::ok)
        .filter_map(|ins| match ins {
            Instruction::PushBytes(push) if !push.is_empty() => Some(push.as_bytes().to_vec()),
            _ => None,
        })
        .collect()
}

/// In-memory element source for a wallet holding keys, filterable outpoints
/// and watched scripts.
#[derive(Clone, Debug)]
pub struct WalletElements {
    keys: Vec<PublicKey>,
    outpoints: Vec<OutPoint>,
    scripts: Vec<ScriptBuf>,
    false_positive_rate: f64,
    tweak: Option<u32>,
    update: BloomUpdate,
}

impl Default for WalletElements {
    fn default() -> Self {
        Self {
            keys: vec![],
            outpoints: vec![],
            scripts: vec![],
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            tweak: None,
            update: BloomUpdate::P2PubkeyOnly,
        }
    }
}

impl WalletElements {
    /// Empty source with the default rate and policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target false-positive rate for filters built from this source.
    pub fn with_false_positive_rate(mut self, rate: f64) -> Self {
        self.false_positive_rate = rate;
        self
    }

    /// Pin the tweak instead of letting the engine pick one.
    pub fn with_tweak(mut self, tweak: u32) -> Self {
        self.tweak = Some(tweak);
        self
    }

    /// Update policy to request from the peer.
    pub fn with_update(mut self, update: BloomUpdate) -> Self {
        self.update = update;
        self
    }

    /// Track a key. Duplicates are ignored.
    pub fn add_key(&mut self, key: PublicKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    /// Track an outpoint. Duplicates are ignored.
    pub fn add_outpoint(&mut self, outpoint: OutPoint) {
        if !self.outpoints.contains(&outpoint) {
            self.outpoints.push(outpoint);
        }
    }

    /// Watch a script we do not hold keys for.
    pub fn add_watched_script(&mut self, script: ScriptBuf) {
        if !self.scripts.contains(&script) {
            self.scripts.push(script);
        }
    }

    /// Record the outpoints of `tx` outputs that pay to us: P2PK to one of our
    /// keys, a watched script itself, or a watched script wrapped in P2SH.
    ///
    /// Spends of these outputs need not repeat anything the filter already
    /// holds, so the peer can only recognise them through the outpoint.
    /// Returns how many were added.
    pub fn watch_transaction(&mut self, tx: &Transaction) -> usize {
        let txid = tx.compute_txid();
        let before = self.outpoints.len();
        for (vout, output) in tx.output.iter().enumerate() {
            if self.pays_to_us(&output.script_pubkey) {
                self.add_outpoint(OutPoint::new(txid, vout as u32));
            }
        }
        self.outpoints.len() - before
    }

    fn pays_to_us(&self, script_pubkey: &Script) -> bool {
        self.keys
            .iter()
            .any(|k| ScriptBuf::new_p2pk(k).as_script() == script_pubkey)
            || self.scripts.iter().any(|watched| {
                watched.as_script() == script_pubkey
                    || ScriptBuf::new_p2sh(&watched.script_hash()).as_script() == script_pubkey
            })
    }

    /// Keys currently tracked.
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// Outpoints currently tracked.
    pub fn outpoints(&self) -> &[OutPoint] {
        &self.outpoints
    }

    fn collect(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(self.keys.len() * 2 + self.outpoints.len());
        for key in &self.keys {
            out.extend(pubkey_elements(key));
        }
        out.extend(self.outpoints.iter().map(outpoint_element));
        for script in &self.scripts {
            out.extend(script_push_elements(script));
        }
        out
    }
}

#[cfg(feature = "runtime")]
#[async_trait]
impl ElementSource for WalletElements {
    async fn element_count(&self) -> anyhow::Result<u32> {
        let n = self.keys.len() * 2 + self.outpoints.len() + self.scripts.len();
        Ok(u32::try_from(n)?)
    }

    async fn filter_elements(&self) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(self.collect())
    }

    fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    fn tweak(&self) -> Option<u32> {
        self.tweak
    }

    fn update_policy(&self) -> BloomUpdate {
        self.update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{hashes::Hash, script::Builder, Txid};
    use std::str::FromStr;

    const KEY: &str = "03cb219f69f1b49468bd563239a86667e74a06fcba69ac50a08a5cbc42a5808e99";

    #[test]
    fn key_contributes_key_and_hash() {
        let key = PublicKey::from_str(KEY).unwrap();
        let [raw, hash] = pubkey_elements(&key);
        assert_eq!(hex::encode(&raw), KEY);
        assert_eq!(hash.len(), 20);
    }

    #[test]
    fn outpoint_is_36_bytes() {
        let outpoint = OutPoint::new(Txid::from_byte_array([0xab; 32]), 0x0102_0304);
        let bytes = outpoint_element(&outpoint);
        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[..32], &[0xab; 32]);
        assert_eq!(&bytes[32..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn pushes_skip_opcodes_and_empty_data() {
        let script = Builder::new()
            .push_int(0)
            .push_slice([1u8; 20])
            .push_opcode(bitcoin::opcodes::all::OP_DROP)
            .push_slice([2u8; 3])
            .into_script();
        assert_eq!(script_push_elements(&script), vec![vec![1u8; 20], vec![2u8; 3]]);
    }

    #[cfg(feature = "runtime")]
    #[tokio::test]
    async fn counts_follow_wallet_rules() -> anyhow::Result<()> {
        let key = PublicKey::from_str(KEY)?;
        let mut w = WalletElements::new();
        w.add_key(key);
        w.add_key(key);
        w.add_outpoint(OutPoint::null());
        assert_eq!(w.element_count().await?, 3);
        assert_eq!(w.filter_elements().await?.len(), 3);
        Ok(())
    }

    fn redeem_script() -> ScriptBuf {
        Builder::new()
            .push_slice([0xaau8; 20])
            .push_opcode(bitcoin::opcodes::all::OP_DROP)
            .push_slice([0xbbu8; 32])
            .push_slice([0xccu8; 5])
            .into_script()
    }

    fn paying_to(outputs: Vec<ScriptBuf>) -> Transaction {
        Transaction {
            version: bitcoin::transaction::Version::ONE,
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: vec![],
            output: outputs
                .into_iter()
                .map(|script_pubkey| bitcoin::TxOut {
                    value: bitcoin::Amount::from_sat(1_000),
                    script_pubkey,
                })
                .collect(),
        }
    }

    #[cfg(feature = "runtime")]
    #[tokio::test]
    async fn watched_scripts_count_once_and_insert_every_push() -> anyhow::Result<()> {
        let key = PublicKey::from_str(KEY)?;
        let script = redeem_script();
        let mut w = WalletElements::new().with_tweak(9);
        w.add_key(key);
        w.add_outpoint(OutPoint::null());
        w.add_watched_script(script.clone());
        w.add_watched_script(script.clone());

        assert_eq!(w.element_count().await?, 2 + 1 + 1);
        let elements = w.filter_elements().await?;
        assert_eq!(elements.len(), 2 + 1 + 3);

        let mut filter = crate::BloomFilter::new(
            w.element_count().await?,
            w.false_positive_rate(),
            9,
            Some(w.update_policy()),
        )?;
        filter.extend(elements);
        for push in script_push_elements(&script) {
            assert!(filter.contains(&push));
        }
        Ok(())
    }

    #[test]
    fn watch_transaction_records_outputs_paying_to_us() {
        let key = PublicKey::from_str(KEY).unwrap();
        let script = redeem_script();
        let mut w = WalletElements::new();
        w.add_key(key);
        w.add_watched_script(script.clone());

        let tx = paying_to(vec![
            ScriptBuf::new_p2pk(&key),
            ScriptBuf::new_p2pkh(&key.pubkey_hash()),
            script.clone(),
            ScriptBuf::new_p2sh(&script.script_hash()),
            ScriptBuf::new_op_return([1u8; 4]),
        ]);
        assert_eq!(w.watch_transaction(&tx), 3);
        let txid = tx.compute_txid();
        let vouts: Vec<u32> = w.outpoints().iter().map(|o| o.vout).collect();
        assert_eq!(vouts, [0, 2, 3]);
        assert!(w.outpoints().iter().all(|o| o.txid == txid));

        assert_eq!(w.watch_transaction(&tx), 0, "already tracked");
    }
}
