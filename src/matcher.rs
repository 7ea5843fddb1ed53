//! Receiver-side BIP37 matching: decide whether a transaction is relevant to a
//! peer's filter and extend the filter per its [`BloomUpdate`] policy.
use bitcoin::{
    hashes::Hash as _,
    opcodes::{all::OP_CHECKMULTISIG, Opcode},
    script::Instruction,
    OutPoint, Script, Transaction,
};
use tracing::trace;

use crate::{
    elements::{outpoint_element, script_push_elements},
    filter::{BloomFilter, BloomUpdate},
};

/// Test `tx` against `filter`, inserting outpoints of matched outputs when the
/// update policy asks for it.
///
/// Checked in order: the txid, every data push of every output script, then
/// each input's previous outpoint and the data pushes of its script_sig.
pub fn apply_and_update(filter: &mut BloomFilter, tx: &Transaction) -> bool {
    let txid = tx.compute_txid();
    let mut found = filter.contains(&txid.to_byte_array());

    for (vout, output) in tx.output.iter().enumerate() {
        let script = &output.script_pubkey;
        let hit = script_push_elements(script)
            .iter()
            .any(|push| filter.contains(push));
        if !hit {
            continue;
        }
        found = true;
        let add = match filter.update() {
            BloomUpdate::None => false,
            BloomUpdate::All => true,
            BloomUpdate::P2PubkeyOnly => script.is_p2pk() || is_bare_multisig(script),
        };
        if add {
            let outpoint = OutPoint::new(txid, vout as u32);
            trace!(%outpoint, "adding matched outpoint to filter");
            filter.insert(&outpoint_element(&outpoint));
        }
    }
    if found {
        return true;
    }

    tx.input.iter().any(|input| {
        filter.contains(&outpoint_element(&input.previous_output))
            || script_push_elements(&input.script_sig)
                .iter()
                .any(|push| filter.contains(push))
    })
}

/// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG` with exactly `n` keys, `1 <= m <= n`
/// and every key 33 or 65 bytes long.
fn is_bare_multisig(script: &Script) -> bool {
    let ops: Vec<_> = match script.instructions().collect::<Result<_, _>>() {
        Ok(ops) => ops,
        Err(_) => return false,
    };
    let [Instruction::Op(m), keys @ .., Instruction::Op(n), Instruction::Op(last)] = ops.as_slice()
    else {
        return false;
    };
    let (Some(m), Some(n)) = (small_int(*m), small_int(*n)) else {
        return false;
    };
    *last == OP_CHECKMULTISIG
        && (1..=n).contains(&m)
        && keys.len() == usize::from(n)
        && keys.iter().all(|key| {
            matches!(key, Instruction::PushBytes(push) if push.len() == 33 || push.len() == 65)
        })
}

/// `OP_1..=OP_16` as its numeric value.
fn small_int(op: Opcode) -> Option<u8> {
    let code = op.to_u8();
    (0x51..=0x60).contains(&code).then(|| code - 0x50)
}
