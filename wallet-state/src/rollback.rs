//! Rollback engine (spec §4.5): detaches blocks from a reorganized
//! chain tip down to (and including) a given height, and the
//! `removeConflict`/`removeDoubleSpends` unmined-tx pruning that keeps
//! the mempool-side indexes consistent with what's actually mined.

use wallet_chain::{BlockId, ChainParams, Outpoint, TxCodec, TxHash, TxType};

use crate::index;
use crate::keyspace::keys;
use crate::records::UnminedCreditRecord;
use crate::store::{Store, TreeId};
use crate::txn::Txn;
use crate::Error;

impl<P: ChainParams> Store<P> {
    /// Detaches every block with height ≥ `height`, processing from the
    /// current tip down to `height` inclusive, then sweeps any unmined
    /// transaction left spending a now-unmined coinbase output (spec
    /// §4.5).
    pub fn rollback<C: TxCodec>(&self, codec: &C, height: i32) -> crate::Result<()> {
        self.scoped_update(|txn, _params| rollback(txn, codec, height))
    }
}

fn rollback<C: TxCodec>(txn: &mut Txn, codec: &C, height: i32) -> crate::Result<()> {
    let mut heights: Vec<i32> = txn
        .scan_prefix(TreeId::Blocks, &[])?
        .into_iter()
        .map(|(key, _)| keys::decode_block_key(&key))
        .collect::<crate::Result<_>>()?;
    heights.retain(|h| *h >= height);
    heights.sort_unstable();
    heights.reverse();

    let mut coinbase_credits: Vec<Outpoint> = Vec::new();

    for i in heights {
        let Some(block_i) = index::get_block(txn, i)? else {
            continue;
        };
        let block_id = BlockId::new(i, block_i.hash);

        // Block i's *regular* transactions are only considered applied
        // once block i+1 confirms it via the "parent valid" vote bit —
        // so a rollback starting above the parent must detach the
        // parent's regular transactions alongside block i's own
        // stake transactions (spec §4.5 ordering rule).
        if block_i.vote_bits & 1 != 0 {
            if let Some(parent) = index::get_block(txn, i - 1)? {
                let parent_id = BlockId::new(i - 1, parent.hash);
                for hash in parent.tx_hashes.clone() {
                    let Some(record) = index::get_mined_tx(txn, hash, parent_id)? else {
                        continue;
                    };
                    if record.tx_type == TxType::Regular {
                        rollback_transaction(txn, codec, hash, parent_id, true, &mut coinbase_credits)?;
                    }
                }
            }
        }

        for hash in block_i.tx_hashes.clone() {
            let Some(record) = index::get_mined_tx(txn, hash, block_id)? else {
                continue;
            };
            if record.tx_type != TxType::Regular {
                rollback_transaction(txn, codec, hash, block_id, false, &mut coinbase_credits)?;
            }
        }

        index::delete_block(txn, i);
    }

    for outpoint in coinbase_credits {
        if let Some(spender) = index::get_unmined_input(txn, outpoint)? {
            remove_conflict(txn, codec, spender)?;
        }
    }

    Ok(())
}

/// Detaches one mined transaction from `block` (spec §4.5
/// `rollbackTransaction`). `is_parent` means `block` is the parent of
/// the block actually being rolled back, reached only through the
/// parent-valid vote-bit rule above; in that case the tx-hash is also
/// stripped from the parent's own block record (which otherwise
/// survives this call).
fn rollback_transaction<C: TxCodec>(
    txn: &mut Txn,
    codec: &C,
    hash: TxHash,
    block: BlockId,
    is_parent: bool,
    coinbase_credits: &mut Vec<Outpoint>,
) -> crate::Result<()> {
    let Some(record) = index::get_mined_tx(txn, hash, block)? else {
        return Ok(());
    };
    index::delete_mined_tx(txn, hash, block);

    if is_parent {
        if let Some(mut parent_block) = index::get_block(txn, block.height)? {
            parent_block.tx_hashes.retain(|h| *h != hash);
            index::put_block(txn, block.height, &parent_block);
        }
    }

    let credit_prefix = keys::tx_record_key(hash, block);
    let credit_entries = txn.scan_prefix(TreeId::Credits, &credit_prefix)?;

    // A coinbase transaction is identified by the `coinbase` flag
    // `AddCredit` stamped on every credit it produced. A coinbase
    // transaction the wallet owns no output of looks, from here,
    // indistinguishable from an ordinary transaction it owns no output
    // of either — with no codec-free way to tell them apart, and no
    // credits of its own to roll back, it is simply treated as
    // non-coinbase below (repooling a long-buried coinbase transaction
    // nobody will ever rebroadcast is harmless).
    let is_coinbase = credit_entries
        .iter()
        .any(|(_, value)| matches!(crate::keyspace::codec::decode_credit(value), Ok(c) if c.coinbase));

    if is_coinbase {
        for (key, _value) in &credit_entries {
            let credit_key = keys::decode_credit_key(key)?;
            let credit = index::get_credit(txn, &credit_key)?
                .ok_or_else(|| Error::database("credit disappeared mid-rollback"))?;
            let outpoint = credit_key.outpoint();
            coinbase_credits.push(outpoint);
            if index::get_unspent(txn, outpoint)?.is_some() {
                if credit.op_code.counts_toward_mined_balance() {
                    index::adjust_mined_balance(txn, -credit.amount)?;
                }
                index::delete_raw_unspent(txn, outpoint);
            }
            index::delete_credit(txn, &credit_key);
            if index::get_multisig_out(txn, outpoint)?.is_some() {
                index::set_multisig_out_unmined(txn, outpoint)?;
            }
        }
        return Ok(());
    }

    index::put_unmined_tx(txn, hash, &record);

    let inputs = codec
        .inputs(&record.serialized_tx)
        .map_err(|e| Error::input(format!("could not parse transaction inputs: {}", e)))?;
    for (input_index, input) in inputs.iter().enumerate() {
        if record.tx_type == TxType::SSGen && input_index == 0 {
            continue;
        }
        if input.is_stakebase() {
            continue;
        }
        let prev = input.previous_outpoint;
        index::put_raw_unmined_input(txn, prev, hash);

        let debit_key = index::debit_key(hash, block, input_index as u32);
        if let Some(debit) = index::get_debit(txn, &debit_key)? {
            let spent_credit = index::get_credit(txn, &debit.spent_credit_key)?;
            let amount = index::unspend_raw_credit(txn, &debit.spent_credit_key)?;
            index::delete_debit(txn, &debit_key);
            if amount != wallet_chain::Amount::ZERO {
                let op_code = spent_credit.map(|c| c.op_code);
                if op_code != Some(wallet_chain::OpCode::SStx) {
                    index::adjust_mined_balance(txn, amount)?;
                }
                index::put_unspent(txn, prev, debit.spent_credit_key.block);
            }
        }

        if let Some(ms) = index::get_multisig_out(txn, prev)? {
            if ms.spender.map(|(spender_hash, _)| spender_hash) == Some(hash) {
                index::set_multisig_out_unspent(txn, prev)?;
            }
        }
    }

    for (key, _value) in &credit_entries {
        let credit_key = keys::decode_credit_key(key)?;
        let credit = index::get_credit(txn, &credit_key)?
            .ok_or_else(|| Error::database("credit disappeared mid-rollback"))?;
        let outpoint = credit_key.outpoint();

        index::put_unmined_credit(
            txn,
            outpoint,
            &UnminedCreditRecord {
                amount: credit.amount,
                change: credit.change,
                op_code: credit.op_code,
            },
        );
        index::delete_credit(txn, &credit_key);
        if index::get_unspent(txn, outpoint)?.is_some() {
            if credit.op_code.counts_toward_mined_balance() {
                index::adjust_mined_balance(txn, -credit.amount)?;
            }
            index::delete_raw_unspent(txn, outpoint);
        }
        if index::get_multisig_out(txn, outpoint)?.is_some() {
            index::set_multisig_out_unmined(txn, outpoint)?;
        }
    }

    tracing::debug!(?hash, height = block.height, "rolled back mined transaction");
    Ok(())
}

/// `removeDoubleSpends` (spec §4.3 step 3): before a new mined
/// transaction's inputs are recorded as spending their previous
/// outputs, any unmined transaction still claiming one of those same
/// previous outputs is a double spend the chain has just resolved in
/// `rec`'s favor — it and every transitive unmined spender of its own
/// outputs must go.
pub(crate) fn remove_double_spends<C: TxCodec>(
    txn: &mut Txn,
    codec: &C,
    inputs: &[wallet_chain::Input],
) -> crate::Result<()> {
    for input in inputs {
        if input.is_stakebase() {
            continue;
        }
        if let Some(conflicting) = index::get_unmined_input(txn, input.previous_outpoint)? {
            remove_conflict(txn, codec, conflicting)?;
        }
    }
    Ok(())
}

/// Removes `hash`'s unmined record, its unmined credits, and the
/// `UnminedInputs` bookkeeping it created on both sides — and
/// recurses into any unmined transaction that itself spends one of
/// `hash`'s own (now-removed) outputs (spec §4.5 "and its transitive
/// unmined spenders").
pub(crate) fn remove_conflict<C: TxCodec>(txn: &mut Txn, codec: &C, hash: TxHash) -> crate::Result<()> {
    let children = txn.scan_prefix(TreeId::UnminedInputs, hash.as_bytes())?;
    for (_key, value) in &children {
        let spender = decode_unmined_input_value(value)?;
        remove_conflict(txn, codec, spender)?;
    }

    if let Some(record) = index::get_unmined_tx(txn, hash)? {
        if let Ok(inputs) = codec.inputs(&record.serialized_tx) {
            for input in inputs {
                if !input.is_stakebase() {
                    index::delete_raw_unmined_input(txn, input.previous_outpoint);
                }
            }
        }
        index::delete_unmined_tx(txn, hash);
    }

    for (key, _value) in txn.scan_prefix(TreeId::UnminedCredits, hash.as_bytes())? {
        let outpoint = keys::decode_outpoint_key(&key)?;
        index::delete_raw_unmined_credit(txn, outpoint);
    }

    for (key, _value) in children {
        let outpoint = keys::decode_outpoint_key(&key)?;
        index::delete_raw_unmined_input(txn, outpoint);
    }

    tracing::debug!(?hash, "removed conflicting unmined transaction");
    Ok(())
}

fn decode_unmined_input_value(bytes: &[u8]) -> crate::Result<TxHash> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::database("malformed unmined-input value"))?;
    Ok(TxHash::from_bytes(arr))
}
