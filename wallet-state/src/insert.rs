//! Insertion pipeline (spec §4.3): `InsertTx`, `AddCredit`,
//! `AddMultisigOut`, `SpendMultisigOut`.

use wallet_chain::{
    Amount, BlockId, ChainParams, MultisigInfo, OpCode, Outpoint, ScriptClass, ScriptOracle, Spender,
    TxCodec, TxHash, TxType,
};

use crate::index;
use crate::records::{CreditKey, CreditRecord, DebitRecord, MultisigOutRecord, TxRecord, UnminedCreditRecord};
use crate::store::Store;
use crate::txn::Txn;
use crate::Error;

impl<P: ChainParams> Store<P> {
    /// Records `tx_bytes` into the store, either into the mem-pool
    /// (`block` is `None`) or as mined in `block` (spec §4.3).
    pub fn insert_tx<C: TxCodec>(
        &self,
        codec: &C,
        tx_bytes: &[u8],
        tx_type: TxType,
        received: i64,
        block: Option<BlockId>,
    ) -> crate::Result<()> {
        let hash = codec
            .hash(tx_bytes)
            .map_err(|e| Error::input(format!("could not hash transaction: {}", e)))?;
        let inputs = codec
            .inputs(tx_bytes)
            .map_err(|e| Error::input(format!("could not parse transaction inputs: {}", e)))?;

        let record = TxRecord {
            received,
            serialized_tx: tx_bytes.to_vec(),
            tx_type,
        };

        self.scoped_update(|txn, _params| match block {
            None => insert_mempool_tx(txn, hash, &record, &inputs),
            Some(block) => insert_mined_tx(txn, codec, hash, block, &record, &inputs, tx_type),
        })
    }

    /// Adds a credit for one output the wallet owns (spec §4.3
    /// `AddCredit`). `InsertTx` never adds credits on its own behalf —
    /// the caller decides which outputs are its own and calls this
    /// separately for each.
    pub fn add_credit<C: TxCodec, S: ScriptOracle>(
        &self,
        codec: &C,
        oracle: &S,
        tx_bytes: &[u8],
        block: Option<BlockId>,
        index: u32,
        is_change: bool,
    ) -> crate::Result<()> {
        let hash = codec
            .hash(tx_bytes)
            .map_err(|e| Error::input(format!("could not hash transaction: {}", e)))?;
        let outputs = codec
            .outputs(tx_bytes)
            .map_err(|e| Error::input(format!("could not parse transaction outputs: {}", e)))?;
        let output = outputs
            .get(index as usize)
            .ok_or_else(|| Error::input(format!("output index {} out of range", index)))?;
        let coinbase = codec
            .is_coinbase(tx_bytes)
            .map_err(|e| Error::input(format!("could not classify transaction: {}", e)))?;
        let op_code = classify_op_code(oracle, &output.script);

        self.scoped_update(|txn, _params| {
            add_credit_inner(txn, hash, block, index, is_change, coinbase, op_code, output.value)
        })
    }

    /// Tracks a P2SH multisig output the wallet participates in, in
    /// addition to any plain [`CreditRecord`] (spec §4.3 `AddMultisigOut`).
    pub fn add_multisig_out<C: TxCodec, S: ScriptOracle>(
        &self,
        codec: &C,
        oracle: &S,
        tx_bytes: &[u8],
        block: Option<BlockId>,
        index: u32,
    ) -> crate::Result<()> {
        let hash = codec
            .hash(tx_bytes)
            .map_err(|e| Error::input(format!("could not hash transaction: {}", e)))?;
        let outputs = codec
            .outputs(tx_bytes)
            .map_err(|e| Error::input(format!("could not parse transaction outputs: {}", e)))?;
        let output = outputs
            .get(index as usize)
            .ok_or_else(|| Error::input(format!("output index {} out of range", index)))?;

        let class = oracle.classify(&output.script);
        if !matches!(class, ScriptClass::ScriptHash) {
            return Err(Error::input("output script is not pay-to-script-hash"));
        }
        let info = oracle
            .multisig_info(&output.script)
            .ok_or_else(|| Error::input("output script is not a multisig redeem script"))?;
        let amount = output.value;

        self.scoped_update(|txn, _params| add_multisig_out_inner(txn, hash, block, index, info, amount))
    }

    /// Marks a tracked multisig output spent by `(spender_hash,
    /// spender_index)` (spec §4.3 `SpendMultisigOut`).
    pub fn spend_multisig_out(
        &self,
        outpoint: Outpoint,
        spender_hash: TxHash,
        spender_index: u32,
    ) -> crate::Result<()> {
        self.scoped_update(|txn, _params| {
            let record = index::get_multisig_out(txn, outpoint)?
                .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))?;
            if let Some((existing_hash, existing_index)) = record.spender {
                if existing_hash == spender_hash && existing_index == spender_index {
                    return Ok(());
                }
                return Err(Error::DoubleSpend);
            }
            index::set_multisig_out_spent(txn, outpoint, spender_hash, spender_index)
        })
    }
}

fn classify_op_code<S: ScriptOracle>(oracle: &S, script: &[u8]) -> OpCode {
    match oracle.classify(script) {
        ScriptClass::StakeSubmission => OpCode::SStx,
        ScriptClass::StakeGeneration => OpCode::SSGen,
        ScriptClass::StakeRevocation => OpCode::SSRtx,
        ScriptClass::StakeChange => OpCode::SStxChange,
        ScriptClass::Regular | ScriptClass::ScriptHash => OpCode::NonStake,
    }
}

/// `insertMemPoolTx` (spec §4.3).
fn insert_mempool_tx(
    txn: &mut Txn,
    hash: TxHash,
    record: &TxRecord,
    inputs: &[wallet_chain::Input],
) -> crate::Result<()> {
    // A pre-existing unmined record for this hash is replaced outright —
    // the serialized form may change with new mempool relay.
    index::put_unmined_tx(txn, hash, record);

    for input in inputs {
        if input.is_stakebase() {
            continue;
        }
        let prev = input.previous_outpoint;
        let spent_by_unspent_index = index::get_unspent(txn, prev)?.is_some();
        let spent_by_unmined_credit = index::get_unmined_credit(txn, prev)?.is_some();
        if spent_by_unspent_index || spent_by_unmined_credit {
            index::put_raw_unmined_input(txn, prev, hash);
        }
    }

    metrics::counter!("wallet_state.tx.inserted.unmined", 1);
    tracing::trace!(?hash, "inserted unmined transaction");
    Ok(())
}

/// `insertMinedTx` (spec §4.3).
fn insert_mined_tx<C: TxCodec>(
    txn: &mut Txn,
    codec: &C,
    hash: TxHash,
    block: BlockId,
    record: &TxRecord,
    inputs: &[wallet_chain::Input],
    tx_type: TxType,
) -> crate::Result<()> {
    if index::get_mined_tx(txn, hash, block)?.is_some() {
        return Ok(());
    }

    if let Some(unmined) = index::get_unmined_tx(txn, hash)? {
        return crate::confirm::move_mined_tx(txn, hash, block, &unmined, inputs, tx_type);
    }

    crate::rollback::remove_double_spends(txn, codec, inputs)?;

    record_block_membership(txn, hash, block)?;
    index::put_mined_tx(txn, hash, block, record);
    spend_mined_inputs(txn, hash, block, inputs, tx_type)?;

    metrics::counter!("wallet_state.tx.inserted.mined", 1);
    tracing::trace!(?hash, height = block.height, "inserted mined transaction");
    Ok(())
}

/// Appends `hash` to the block's tx-hash list, creating the
/// [`crate::records::BlockRecord`] on first mention (spec §4.2/§4.3).
pub(crate) fn record_block_membership(txn: &mut Txn, hash: TxHash, block: BlockId) -> crate::Result<()> {
    let mut block_record = index::get_block(txn, block.height)?.unwrap_or(crate::records::BlockRecord {
        hash: block.hash,
        time: 0,
        vote_bits: 0,
        tx_hashes: Vec::new(),
    });
    if !block_record.tx_hashes.contains(&hash) {
        block_record.tx_hashes.push(hash);
    }
    index::put_block(txn, block.height, &block_record);
    Ok(())
}

/// Spends every non-stakebase input of a newly-mined transaction whose
/// previous output is a tracked, still-unspent mined credit: stamps the
/// credit's spender, writes the matching debit, clears the `Unspent`/
/// `UnminedInputs` entries, and (outside the stake-input exception)
/// debits `MinedBalance` (spec §4.3 steps 4-5, reused by
/// [`crate::confirm::move_mined_tx`]).
pub(crate) fn spend_mined_inputs(
    txn: &mut Txn,
    hash: TxHash,
    block: BlockId,
    inputs: &[wallet_chain::Input],
    tx_type: TxType,
) -> crate::Result<()> {
    for (input_index, input) in inputs.iter().enumerate() {
        if input.is_stakebase() {
            continue;
        }
        let prev = input.previous_outpoint;
        let Some(unspent) = index::get_unspent(txn, prev)? else {
            continue;
        };
        let credit_key = CreditKey {
            tx_hash: prev.hash,
            block: unspent.block,
            index: prev.index,
        };
        let credit = index::get_credit(txn, &credit_key)?
            .ok_or_else(|| Error::database("UnspentIndex entry with no matching credit"))?;

        let amount = index::spend_credit(txn, &credit_key, hash, block, input_index as u32)?;
        let debit_key = index::debit_key(hash, block, input_index as u32);
        index::put_debit(
            txn,
            &debit_key,
            &DebitRecord {
                amount,
                spent_credit_key: credit_key,
            },
        );
        index::delete_raw_unspent(txn, prev);
        index::delete_raw_unmined_input(txn, prev);

        if !is_ticket_input_exception(tx_type, input_index) && credit.op_code.counts_toward_mined_balance() {
            index::adjust_mined_balance(txn, -amount)?;
        }
    }
    Ok(())
}

/// The stake-input exception of spec §4.3 step 5: for an `SSGen`
/// transaction, input #1 (the ticket purchase being voted on) never
/// decrements `MinedBalance`; for an `SSRtx`, input #0 (the expired or
/// missed ticket being revoked) never does either — both reference a
/// ticket credit that was never counted in the first place.
fn is_ticket_input_exception(tx_type: TxType, input_index: usize) -> bool {
    matches!(
        (tx_type, input_index),
        (TxType::SSGen, 1) | (TxType::SSRtx, 0)
    )
}

fn add_credit_inner(
    txn: &mut Txn,
    hash: TxHash,
    block: Option<BlockId>,
    index_: u32,
    is_change: bool,
    coinbase: bool,
    op_code: OpCode,
    amount: Amount,
) -> crate::Result<()> {
    match block {
        None => {
            index::put_unmined_credit(
                txn,
                Outpoint::new(hash, index_),
                &UnminedCreditRecord {
                    amount,
                    change: is_change,
                    op_code,
                },
            );
        }
        Some(block) => {
            let key = CreditKey {
                tx_hash: hash,
                block,
                index: index_,
            };
            if index::get_credit(txn, &key)?.is_some() {
                return Ok(());
            }
            index::put_credit(
                txn,
                &key,
                &CreditRecord {
                    amount,
                    change: is_change,
                    coinbase,
                    op_code,
                    spender: Spender::Unspent,
                },
            );
            index::put_unspent(txn, Outpoint::new(hash, index_), block);
            if op_code.counts_toward_mined_balance() {
                index::adjust_mined_balance(txn, amount)?;
            }
        }
    }
    Ok(())
}

fn add_multisig_out_inner(
    txn: &mut Txn,
    hash: TxHash,
    block: Option<BlockId>,
    index_: u32,
    info: MultisigInfo,
    amount: Amount,
) -> crate::Result<()> {
    let outpoint = Outpoint::new(hash, index_);

    if let Some(mut existing) = index::get_multisig_out(txn, outpoint)? {
        match (block, existing.block) {
            (Some(block), None) => {
                existing.block = Some(block);
                index::put_multisig_out(txn, outpoint, &existing);
            }
            (None, None) => {}
            _ => {}
        }
        return Ok(());
    }

    if index::get_script(txn, info.script_hash)?.is_none() {
        return Err(Error::no_exists(format!(
            "script {:?} referenced by multisig output is not stored",
            info.script_hash
        )));
    }

    index::put_multisig_out(
        txn,
        outpoint,
        &MultisigOutRecord {
            script_hash: info.script_hash,
            required: info.required,
            total: info.total,
            tree: 0,
            amount,
            block,
            spender: None,
            tx_hash: hash,
        },
    );
    index::put_multisig_unspent_member(txn, outpoint);
    Ok(())
}
