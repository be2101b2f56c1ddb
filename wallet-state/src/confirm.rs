//! Confirmation pipeline (spec §4.4 `moveMinedTx`): promotes a
//! previously-unmined transaction record to mined once its block
//! arrives, without ever re-deriving it from the serialized bytes.

use wallet_chain::{BlockId, Spender, TxHash, TxType};

use crate::index;
use crate::insert::{record_block_membership, spend_mined_inputs};
use crate::keyspace::keys;
use crate::records::{CreditKey, CreditRecord, TxRecord};
use crate::store::TreeId;
use crate::txn::Txn;

/// Moves `hash`'s unmined record into `block`, re-homing every credit
/// and multisig output it created and spending every input it
/// consumes, exactly as [`crate::insert::insert_tx`] would have done
/// had the transaction been mined outright (spec §4.4 steps 1-5).
pub(crate) fn move_mined_tx(
    txn: &mut Txn,
    hash: TxHash,
    block: BlockId,
    unmined: &TxRecord,
    inputs: &[wallet_chain::Input],
    tx_type: TxType,
) -> crate::Result<()> {
    // Step 1: the unmined record is replaced by the mined one, not kept
    // alongside it — a transaction is never both at once.
    index::delete_unmined_tx(txn, hash);

    // Step 2.
    record_block_membership(txn, hash, block)?;
    index::put_mined_tx(txn, hash, block, unmined);

    // Step 3: every output previously tracked as an unmined credit
    // becomes a mined one, in the same block.
    for (key, _value) in txn.scan_prefix(TreeId::UnminedCredits, hash.as_bytes())? {
        let outpoint = keys::decode_outpoint_key(&key)?;
        let unmined_credit = index::get_unmined_credit(txn, outpoint)?
            .expect("scan_prefix only returns keys that currently hold a value");
        index::delete_raw_unmined_credit(txn, outpoint);

        let credit_key = CreditKey {
            tx_hash: hash,
            block,
            index: outpoint.index,
        };
        index::put_credit(
            txn,
            &credit_key,
            &CreditRecord {
                amount: unmined_credit.amount,
                change: unmined_credit.change,
                coinbase: false,
                op_code: unmined_credit.op_code,
                spender: Spender::Unspent,
            },
        );
        index::put_unspent(txn, outpoint, block);
        if unmined_credit.op_code.counts_toward_mined_balance() {
            index::adjust_mined_balance(txn, unmined_credit.amount)?;
        }
    }

    // Step 4: any multisig output this transaction created, still
    // waiting on a block, is stamped with one now.
    for (key, _value) in txn.scan_prefix(TreeId::Multisig, hash.as_bytes())? {
        let outpoint = keys::decode_outpoint_key(&key)?;
        let record = index::get_multisig_out(txn, outpoint)?
            .expect("scan_prefix only returns keys that currently hold a value");
        if record.block.is_none() {
            index::set_multisig_out_mined(txn, outpoint, block)?;
        }
    }

    // Step 5: spend this transaction's own inputs, mirroring
    // `insertMinedTx`'s final phase.
    spend_mined_inputs(txn, hash, block, inputs, tx_type)?;

    metrics::counter!("wallet_state.tx.confirmed", 1);
    tracing::trace!(?hash, height = block.height, "confirmed mined transaction");
    Ok(())
}
