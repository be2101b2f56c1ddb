//! Index maintenance primitives (spec §4.2).
//!
//! Everything here is a thin, single-purpose mutation or lookup on one
//! bucket, expressed in terms of a [`Txn`] and the pure codecs in
//! [`crate::keyspace`]. The insertion/confirmation/rollback pipelines
//! compose these; nothing here enforces cross-bucket invariants itself
//! (that's the pipelines' job) beyond the few spelled out in spec §4.2.

use wallet_chain::{Amount, BlockId, Outpoint, Spender, TxHash};

use crate::keyspace::{self, codec, keys};
use crate::records::{
    CreditKey, CreditRecord, DebitRecord, MultisigOutRecord, UnminedCreditRecord, UnspentRecord,
};
use crate::store::{TreeId, MINED_BALANCE_KEY};
use crate::txn::Txn;
use crate::Error;

// ---------------------------------------------------------------------
// Credits
// ---------------------------------------------------------------------

pub(crate) fn get_credit(txn: &Txn, key: &CreditKey) -> crate::Result<Option<CreditRecord>> {
    match txn.get(TreeId::Credits, &keys::credit_key(key))? {
        Some(bytes) => Ok(Some(codec::decode_credit(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_credit(txn: &mut Txn, key: &CreditKey, record: &CreditRecord) {
    txn.put(TreeId::Credits, &keys::credit_key(key), codec::encode_credit(record));
}

pub(crate) fn delete_credit(txn: &mut Txn, key: &CreditKey) {
    txn.delete(TreeId::Credits, &keys::credit_key(key));
}

/// Marks a credit spent: parses the credit, stamps its spender, rewrites
/// it, and returns its amount (spec §4.2 `spendCredit`).
///
/// The caller is responsible for also writing the matching [`DebitRecord`]
/// (spec §4.2: "Must be matched by `putDebit` (by caller)").
pub(crate) fn spend_credit(
    txn: &mut Txn,
    key: &CreditKey,
    spender_hash: TxHash,
    spender_block: BlockId,
    spender_index: u32,
) -> crate::Result<Amount> {
    let mut record = get_credit(txn, key)?
        .ok_or_else(|| Error::no_exists(format!("credit {:?} does not exist", key)))?;
    record.spender = Spender::By {
        hash: spender_hash,
        block: spender_block,
        index: spender_index,
    };
    let amount = record.amount;
    put_credit(txn, key, &record);
    Ok(amount)
}

/// Clears a credit's spender, returning its amount. If the credit was
/// already removed during this rollback, succeeds with amount zero
/// (spec §4.2 `unspendRawCredit`: "Callers must treat amount=0 as 'do
/// nothing further'").
pub(crate) fn unspend_raw_credit(txn: &mut Txn, key: &CreditKey) -> crate::Result<Amount> {
    let mut record = match get_credit(txn, key)? {
        Some(record) => record,
        None => return Ok(Amount::ZERO),
    };
    record.spender = Spender::Unspent;
    let amount = record.amount;
    put_credit(txn, key, &record);
    Ok(amount)
}

// ---------------------------------------------------------------------
// UnspentIndex
// ---------------------------------------------------------------------

pub(crate) fn get_unspent(txn: &Txn, outpoint: Outpoint) -> crate::Result<Option<UnspentRecord>> {
    match txn.get(TreeId::Unspent, &keys::outpoint_key(outpoint))? {
        Some(bytes) => Ok(Some(codec::decode_unspent(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_unspent(txn: &mut Txn, outpoint: Outpoint, block: BlockId) {
    txn.put(
        TreeId::Unspent,
        &keys::outpoint_key(outpoint),
        keyspace::encode_unspent(&UnspentRecord { block }).to_vec(),
    );
}

pub(crate) fn delete_raw_unspent(txn: &mut Txn, outpoint: Outpoint) {
    txn.delete(TreeId::Unspent, &keys::outpoint_key(outpoint));
}

// ---------------------------------------------------------------------
// Debits
// ---------------------------------------------------------------------

/// Debits are keyed by `(spender-hash, spender-input-index, block)`,
/// i.e. the same 68-byte TxRecord-style key as the spending transaction
/// plus its input index, so a debit can never collide across forks of
/// the same spender.
pub(crate) fn debit_key(spender_hash: TxHash, spender_block: BlockId, spender_index: u32) -> [u8; 72] {
    keys::credit_key(&CreditKey {
        tx_hash: spender_hash,
        block: spender_block,
        index: spender_index,
    })
}

pub(crate) fn get_debit(txn: &Txn, key: &[u8; 72]) -> crate::Result<Option<DebitRecord>> {
    match txn.get(TreeId::Debits, key)? {
        Some(bytes) => Ok(Some(codec::decode_debit(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_debit(txn: &mut Txn, key: &[u8; 72], record: &DebitRecord) {
    txn.put(TreeId::Debits, key, codec::encode_debit(record));
}

pub(crate) fn delete_debit(txn: &mut Txn, key: &[u8; 72]) {
    txn.delete(TreeId::Debits, key);
}

// ---------------------------------------------------------------------
// Unmined tx records
// ---------------------------------------------------------------------

pub(crate) fn get_unmined_tx(txn: &Txn, hash: TxHash) -> crate::Result<Option<crate::records::TxRecord>> {
    match txn.get(TreeId::Unmined, &keys::unmined_tx_record_key(hash))? {
        Some(bytes) => Ok(Some(codec::decode_tx_record(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_unmined_tx(txn: &mut Txn, hash: TxHash, record: &crate::records::TxRecord) {
    txn.put(
        TreeId::Unmined,
        &keys::unmined_tx_record_key(hash),
        codec::encode_tx_record(record),
    );
}

pub(crate) fn delete_unmined_tx(txn: &mut Txn, hash: TxHash) {
    txn.delete(TreeId::Unmined, &keys::unmined_tx_record_key(hash));
}

// ---------------------------------------------------------------------
// UnminedCredits
// ---------------------------------------------------------------------

pub(crate) fn get_unmined_credit(
    txn: &Txn,
    outpoint: Outpoint,
) -> crate::Result<Option<UnminedCreditRecord>> {
    match txn.get(TreeId::UnminedCredits, &keys::outpoint_key(outpoint))? {
        Some(bytes) => Ok(Some(codec::decode_unmined_credit(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_unmined_credit(txn: &mut Txn, outpoint: Outpoint, record: &UnminedCreditRecord) {
    txn.put(
        TreeId::UnminedCredits,
        &keys::outpoint_key(outpoint),
        keyspace::encode_unmined_credit(record).to_vec(),
    );
}

pub(crate) fn delete_raw_unmined_credit(txn: &mut Txn, outpoint: Outpoint) {
    txn.delete(TreeId::UnminedCredits, &keys::outpoint_key(outpoint));
}

// ---------------------------------------------------------------------
// UnminedInputs
// ---------------------------------------------------------------------

pub(crate) fn get_unmined_input(txn: &Txn, outpoint: Outpoint) -> crate::Result<Option<TxHash>> {
    match txn.get(TreeId::UnminedInputs, &keys::outpoint_key(outpoint))? {
        Some(bytes) => {
            let arr: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| Error::database("malformed unmined-input value"))?;
            Ok(Some(TxHash::from_bytes(arr)))
        }
        None => Ok(None),
    }
}

pub(crate) fn put_raw_unmined_input(txn: &mut Txn, outpoint: Outpoint, spender: TxHash) {
    txn.put(
        TreeId::UnminedInputs,
        &keys::outpoint_key(outpoint),
        spender.as_bytes().to_vec(),
    );
}

pub(crate) fn delete_raw_unmined_input(txn: &mut Txn, outpoint: Outpoint) {
    txn.delete(TreeId::UnminedInputs, &keys::outpoint_key(outpoint));
}

// ---------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------

pub(crate) fn get_block(txn: &Txn, height: i32) -> crate::Result<Option<crate::records::BlockRecord>> {
    match txn.get(TreeId::Blocks, &keys::block_key(height))? {
        Some(bytes) => Ok(Some(codec::decode_block(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_block(txn: &mut Txn, height: i32, record: &crate::records::BlockRecord) {
    txn.put(TreeId::Blocks, &keys::block_key(height), codec::encode_block(record));
}

pub(crate) fn delete_block(txn: &mut Txn, height: i32) {
    txn.delete(TreeId::Blocks, &keys::block_key(height));
}

// ---------------------------------------------------------------------
// TxRecords (mined)
// ---------------------------------------------------------------------

pub(crate) fn get_mined_tx(
    txn: &Txn,
    hash: TxHash,
    block: BlockId,
) -> crate::Result<Option<crate::records::TxRecord>> {
    match txn.get(TreeId::TxRecords, &keys::tx_record_key(hash, block))? {
        Some(bytes) => Ok(Some(codec::decode_tx_record(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_mined_tx(
    txn: &mut Txn,
    hash: TxHash,
    block: BlockId,
    record: &crate::records::TxRecord,
) {
    txn.put(
        TreeId::TxRecords,
        &keys::tx_record_key(hash, block),
        codec::encode_tx_record(record),
    );
}

pub(crate) fn delete_mined_tx(txn: &mut Txn, hash: TxHash, block: BlockId) {
    txn.delete(TreeId::TxRecords, &keys::tx_record_key(hash, block));
}

// ---------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------

pub(crate) fn get_script(txn: &Txn, hash: wallet_chain::ScriptHash) -> crate::Result<Option<Vec<u8>>> {
    txn.get(TreeId::Scripts, &keys::script_key(hash))
}

pub(crate) fn put_script(txn: &mut Txn, hash: wallet_chain::ScriptHash, script: Vec<u8>) {
    txn.put(TreeId::Scripts, &keys::script_key(hash), script);
}

// ---------------------------------------------------------------------
// MultisigOut + MultisigUsp
// ---------------------------------------------------------------------

pub(crate) fn get_multisig_out(txn: &Txn, outpoint: Outpoint) -> crate::Result<Option<MultisigOutRecord>> {
    match txn.get(TreeId::Multisig, &keys::outpoint_key(outpoint))? {
        Some(bytes) => Ok(Some(codec::decode_multisig_out(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_multisig_out(txn: &mut Txn, outpoint: Outpoint, record: &MultisigOutRecord) {
    txn.put(
        TreeId::Multisig,
        &keys::outpoint_key(outpoint),
        codec::encode_multisig_out(record),
    );
}

pub(crate) fn put_multisig_unspent_member(txn: &mut Txn, outpoint: Outpoint) {
    txn.put(TreeId::MultisigUsp, &keys::outpoint_key(outpoint), vec![1]);
}

pub(crate) fn delete_multisig_unspent_member(txn: &mut Txn, outpoint: Outpoint) {
    txn.delete(TreeId::MultisigUsp, &keys::outpoint_key(outpoint));
}

pub(crate) fn set_multisig_out_mined(txn: &mut Txn, outpoint: Outpoint, block: BlockId) -> crate::Result<()> {
    let mut record = get_multisig_out(txn, outpoint)?
        .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))?;
    record.block = Some(block);
    put_multisig_out(txn, outpoint, &record);
    Ok(())
}

pub(crate) fn set_multisig_out_unmined(txn: &mut Txn, outpoint: Outpoint) -> crate::Result<()> {
    let mut record = get_multisig_out(txn, outpoint)?
        .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))?;
    record.block = None;
    put_multisig_out(txn, outpoint, &record);
    Ok(())
}

pub(crate) fn set_multisig_out_spent(
    txn: &mut Txn,
    outpoint: Outpoint,
    spender_hash: TxHash,
    spender_index: u32,
) -> crate::Result<()> {
    let mut record = get_multisig_out(txn, outpoint)?
        .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))?;
    record.spender = Some((spender_hash, spender_index));
    put_multisig_out(txn, outpoint, &record);
    delete_multisig_unspent_member(txn, outpoint);
    Ok(())
}

pub(crate) fn set_multisig_out_unspent(txn: &mut Txn, outpoint: Outpoint) -> crate::Result<()> {
    let mut record = get_multisig_out(txn, outpoint)?
        .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))?;
    record.spender = None;
    put_multisig_out(txn, outpoint, &record);
    put_multisig_unspent_member(txn, outpoint);
    Ok(())
}

// ---------------------------------------------------------------------
// MinedBalance
// ---------------------------------------------------------------------

pub(crate) fn get_mined_balance(txn: &Txn) -> crate::Result<Amount> {
    match txn.get(TreeId::Meta, MINED_BALANCE_KEY)? {
        Some(bytes) => codec::decode_mined_balance(&bytes),
        None => Ok(Amount::ZERO),
    }
}

pub(crate) fn put_mined_balance(txn: &mut Txn, amount: Amount) {
    txn.put(
        TreeId::Meta,
        MINED_BALANCE_KEY,
        keyspace::encode_mined_balance(amount).to_vec(),
    );
}

/// Adjusts `MinedBalance` by `delta`, honoring spec §3 invariant 5: an
/// `SStx` credit never contributes, so callers of `spend_credit`/
/// `unspend_raw_credit` on a ticket-submission output should simply not
/// call this.
pub(crate) fn adjust_mined_balance(txn: &mut Txn, delta: Amount) -> crate::Result<()> {
    let current = get_mined_balance(txn)?;
    put_mined_balance(txn, current + delta);
    Ok(())
}
