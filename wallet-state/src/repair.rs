//! Repair & dump (spec §4.7): restores invariants 1/2/5 after a prior
//! crash broke atomicity, and a frozen full-bucket snapshot for tests.

use wallet_chain::{Amount, ChainParams, Outpoint};

use crate::index;
use crate::keyspace::keys;
use crate::records::{
    BlockRecord, CreditKey, CreditRecord, DebitRecord, MultisigOutRecord, TxRecord, UnminedCreditRecord,
    UnspentRecord,
};
use crate::store::{Store, TreeId};
use crate::txn::Txn;
use crate::Error;

impl<P: ChainParams> Store<P> {
    /// Walks `UnspentIndex`, deleting any entry whose `Credit`,
    /// `TxRecord`, or `Block` record has gone missing (spec §4.7).
    /// Returns the outpoints that survived, for the caller to
    /// reconcile against the network.
    pub fn repair_inconsistencies(&self) -> crate::Result<Vec<Outpoint>> {
        self.scoped_update(|txn, _params| {
            let mut bad = Vec::new();
            let mut good = Vec::new();

            for (key, value) in txn.scan_prefix(TreeId::Unspent, &[])? {
                let outpoint = keys::decode_outpoint_key(&key)?;
                let unspent = crate::keyspace::codec::decode_unspent(&value)?;
                let credit_key = CreditKey {
                    tx_hash: outpoint.hash,
                    block: unspent.block,
                    index: outpoint.index,
                };
                if is_consistent(txn, &credit_key)? {
                    good.push(outpoint);
                } else {
                    bad.push((outpoint, credit_key));
                }
            }

            for (outpoint, credit_key) in bad {
                index::delete_raw_unspent(txn, outpoint);
                index::delete_credit(txn, &credit_key);
                tracing::warn!(?outpoint, "repaired dangling unspent entry");
            }

            Ok(good)
        })
    }

    /// Explicitly removes the given `UnspentIndex` rows. Deleting the
    /// paired `Credit` is best-effort: a missing credit key key is not
    /// an error (spec §4.7 `DeleteUnspent`).
    pub fn delete_unspent(&self, outpoints: &[Outpoint]) -> crate::Result<()> {
        self.scoped_update(|txn, _params| {
            for &outpoint in outpoints {
                if let Some(unspent) = index::get_unspent(txn, outpoint)? {
                    let credit_key = CreditKey {
                        tx_hash: outpoint.hash,
                        block: unspent.block,
                        index: outpoint.index,
                    };
                    index::delete_credit(txn, &credit_key);
                }
                index::delete_raw_unspent(txn, outpoint);
            }
            Ok(())
        })
    }

    /// Overwrites `MinedBalance` with a fresh [`BalanceMode::FullScan`]
    /// computation (spec §4.7 `RepairMinedBalance`).
    pub fn repair_mined_balance(&self, tip: i32) -> crate::Result<Amount> {
        self.scoped_update(|txn, params| {
            let fresh = crate::balance::full_scan(txn, params, 1, tip)?;
            index::put_mined_balance(txn, fresh);
            Ok(fresh)
        })
    }

    /// A frozen snapshot of every bucket plus `MinedBalance` and two
    /// spendable-balance readings, for test assertions (spec §4.7
    /// `DatabaseDump`).
    pub fn database_dump(&self, tip: i32) -> crate::Result<DatabaseDump> {
        self.scoped_view(|txn, params| {
            Ok(DatabaseDump {
                blocks: dump_blocks(txn)?,
                tx_records: dump_tx_records(txn)?,
                unmined_tx_records: dump_unmined_tx_records(txn)?,
                credits: dump_credits(txn)?,
                unspent: dump_unspent(txn)?,
                debits: dump_debits(txn)?,
                unmined_credits: dump_unmined_credits(txn)?,
                unmined_inputs: dump_unmined_inputs(txn)?,
                multisig: dump_multisig(txn)?,
                mined_balance: index::get_mined_balance(txn)?,
                spendable_min_conf_1: crate::balance::spendable(txn, params, 1, tip)?,
                spendable_min_conf_6: crate::balance::spendable(txn, params, 6, tip)?,
            })
        })
    }
}

fn is_consistent(txn: &Txn, credit_key: &CreditKey) -> crate::Result<bool> {
    let Some(_credit) = index::get_credit(txn, credit_key)? else {
        return Ok(false);
    };
    let Some(_tx_record) = index::get_mined_tx(txn, credit_key.tx_hash, credit_key.block)? else {
        return Ok(false);
    };
    let Some(_block) = index::get_block(txn, credit_key.block.height)? else {
        return Ok(false);
    };
    Ok(true)
}

fn dump_blocks(txn: &Txn) -> crate::Result<Vec<(i32, BlockRecord)>> {
    txn.scan_prefix(TreeId::Blocks, &[])?
        .into_iter()
        .map(|(key, value)| Ok((keys::decode_block_key(&key)?, crate::keyspace::codec::decode_block(&value)?)))
        .collect()
}

fn dump_tx_records(txn: &Txn) -> crate::Result<Vec<((wallet_chain::TxHash, wallet_chain::BlockId), TxRecord)>> {
    txn.scan_prefix(TreeId::TxRecords, &[])?
        .into_iter()
        .map(|(key, value)| {
            Ok((
                keys::decode_tx_record_key(&key)?,
                crate::keyspace::codec::decode_tx_record(&value)?,
            ))
        })
        .collect()
}

fn dump_unmined_tx_records(txn: &Txn) -> crate::Result<Vec<(wallet_chain::TxHash, TxRecord)>> {
    txn.scan_prefix(TreeId::Unmined, &[])?
        .into_iter()
        .map(|(key, value)| {
            let arr: [u8; 32] = key
                .as_slice()
                .try_into()
                .map_err(|_| Error::database("malformed unmined tx-record key"))?;
            Ok((
                wallet_chain::TxHash::from_bytes(arr),
                crate::keyspace::codec::decode_tx_record(&value)?,
            ))
        })
        .collect()
}

fn dump_credits(txn: &Txn) -> crate::Result<Vec<(CreditKey, CreditRecord)>> {
    txn.scan_prefix(TreeId::Credits, &[])?
        .into_iter()
        .map(|(key, value)| Ok((keys::decode_credit_key(&key)?, crate::keyspace::codec::decode_credit(&value)?)))
        .collect()
}

fn dump_unspent(txn: &Txn) -> crate::Result<Vec<(Outpoint, UnspentRecord)>> {
    txn.scan_prefix(TreeId::Unspent, &[])?
        .into_iter()
        .map(|(key, value)| Ok((keys::decode_outpoint_key(&key)?, crate::keyspace::codec::decode_unspent(&value)?)))
        .collect()
}

fn dump_debits(txn: &Txn) -> crate::Result<Vec<DebitRecord>> {
    txn.scan_prefix(TreeId::Debits, &[])?
        .into_iter()
        .map(|(_key, value)| crate::keyspace::codec::decode_debit(&value))
        .collect()
}

fn dump_unmined_credits(txn: &Txn) -> crate::Result<Vec<(Outpoint, UnminedCreditRecord)>> {
    txn.scan_prefix(TreeId::UnminedCredits, &[])?
        .into_iter()
        .map(|(key, value)| {
            Ok((
                keys::decode_outpoint_key(&key)?,
                crate::keyspace::codec::decode_unmined_credit(&value)?,
            ))
        })
        .collect()
}

fn dump_unmined_inputs(txn: &Txn) -> crate::Result<Vec<(Outpoint, wallet_chain::TxHash)>> {
    txn.scan_prefix(TreeId::UnminedInputs, &[])?
        .into_iter()
        .map(|(key, value)| {
            let outpoint = keys::decode_outpoint_key(&key)?;
            let arr: [u8; 32] = value
                .as_slice()
                .try_into()
                .map_err(|_| Error::database("malformed unmined-input value"))?;
            Ok((outpoint, wallet_chain::TxHash::from_bytes(arr)))
        })
        .collect()
}

fn dump_multisig(txn: &Txn) -> crate::Result<Vec<(Outpoint, MultisigOutRecord)>> {
    txn.scan_prefix(TreeId::Multisig, &[])?
        .into_iter()
        .map(|(key, value)| {
            Ok((
                keys::decode_outpoint_key(&key)?,
                crate::keyspace::codec::decode_multisig_out(&value)?,
            ))
        })
        .collect()
}

/// The frozen snapshot `DatabaseDump` returns (spec §4.7).
#[derive(Clone, Debug)]
pub struct DatabaseDump {
    pub blocks: Vec<(i32, BlockRecord)>,
    pub tx_records: Vec<((wallet_chain::TxHash, wallet_chain::BlockId), TxRecord)>,
    pub unmined_tx_records: Vec<(wallet_chain::TxHash, TxRecord)>,
    pub credits: Vec<(CreditKey, CreditRecord)>,
    pub unspent: Vec<(Outpoint, UnspentRecord)>,
    pub debits: Vec<DebitRecord>,
    pub unmined_credits: Vec<(Outpoint, UnminedCreditRecord)>,
    pub unmined_inputs: Vec<(Outpoint, wallet_chain::TxHash)>,
    pub multisig: Vec<(Outpoint, MultisigOutRecord)>,
    pub mined_balance: Amount,
    pub spendable_min_conf_1: Amount,
    pub spendable_min_conf_6: Amount,
}
