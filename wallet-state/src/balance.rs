//! Balance engine (spec §4.6): the four balance modes, the maturity
//! table they all share, and greedy-descending coin selection.

use std::collections::HashSet;

use wallet_chain::{Amount, BlockId, ChainParams, OpCode, Outpoint, ScriptHash};

use crate::index;
use crate::keyspace::keys;
use crate::records::{CreditRecord, MultisigCredit};
use crate::store::{Store, TreeId};
use crate::txn::Txn;
use crate::Error;

/// Which of the four balance calculations to run (spec §4.6).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BalanceMode {
    /// Sum of every unspent credit, maturity ignored, minus anything
    /// consumed by an unmined input.
    All,
    /// Sum of unspent `SStx` (ticket submission) credits.
    LockedStake,
    /// `MinedBalance`, adjusted for unconfirmed spends and immature
    /// credits within the confirmation window.
    Spendable,
    /// Recomputes from `UnspentIndex` directly rather than trusting
    /// `MinedBalance`; used as the oracle `RepairMinedBalance` trusts.
    FullScan,
}

/// One spendable output as reconstructed for coin selection or an
/// `UnspentOutputs` listing: a [`CreditRecord`] paired with the
/// outpoint that identifies it, mined (`block = Some`) or still
/// unmined (`block = None`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnspentOutput {
    pub outpoint: Outpoint,
    pub amount: Amount,
    pub op_code: OpCode,
    pub block: Option<BlockId>,
}

impl<P: ChainParams> Store<P> {
    /// Computes a balance under `mode` as of `tip`, honoring `min_conf`
    /// confirmations for ordinary (non-stake) credits (spec §4.6).
    pub fn balance(&self, mode: BalanceMode, min_conf: i32, tip: i32) -> crate::Result<Amount> {
        self.scoped_view(|txn, params| match mode {
            BalanceMode::All => balance_all(txn),
            BalanceMode::LockedStake => balance_locked_stake(txn),
            BalanceMode::Spendable => spendable(txn, params, min_conf, tip),
            BalanceMode::FullScan => full_scan(txn, params, min_conf, tip),
        })
    }

    /// Every unspent credit not currently claimed by an unmined input,
    /// mined or unmined, maturity ignored.
    pub fn unspent_outputs(&self) -> crate::Result<Vec<UnspentOutput>> {
        self.scoped_view(|txn, _params| {
            let mut out = Vec::new();
            for (outpoint, block, credit) in scan_mined_unspent(txn)? {
                if index::get_unmined_input(txn, outpoint)?.is_some() {
                    continue;
                }
                out.push(UnspentOutput {
                    outpoint,
                    amount: credit.amount,
                    op_code: credit.op_code,
                    block: Some(block),
                });
            }
            Ok(out)
        })
    }

    /// Just the outpoints of [`Store::unspent_outputs`].
    pub fn unspent_outpoints(&self) -> crate::Result<Vec<Outpoint>> {
        Ok(self.unspent_outputs()?.into_iter().map(|u| u.outpoint).collect())
    }

    /// Unspent `SStx` outpoints, optionally filtered to only those that
    /// have reached `ChainParams::ticket_maturity` as of `sync_height`.
    pub fn unspent_tickets(&self, sync_height: i32, include_immature: bool) -> crate::Result<Vec<Outpoint>> {
        self.scoped_view(|txn, params| {
            let mut out = Vec::new();
            for (outpoint, block, credit) in scan_mined_unspent(txn)? {
                if credit.op_code != OpCode::SStx {
                    continue;
                }
                let mature = sync_height - block.height + 1 >= params.ticket_maturity();
                if include_immature || mature {
                    out.push(outpoint);
                }
            }
            Ok(out)
        })
    }

    /// The greedy-descending coin selection of spec §4.6
    /// `UnspentOutputsForAmount`: accumulates mature, non-stake credits
    /// largest-first until their sum reaches `needed`, or returns an
    /// empty list if the wallet can never reach it.
    pub fn unspent_outputs_for_amount(
        &self,
        needed: Amount,
        tip: i32,
        min_conf: i32,
    ) -> crate::Result<Vec<UnspentOutput>> {
        self.scoped_view(|txn, params| {
            let mut candidates = mature_candidates(txn, params, min_conf, tip)?;
            if min_conf == 0 {
                candidates.extend(unmined_non_stake_candidates(txn)?);
            }
            candidates.sort_unstable_by(|a, b| b.amount.cmp(&a.amount));

            let mut total = Amount::ZERO;
            let mut selected = Vec::new();
            for candidate in candidates {
                if total >= needed {
                    break;
                }
                total += candidate.amount;
                selected.push(candidate);
            }
            if total < needed {
                return Ok(Vec::new());
            }
            Ok(selected)
        })
    }

    pub fn get_multisig_credit(&self, outpoint: Outpoint) -> crate::Result<MultisigCredit> {
        self.scoped_view(|txn, _params| {
            let output = index::get_multisig_out(txn, outpoint)?
                .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))?;
            Ok(MultisigCredit { outpoint, output })
        })
    }

    pub fn get_multisig_output(&self, outpoint: Outpoint) -> crate::Result<crate::records::MultisigOutRecord> {
        self.scoped_view(|txn, _params| {
            index::get_multisig_out(txn, outpoint)?
                .ok_or_else(|| Error::no_exists(format!("multisig output {:?} does not exist", outpoint)))
        })
    }

    pub fn unspent_multisig_credits(&self) -> crate::Result<Vec<MultisigCredit>> {
        self.scoped_view(|txn, _params| {
            let mut out = Vec::new();
            for (key, _value) in txn.scan_prefix(TreeId::MultisigUsp, &[])? {
                let outpoint = keys::decode_outpoint_key(&key)?;
                let output = index::get_multisig_out(txn, outpoint)?
                    .ok_or_else(|| Error::database("MultisigUsp entry with no matching MultisigOut"))?;
                out.push(MultisigCredit { outpoint, output });
            }
            Ok(out)
        })
    }

    /// [`Store::unspent_multisig_credits`] filtered to outputs whose
    /// redeem script hashes to `script_hash` — the Rust-native stand-in
    /// for filtering by a human-readable P2SH address, which this crate
    /// never constructs (see `ScriptOracle`'s scope).
    pub fn unspent_multisig_credits_for_script(&self, script_hash: ScriptHash) -> crate::Result<Vec<MultisigCredit>> {
        Ok(self
            .unspent_multisig_credits()?
            .into_iter()
            .filter(|c| c.output.script_hash == script_hash)
            .collect())
    }
}

fn scan_mined_unspent(txn: &Txn) -> crate::Result<Vec<(Outpoint, BlockId, CreditRecord)>> {
    let mut out = Vec::new();
    for (key, value) in txn.scan_prefix(TreeId::Unspent, &[])? {
        let outpoint = keys::decode_outpoint_key(&key)?;
        let unspent = crate::keyspace::codec::decode_unspent(&value)?;
        let credit_key = crate::records::CreditKey {
            tx_hash: outpoint.hash,
            block: unspent.block,
            index: outpoint.index,
        };
        let credit = index::get_credit(txn, &credit_key)?
            .ok_or_else(|| Error::database("UnspentIndex entry with no matching credit"))?;
        out.push((outpoint, unspent.block, credit));
    }
    Ok(out)
}

/// Spec §4.6's shared maturity table. `credit_height` is the height the
/// credit was mined at; confirmations are counted inclusively (a credit
/// mined in the tip block has one confirmation).
fn is_mature<P: ChainParams>(params: &P, credit: &CreditRecord, credit_height: i32, tip: i32, min_conf: i32) -> bool {
    let confirmations = tip - credit_height + 1;
    match credit.op_code {
        OpCode::SStx => false,
        OpCode::SSGen | OpCode::SSRtx => confirmations >= params.coinbase_maturity(),
        OpCode::SStxChange => confirmations >= params.sstx_change_maturity(),
        OpCode::NonStake if credit.coinbase => confirmations >= min_conf.max(params.coinbase_maturity()),
        OpCode::NonStake => confirmations >= min_conf,
    }
}

fn mature_candidates<P: ChainParams>(
    txn: &Txn,
    params: &P,
    min_conf: i32,
    tip: i32,
) -> crate::Result<Vec<UnspentOutput>> {
    let mut out = Vec::new();
    for (outpoint, block, credit) in scan_mined_unspent(txn)? {
        if index::get_unmined_input(txn, outpoint)?.is_some() {
            continue;
        }
        if credit.op_code == OpCode::SStx {
            continue;
        }
        if is_mature(params, &credit, block.height, tip, min_conf) {
            out.push(UnspentOutput {
                outpoint,
                amount: credit.amount,
                op_code: credit.op_code,
                block: Some(block),
            });
        }
    }
    Ok(out)
}

fn unmined_non_stake_candidates(txn: &Txn) -> crate::Result<Vec<UnspentOutput>> {
    let mut out = Vec::new();
    for (key, value) in txn.scan_prefix(TreeId::UnminedCredits, &[])? {
        let outpoint = keys::decode_outpoint_key(&key)?;
        if index::get_unmined_input(txn, outpoint)?.is_some() {
            continue;
        }
        let credit = crate::keyspace::codec::decode_unmined_credit(&value)?;
        if credit.op_code == OpCode::SStx {
            continue;
        }
        out.push(UnspentOutput {
            outpoint,
            amount: credit.amount,
            op_code: credit.op_code,
            block: None,
        });
    }
    Ok(out)
}

fn balance_all(txn: &Txn) -> crate::Result<Amount> {
    let mut total = Amount::ZERO;
    for (outpoint, _block, credit) in scan_mined_unspent(txn)? {
        if index::get_unmined_input(txn, outpoint)?.is_some() {
            continue;
        }
        total += credit.amount;
    }
    Ok(total)
}

fn balance_locked_stake(txn: &Txn) -> crate::Result<Amount> {
    let mut total = Amount::ZERO;
    for (_outpoint, _block, credit) in scan_mined_unspent(txn)? {
        if credit.op_code == OpCode::SStx {
            total += credit.amount;
        }
    }
    Ok(total)
}

pub(crate) fn full_scan<P: ChainParams>(txn: &Txn, params: &P, min_conf: i32, tip: i32) -> crate::Result<Amount> {
    Ok(mature_candidates(txn, params, min_conf, tip)?
        .into_iter()
        .map(|c| c.amount)
        .sum())
}

pub(crate) fn spendable<P: ChainParams>(txn: &Txn, params: &P, min_conf: i32, tip: i32) -> crate::Result<Amount> {
    let mut balance = index::get_mined_balance(txn)?;
    // A credit can be both an unconfirmed-spend target and immature
    // within the scan window below; track what's already been
    // subtracted so such a credit is never counted twice.
    let mut subtracted: HashSet<Outpoint> = HashSet::new();

    for (key, _value) in txn.scan_prefix(TreeId::UnminedInputs, &[])? {
        let prev = keys::decode_outpoint_key(&key)?;
        let Some(unspent) = index::get_unspent(txn, prev)? else {
            continue;
        };
        let credit_key = crate::records::CreditKey {
            tx_hash: prev.hash,
            block: unspent.block,
            index: prev.index,
        };
        let credit = index::get_credit(txn, &credit_key)?
            .ok_or_else(|| Error::database("UnspentIndex entry with no matching credit"))?;
        if credit.op_code != OpCode::SStx && subtracted.insert(prev) {
            balance -= credit.amount;
        }
    }

    let window_floor = tip - min_conf.max(params.coinbase_maturity()) + 1;
    for (outpoint, block, credit) in scan_mined_unspent(txn)? {
        if block.height < window_floor || block.height > tip {
            continue;
        }
        if credit.op_code == OpCode::SStx {
            continue;
        }
        if !is_mature(params, &credit, block.height, tip, min_conf) && subtracted.insert(outpoint) {
            balance -= credit.amount;
        }
    }

    if min_conf == 0 {
        for candidate in unmined_non_stake_candidates(txn)? {
            balance += candidate.amount;
        }
    }

    Ok(balance)
}
