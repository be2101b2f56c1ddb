use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::hash::TxHash;
use crate::outpoint::BlockId;

/// The externally-computed type of a transaction (spec §3 TxRecord).
///
/// Computed once, outside the store, by whatever stake-rule engine the
/// chain parameters imply; the store only ever branches on it, never
/// derives it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub enum TxType {
    /// An ordinary value-transfer transaction.
    Regular,
    /// A ticket submission (SStx).
    SStx,
    /// A vote (SSGen).
    SSGen,
    /// A ticket revocation (SSRtx).
    SSRtx,
}

/// The stake-cycle role of one transaction *output* (spec §3 Credit).
///
/// A transaction has one [`TxType`] but each output can carry a distinct
/// `OpCode` — e.g. an `SStx` transaction's output 0 is the ticket
/// submission itself while output 1 is the `SStxChange` back to the
/// wallet.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub enum OpCode {
    /// A plain, non-stake output.
    NonStake,
    /// A ticket-submission output; never contributes to `MinedBalance`
    /// and never matures for spending purposes (spec §4.6).
    SStx,
    /// A vote-reward output.
    SSGen,
    /// A revocation-refund output.
    SSRtx,
    /// Change returned by a ticket purchase.
    SStxChange,
}

impl OpCode {
    /// `true` for every op-code except [`OpCode::SStx`] — the law of
    /// spec §3 invariant 5 (`MinedBalance` excludes ticket outputs).
    pub fn counts_toward_mined_balance(self) -> bool {
        !matches!(self, OpCode::SStx)
    }
}

/// Who currently spends a credit, if anyone.
///
/// The on-disk layout (spec §6 Credit value) packs this into
/// `spenderBlock || spenderHash || spenderIndex`, with an all-zero block
/// and a `0xFFFFFFFF` sentinel index meaning unspent (spec §9 "Spender
/// sentinels"). That translation happens only at the `wallet-state`
/// codec boundary; nowhere else does code care about the sentinel.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Spender {
    Unspent,
    By {
        hash: TxHash,
        /// The block the spending transaction was mined in. A Credit is
        /// only ever marked spent by a *mined* transaction (spec §3
        /// invariant 2/6); unmined spends are tracked separately via
        /// `UnminedInput` and never flip this field.
        block: BlockId,
        index: u32,
    },
}

impl Spender {
    pub fn is_unspent(&self) -> bool {
        matches!(self, Spender::Unspent)
    }
}
