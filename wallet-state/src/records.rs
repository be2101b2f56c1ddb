//! In-memory shapes of every record a bucket holds.
//!
//! These are plain data; [`crate::keyspace`] owns the pure functions
//! that translate them to and from the canonical byte layouts of spec
//! §6. A record type here never reads or writes `sled` itself.

use wallet_chain::{Amount, BlockHash, BlockId, OpCode, Outpoint, Spender, TxHash, TxType};

/// A mined block, as spec §3 describes it: identity is its height, it
/// carries its hash/time/vote-bits, and the list of tx-hashes mined
/// within it (invariant 4).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockRecord {
    pub hash: BlockHash,
    pub time: i64,
    pub vote_bits: u16,
    pub tx_hashes: Vec<TxHash>,
}

/// A transaction record, mined or unmined (spec §3 TxRecord).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxRecord {
    pub received: i64,
    pub serialized_tx: Vec<u8>,
    pub tx_type: TxType,
}

/// The fully-qualified key of a mined credit: `(tx-hash, block, out-index)`.
///
/// Also doubles as a debit's "spent-credit-key" pointer (spec §6 Debit
/// value) and as the identity half of a `TxRecord` key when mined.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CreditKey {
    pub tx_hash: TxHash,
    pub block: BlockId,
    pub index: u32,
}

impl CreditKey {
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.tx_hash, self.index)
    }
}

/// A transaction output the wallet believes it owns (spec §3 Credit).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreditRecord {
    pub amount: Amount,
    pub change: bool,
    pub coinbase: bool,
    pub op_code: OpCode,
    pub spender: Spender,
}

impl CreditRecord {
    pub fn is_unspent(&self) -> bool {
        self.spender.is_unspent()
    }
}

/// A mined credit consumed by another mined transaction (spec §3 Debit).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebitRecord {
    pub amount: Amount,
    pub spent_credit_key: CreditKey,
}

/// The redundant `outpoint -> enclosing block` index, present iff the
/// credit at that outpoint is unspent and mined (spec §3 UnspentIndex).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnspentRecord {
    pub block: BlockId,
}

/// An unmined credit: like [`CreditRecord`] but without a spender field,
/// since an unmined credit's "spent by an unmined tx" status lives in
/// the separate `UnminedInputs` index (spec §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnminedCreditRecord {
    pub amount: Amount,
    pub change: bool,
    pub op_code: OpCode,
}

/// A P2SH multisig output, tracked in addition to (not instead of) a
/// plain [`CreditRecord`] when the wallet also owns it as a multisig
/// participant (spec §3 MultisigOut).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultisigOutRecord {
    pub script_hash: wallet_chain::ScriptHash,
    pub required: u8,
    pub total: u8,
    pub tree: u8,
    pub amount: Amount,
    /// `None` while the owning transaction is still unmined.
    pub block: Option<BlockId>,
    pub spender: Option<(TxHash, u32)>,
    /// The transaction that created this output (duplicated from the
    /// outpoint key for cheap `GetMultisigCredit` reconstruction).
    pub tx_hash: TxHash,
}

impl MultisigOutRecord {
    pub fn is_spent(&self) -> bool {
        self.spender.is_some()
    }

    pub fn is_mined(&self) -> bool {
        self.block.is_some()
    }
}

/// A [`MultisigOutRecord`] paired with the outpoint that identifies it,
/// as returned by `GetMultisigCredit`/`UnspentMultisigCredits`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultisigCredit {
    pub outpoint: Outpoint,
    pub output: MultisigOutRecord,
}
