use crate::{hash::TxHash, outpoint::Outpoint};

/// One input of a parsed transaction: a reference to the previous
/// output it spends.
///
/// A coinbase input is represented with an all-zero `Outpoint::hash`
/// (spec §4.3 `AddCredit`: "coinbase iff it has exactly one input with
/// zero previous-hash").
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Input {
    pub previous_outpoint: Outpoint,
}

impl Input {
    /// Whether this is the synthetic stakebase input of an `SSGen`
    /// transaction, which (like coinbase) has no real previous output
    /// (spec §4.5 rollback: "skip input #0 if tx is SSGen").
    pub fn is_stakebase(&self) -> bool {
        self.previous_outpoint.hash == TxHash::default() && self.previous_outpoint.index == 0
    }
}

/// One output of a parsed transaction.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Output {
    pub value: crate::amount::Amount,
    pub script: Vec<u8>,
}

/// Parses a transaction's canonical byte form into its hash, inputs, and
/// outputs (spec §1 `TxCodec`).
///
/// Out of scope per spec §1: real wire parsing and serialization. The
/// store treats the serialized transaction it is handed as an opaque
/// blob it stores and replays through this trait; it never inspects the
/// bytes itself.
pub trait TxCodec {
    /// Transaction parsing/serialization errors (malformed bytes, wrong
    /// version, etc.) are specific to the concrete codec; the store only
    /// needs `Display` to fold them into its own `ErrInput`.
    type Error: std::fmt::Display;

    /// The 32-byte hash identifying `tx_bytes`.
    fn hash(&self, tx_bytes: &[u8]) -> Result<TxHash, Self::Error>;

    /// This transaction's inputs, in order.
    fn inputs(&self, tx_bytes: &[u8]) -> Result<Vec<Input>, Self::Error>;

    /// This transaction's outputs, in order.
    fn outputs(&self, tx_bytes: &[u8]) -> Result<Vec<Output>, Self::Error>;

    /// `true` iff this transaction has exactly one input and that
    /// input's previous outpoint hash is all-zero (spec §4.3).
    fn is_coinbase(&self, tx_bytes: &[u8]) -> Result<bool, Self::Error> {
        let inputs = self.inputs(tx_bytes)?;
        Ok(inputs.len() == 1 && inputs[0].previous_outpoint.hash == TxHash::default())
    }
}
