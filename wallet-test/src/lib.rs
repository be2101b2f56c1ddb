//! Test-only fixtures for exercising a wallet transaction store without
//! a real chain client: a self-describing transaction encoding plus
//! minimal [`TxCodec`], [`ScriptOracle`], and [`ChainParams`]
//! implementations built against it.
//!
//! None of this is meant to resemble real consensus rules or wire
//! formats — it exists only so `wallet-state`'s tests have something
//! concrete to hand `Store::insert_tx` and friends.

use wallet_chain::{
    Amount, ChainParams, Input, MultisigInfo, Network, Output, Outpoint, ScriptClass, ScriptHash,
    ScriptOracle, TxCodec, TxHash,
};

mod tx;

pub use tx::{mock_coinbase, mock_tx, multisig_script, stake_script, MockTxBuilder};

/// Parses the format [`MockTxBuilder`] produces. The hash is carried as
/// a literal prefix rather than computed, since nothing here needs to
/// resemble a real digest.
#[derive(Copy, Clone, Debug, Default)]
pub struct MockCodec;

#[derive(thiserror::Error, Debug)]
pub enum MockCodecError {
    #[error("truncated mock transaction")]
    Truncated,
}

impl TxCodec for MockCodec {
    type Error = MockCodecError;

    fn hash(&self, tx_bytes: &[u8]) -> Result<TxHash, Self::Error> {
        tx::decode(tx_bytes).map(|t| t.hash)
    }

    fn inputs(&self, tx_bytes: &[u8]) -> Result<Vec<Input>, Self::Error> {
        tx::decode(tx_bytes).map(|t| t.inputs)
    }

    fn outputs(&self, tx_bytes: &[u8]) -> Result<Vec<Output>, Self::Error> {
        tx::decode(tx_bytes).map(|t| t.outputs)
    }
}

/// Classifies scripts built with [`MockTxBuilder::multisig_output`] or
/// [`MockTxBuilder::stake_output`] according to the marker they carry,
/// and everything else as [`ScriptClass::Regular`].
#[derive(Copy, Clone, Debug, Default)]
pub struct MockOracle;

impl ScriptOracle for MockOracle {
    fn classify(&self, script: &[u8]) -> ScriptClass {
        if tx::decode_multisig_marker(script).is_some() {
            return ScriptClass::ScriptHash;
        }
        tx::decode_stake_marker(script).unwrap_or(ScriptClass::Regular)
    }

    fn multisig_info(&self, script: &[u8]) -> Option<MultisigInfo> {
        tx::decode_multisig_marker(script).map(|(required, total, script_hash)| MultisigInfo {
            required,
            total,
            script_hash,
        })
    }
}

/// Decred-shaped constants, chosen to be small enough that tests can
/// exercise maturity/pruning boundaries without mining hundreds of
/// blocks.
#[derive(Copy, Clone, Debug)]
pub struct TestParams {
    pub coinbase_maturity: i32,
    pub sstx_change_maturity: i32,
    pub ticket_maturity: i32,
    pub target_time_per_block_secs: i64,
    pub work_diff_window_size: i64,
}

impl Default for TestParams {
    fn default() -> Self {
        TestParams {
            coinbase_maturity: 16,
            sstx_change_maturity: 1,
            ticket_maturity: 16,
            target_time_per_block_secs: 300,
            work_diff_window_size: 144,
        }
    }
}

impl ChainParams for TestParams {
    fn network(&self) -> Network {
        Network::Simnet
    }

    fn coinbase_maturity(&self) -> i32 {
        self.coinbase_maturity
    }

    fn sstx_change_maturity(&self) -> i32 {
        self.sstx_change_maturity
    }

    fn ticket_maturity(&self) -> i32 {
        self.ticket_maturity
    }

    fn target_time_per_block_secs(&self) -> i64 {
        self.target_time_per_block_secs
    }

    fn work_diff_window_size(&self) -> i64 {
        self.work_diff_window_size
    }
}

/// Builds a fresh `TxHash` deterministically from a small integer, so
/// tests can refer to "transaction 3" without hand-writing 32 bytes.
pub fn hash_from_index(index: u32) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[0..4].copy_from_slice(&index.to_be_bytes());
    TxHash::from_bytes(bytes)
}

/// A plain (non-multisig) output paying `amount` to an unremarkable
/// regular script.
pub fn regular_output(amount: Amount) -> Output {
    Output {
        value: amount,
        script: vec![0x76, 0xa9],
    }
}

/// An outpoint referencing `hash`'s `index`th output.
pub fn outpoint(hash: TxHash, index: u32) -> Outpoint {
    Outpoint::new(hash, index)
}
