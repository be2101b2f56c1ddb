//! Types and traits shared between a wallet's transaction store and the
//! node/peer client that feeds it.
//!
//! This crate is deliberately thin: it defines the *seam* the storage
//! engine (`wallet-state`) is written against, not a real transaction
//! parser, script interpreter, or chain-parameter table. A concrete node
//! integration implements [`TxCodec`], [`ScriptOracle`], and
//! [`ChainParams`] against its own transaction and script types.

#![allow(clippy::unit_arg)]

mod amount;
mod hash;
mod outpoint;
mod params;
mod script;
mod tx;

pub mod codec;

pub use amount::Amount;
pub use hash::{BlockHash, ScriptHash, TxHash};
pub use outpoint::{BlockId, Outpoint};
pub use params::{ChainParams, Network};
pub use script::{MultisigInfo, ScriptClass, ScriptOracle};
pub use tx::{OpCode, Spender, TxType};

pub use codec::{Input, Output, TxCodec};
