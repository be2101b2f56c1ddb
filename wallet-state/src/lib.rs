//! The wallet transaction store: the durable subsystem that records every
//! transaction relevant to a wallet, tracks which outputs are spendable,
//! maintains derived balances, and handles blockchain reorganizations.
//!
//! Built on [`sled`], following the same tree-per-bucket layout as
//! `zebra_state`'s sled-backed finalized state: every bucket is a
//! `sled::Tree` opened off one `sled::Db`, keyed and valued with the
//! fixed byte layouts in [`keyspace`].
//!
//! [`Store`] is the single entry point. Every public method acquires its
//! internal mutex for the duration of the call (see the module docs on
//! [`store`] for why) and either commits all of its writes atomically or
//! leaves prior state untouched.

#![allow(clippy::unit_arg)]

mod balance;
mod confirm;
mod config;
mod error;
mod index;
mod insert;
pub mod keyspace;
mod prune;
mod records;
mod repair;
mod rollback;
mod store;
mod txn;

pub use balance::{BalanceMode, UnspentOutput};
pub use config::Config;
pub use error::Error;
pub use records::{
    BlockRecord, CreditKey, CreditRecord, DebitRecord, MultisigCredit, MultisigOutRecord,
    TxRecord, UnminedCreditRecord, UnspentRecord,
};
pub use repair::DatabaseDump;
pub use store::Store;

/// The result type returned by every fallible `Store` operation.
pub type Result<T> = std::result::Result<T, Error>;
