//! `Store`: the single logical component spec §2 describes, and its
//! sled-backed bucket layout.
//!
//! This mirrors the shape of the teacher's `FinalizedState` (`zebra_state::sled_state`):
//! one struct owning a set of named `sled::Tree`s opened off one
//! `sled::Db`, with synchronous methods doing all of the work inline
//! rather than returning futures — spec §5 calls for a single exclusive
//! lock and no cooperative suspension points, so there is no async
//! `Service` wrapper here the way `zebra_state` has one.

use std::sync::{Arc, Mutex};

use wallet_chain::{Amount, BlockHash, ChainParams, ScriptHash, TxCodec, TxHash};

use crate::config::Config;
use crate::index;
use crate::keyspace::{self, keys};
use crate::records::BlockRecord;
use crate::txn::Txn;
use crate::Error;

/// The fourteen top-level buckets of spec §6, minus the two that fold
/// into one (`MultisigUsp` is its own tree; `minedBalance` lives in the
/// shared metadata tree alongside room for future scalars).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum TreeId {
    Blocks = 0,
    TxRecords = 1,
    Credits = 2,
    Unspent = 3,
    Debits = 4,
    Unmined = 5,
    UnminedCredits = 6,
    UnminedInputs = 7,
    Scripts = 8,
    Multisig = 9,
    MultisigUsp = 10,
    Meta = 11,
}

impl TreeId {
    pub(crate) const COUNT: usize = 12;

    pub(crate) fn from_index(idx: usize) -> TreeId {
        match idx {
            0 => TreeId::Blocks,
            1 => TreeId::TxRecords,
            2 => TreeId::Credits,
            3 => TreeId::Unspent,
            4 => TreeId::Debits,
            5 => TreeId::Unmined,
            6 => TreeId::UnminedCredits,
            7 => TreeId::UnminedInputs,
            8 => TreeId::Scripts,
            9 => TreeId::Multisig,
            10 => TreeId::MultisigUsp,
            11 => TreeId::Meta,
            _ => unreachable!("TreeId::COUNT is out of sync with from_index"),
        }
    }
}

/// The key the single `minedBalance` scalar is stored under, within the
/// shared metadata tree.
pub(crate) const MINED_BALANCE_KEY: &[u8] = b"mined_balance";

pub(crate) struct Trees {
    blocks: sled::Tree,
    tx_records: sled::Tree,
    credits: sled::Tree,
    unspent: sled::Tree,
    debits: sled::Tree,
    unmined: sled::Tree,
    unmined_credits: sled::Tree,
    unmined_inputs: sled::Tree,
    scripts: sled::Tree,
    multisig: sled::Tree,
    multisig_usp: sled::Tree,
    meta: sled::Tree,
}

impl Trees {
    fn open(db: &sled::Db) -> crate::Result<Trees> {
        Ok(Trees {
            blocks: db.open_tree(b"blocks")?,
            tx_records: db.open_tree(b"txRecords")?,
            credits: db.open_tree(b"credits")?,
            unspent: db.open_tree(b"unspent")?,
            debits: db.open_tree(b"debits")?,
            unmined: db.open_tree(b"unmined")?,
            unmined_credits: db.open_tree(b"unminedCredits")?,
            unmined_inputs: db.open_tree(b"unminedInputs")?,
            scripts: db.open_tree(b"scripts")?,
            multisig: db.open_tree(b"multisig")?,
            multisig_usp: db.open_tree(b"multisigUsp")?,
            meta: db.open_tree(b"meta")?,
        })
    }

    pub(crate) fn get(&self, id: TreeId) -> &sled::Tree {
        match id {
            TreeId::Blocks => &self.blocks,
            TreeId::TxRecords => &self.tx_records,
            TreeId::Credits => &self.credits,
            TreeId::Unspent => &self.unspent,
            TreeId::Debits => &self.debits,
            TreeId::Unmined => &self.unmined,
            TreeId::UnminedCredits => &self.unmined_credits,
            TreeId::UnminedInputs => &self.unmined_inputs,
            TreeId::Scripts => &self.scripts,
            TreeId::Multisig => &self.multisig,
            TreeId::MultisigUsp => &self.multisig_usp,
            TreeId::Meta => &self.meta,
        }
    }

    fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.tx_records.is_empty()
            && self.credits.is_empty()
            && self.unspent.is_empty()
            && self.debits.is_empty()
            && self.unmined.is_empty()
            && self.unmined_credits.is_empty()
            && self.unmined_inputs.is_empty()
            && self.scripts.is_empty()
            && self.multisig.is_empty()
            && self.multisig_usp.is_empty()
            && self.meta.is_empty()
    }
}

pub(crate) struct Inner<P> {
    pub(crate) db: sled::Db,
    pub(crate) trees: Trees,
    pub(crate) params: Arc<P>,
}

/// The wallet transaction store (spec §2 `Store`).
///
/// A `Store` owns only its mutex and a pointer to [`ChainParams`]
/// (spec §5 "Shared resources"); the `sled::Db` it opens is this
/// process's own, but the durable contents belong to the caller's
/// namespace on disk. Every public method takes the mutex for its full
/// duration — reads and writes never run concurrently with each other
/// (spec §5 "Scheduling model").
pub struct Store<P> {
    pub(crate) inner: Mutex<Option<Inner<P>>>,
}

impl<P: ChainParams> Store<P> {
    /// Initializes a fresh namespace. Fails with [`Error::AlreadyExists`]
    /// if the namespace already has data in it.
    pub fn create(config: &Config, params: Arc<P>) -> crate::Result<Store<P>> {
        let db = config.sled_config().open()?;
        let trees = Trees::open(&db)?;
        if !trees.is_empty() {
            return Err(Error::AlreadyExists);
        }
        trees
            .meta
            .insert(MINED_BALANCE_KEY, &keyspace::encode_mined_balance(Amount::ZERO)[..])?;
        db.flush()?;
        tracing::debug!("created wallet transaction store");
        Ok(Store {
            inner: Mutex::new(Some(Inner { db, trees, params })),
        })
    }

    /// Opens an existing namespace, performing idempotent schema
    /// upgrade (there is currently only one schema version, so this is
    /// a no-op) and, if `prune_tickets` is given, sweeping unmined
    /// tickets abandoned as of that wall-clock time (spec §5 Lifecycle,
    /// §9 "Ticket pruning"). The codec is only needed to replay the
    /// serialized form of whatever gets pruned; passing `None` skips
    /// the sweep entirely.
    pub fn open<C: TxCodec>(
        config: &Config,
        params: Arc<P>,
        prune_tickets: Option<(&C, i64)>,
    ) -> crate::Result<Store<P>> {
        let db = config.sled_config().open()?;
        let trees = Trees::open(&db)?;
        let store = Store {
            inner: Mutex::new(Some(Inner { db, trees, params })),
        };
        if let Some((codec, now)) = prune_tickets {
            store.prune_old_tickets(codec, now)?;
        }
        tracing::debug!("opened wallet transaction store");
        Ok(store)
    }

    /// Closes the store. Subsequent calls fail with
    /// [`Error::IsClosed`]. Does not cancel any in-flight call — it
    /// waits for the mutex like every other method (spec §5 Lifecycle).
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if let Some(inner) = guard.take() {
            let _ = inner.db.flush();
        }
        tracing::debug!("closed wallet transaction store");
    }

    pub(crate) fn with_inner<T>(
        &self,
        f: impl FnOnce(&Inner<P>) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        match guard.as_ref() {
            Some(inner) => f(inner),
            None => Err(Error::IsClosed),
        }
    }

    /// Runs `f` inside a single staged update transaction (spec §5
    /// "every public mutation wraps its work in a single KV update
    /// transaction"). `f` returning `Err` leaves every bucket
    /// untouched; `f` returning `Ok` commits every staged write before
    /// this method returns.
    pub(crate) fn scoped_update<T>(
        &self,
        f: impl FnOnce(&mut Txn, &P) -> crate::Result<T>,
    ) -> crate::Result<T> {
        self.with_inner(|inner| {
            let mut txn = Txn::new(&inner.trees);
            let result = f(&mut txn, &inner.params)?;
            txn.commit()?;
            Ok(result)
        })
    }

    /// Runs `f` inside a single read-only view transaction (spec §5
    /// "every public query wraps its work in a single KV read
    /// transaction").
    pub(crate) fn scoped_view<T>(&self, f: impl FnOnce(&Txn, &P) -> crate::Result<T>) -> crate::Result<T> {
        self.with_inner(|inner| {
            let txn = Txn::new(&inner.trees);
            f(&txn, &inner.params)
        })
    }

    /// Records a mined block's header metadata and the hashes of the
    /// transactions mined within it (spec §3 invariant 4, §6
    /// `InsertBlock`). Called once per block, ahead of `InsertTx` for
    /// whatever transactions of that block the wallet cares about.
    pub fn insert_block(
        &self,
        height: i32,
        hash: BlockHash,
        time: i64,
        vote_bits: u16,
        tx_hashes: Vec<TxHash>,
    ) -> crate::Result<()> {
        self.scoped_update(|txn, _params| {
            index::put_block(
                txn,
                height,
                &BlockRecord {
                    hash,
                    time,
                    vote_bits,
                    tx_hashes,
                },
            );
            Ok(())
        })
    }

    /// The hash of the block mined at `height`, if this store has
    /// recorded one.
    pub fn get_block_hash(&self, height: i32) -> crate::Result<Option<BlockHash>> {
        self.scoped_view(|txn, _params| Ok(index::get_block(txn, height)?.map(|b| b.hash)))
    }

    /// Stores a redeem script (typically a multisig script backing a
    /// P2SH output) under its own hash, so later `GetMultisigCredit`-style
    /// lookups can recover its bytes (spec §6 `InsertTxScript`). The hash
    /// is supplied by the caller rather than computed here — deriving a
    /// RIPEMD-160 script hash is a `ScriptOracle` concern, not this
    /// store's.
    pub fn insert_tx_script(&self, hash: ScriptHash, script: Vec<u8>) -> crate::Result<()> {
        self.scoped_update(|txn, _params| {
            index::put_script(txn, hash, script);
            Ok(())
        })
    }

    /// The script previously stored under `hash`, if any.
    pub fn get_tx_script(&self, hash: ScriptHash) -> crate::Result<Option<Vec<u8>>> {
        self.scoped_view(|txn, _params| index::get_script(txn, hash))
    }

    /// Every `(hash, script)` pair this store currently holds.
    pub fn stored_tx_scripts(&self) -> crate::Result<Vec<(ScriptHash, Vec<u8>)>> {
        self.scoped_view(|txn, _params| {
            let mut out = Vec::new();
            for (key, value) in txn.scan_prefix(TreeId::Scripts, &[])? {
                out.push((keys::decode_script_key(&key)?, value));
            }
            Ok(out)
        })
    }
}
