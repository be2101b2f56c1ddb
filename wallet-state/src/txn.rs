//! The staged-transaction handle every mutating `Store` call runs
//! inside.
//!
//! `sled`'s multi-tree `Transactional` trait only covers small fixed
//! tuples of trees, and a single call here can touch up to eleven
//! buckets (Block, TxRecords, Credits, Unspent, Debits, Unmined,
//! UnminedCredits, UnminedInputs, Scripts, Multisig, MultisigUsp) plus
//! the MinedBalance scalar. Instead, every primitive in this crate
//! writes through a [`Txn`], which stages each bucket's mutations in
//! memory; [`Txn::commit`] is the only place that touches disk, and it
//! only runs once the whole call chain above it has returned `Ok`.
//!
//! Because `Store` holds its `Inner` behind a single mutex for the
//! duration of every public call (spec §5), at most one `Txn` is ever
//! live at a time — so staging everything before the first disk write
//! gives the "either commits atomically or leaves no observable partial
//! effect" property spec §5/§7 require, without needing `sled` itself to
//! support an eleven-way atomic commit.

use std::collections::BTreeMap;

use crate::store::{TreeId, Trees};
use crate::Error;

#[derive(Default)]
struct Staged {
    // `None` means "delete this key".
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// A staged, not-yet-committed set of writes across every bucket.
pub(crate) struct Txn<'a> {
    trees: &'a Trees,
    staged: [Staged; TreeId::COUNT],
}

impl<'a> Txn<'a> {
    pub(crate) fn new(trees: &'a Trees) -> Self {
        Txn {
            trees,
            staged: Default::default(),
        }
    }

    /// Reads `key` from `tree`, preferring this transaction's own
    /// not-yet-committed writes over what's already on disk.
    pub(crate) fn get(&self, tree: TreeId, key: &[u8]) -> crate::Result<Option<Vec<u8>>> {
        if let Some(staged) = self.staged[tree as usize].writes.get(key) {
            return Ok(staged.clone());
        }
        Ok(self
            .trees
            .get(tree)
            .get(key)
            .map_err(Error::from)?
            .map(|ivec| ivec.to_vec()))
    }

    pub(crate) fn put(&mut self, tree: TreeId, key: &[u8], value: Vec<u8>) {
        self.staged[tree as usize]
            .writes
            .insert(key.to_vec(), Some(value));
    }

    pub(crate) fn delete(&mut self, tree: TreeId, key: &[u8]) {
        self.staged[tree as usize].writes.insert(key.to_vec(), None);
    }

    /// Iterates live (non-staged-deleted) `(key, value)` pairs of `tree`
    /// whose key starts with `prefix`, merging in this transaction's own
    /// staged writes. Used by the balance engine's reverse block scan
    /// and by `RepairInconsistencies`'s walk of the whole `Unspent`
    /// bucket (an empty prefix).
    pub(crate) fn scan_prefix(
        &self,
        tree: TreeId,
        prefix: &[u8],
    ) -> crate::Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = BTreeMap::new();
        for item in self.trees.get(tree).scan_prefix(prefix) {
            let (k, v) = item.map_err(Error::from)?;
            out.insert(k.to_vec(), Some(v.to_vec()));
        }
        for (k, v) in &self.staged[tree as usize].writes {
            if k.starts_with(prefix) {
                out.insert(k.clone(), v.clone());
            }
        }
        Ok(out
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect())
    }

    /// Flushes every staged write to its tree. Only called once the
    /// whole operation that created this `Txn` has succeeded.
    pub(crate) fn commit(self) -> crate::Result<()> {
        for (idx, staged) in self.staged.into_iter().enumerate() {
            if staged.writes.is_empty() {
                continue;
            }
            let tree = self.trees.get(TreeId::from_index(idx));
            let mut batch = sled::Batch::default();
            for (key, value) in staged.writes {
                match value {
                    Some(value) => batch.insert(key, value),
                    None => batch.remove(key),
                }
            }
            tree.apply_batch(batch).map_err(Error::from)?;
        }
        Ok(())
    }
}
