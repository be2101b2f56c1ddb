use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::hash::{BlockHash, TxHash};

/// A particular transaction output reference: `(tx-hash, output-index)`.
///
/// Globally unique across the chain's history. Spec §3/§6.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Outpoint {
    /// The transaction that contains the output being referenced.
    pub hash: TxHash,
    /// Which output of that transaction; the first output is 0.
    pub index: u32,
}

impl Outpoint {
    pub const fn new(hash: TxHash, index: u32) -> Self {
        Outpoint { hash, index }
    }
}

/// The identity of a mined block: its height and hash.
///
/// Blocks are ordered by height (spec §3). The hash is carried alongside
/// the height because a `TxRecord`'s identity when mined is
/// `(tx-hash, block)`, not `(tx-hash, height)` — a reorg can replace the
/// block at a given height with a different hash.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct BlockId {
    pub height: i32,
    pub hash: BlockHash,
}

impl BlockId {
    pub const fn new(height: i32, hash: BlockHash) -> Self {
        BlockId { height, hash }
    }
}
