//! Property tests for the invariants spec §8 calls out: random sequences
//! of insert/spend/rollback must leave `UnspentIndex` and `MinedBalance`
//! self-consistent (I1, I2) no matter what order they land in.
//!
//! Modeled after the teacher's own `proptest!` blocks
//! (`zebra_chain::transaction::tests::prop`): a small `Arbitrary`-derived
//! op enum drives the store directly rather than building an oracle
//! model, since I1/I2 are properties the store must hold of *itself*.

use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::Config;

use wallet_chain::{Amount, BlockHash, BlockId, TxType};
use wallet_state::{Config as StoreConfig, Store};
use wallet_test::{hash_from_index, outpoint, MockCodec, MockOracle, MockTxBuilder, TestParams};

#[derive(Clone, Debug)]
enum Op {
    /// Mines a fresh one-output transaction at the next height and
    /// credits its output to the wallet.
    Insert { amount: i64 },
    /// Spends the `idx`-th outpoint this run has ever created (modulo
    /// however many exist), whether or not it is still unspent — an
    /// already-spent or rolled-back target is a no-op double-spend
    /// attempt the store must reject or ignore gracefully, not a bug.
    Spend { idx: usize, amount: i64 },
    /// Rolls the chain back by `depth` blocks from the current tip.
    Rollback { depth: u32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..1000).prop_map(|amount| Op::Insert { amount }),
        (0usize..16, 1i64..1000).prop_map(|(idx, amount)| Op::Spend { idx, amount }),
        (0u32..5).prop_map(|depth| Op::Rollback { depth }),
    ]
}

fn block_id(height: i32) -> BlockId {
    let mut hash = [0u8; 32];
    hash[0..4].copy_from_slice(&height.to_be_bytes());
    BlockId::new(height, BlockHash::from_bytes(hash))
}

/// Mines `tx_bytes` into a fresh block at `height`, flagging "parent
/// valid" (spec §4.5) so a later rollback actually has a vote bit to
/// detach the previous block's regular transactions through — without
/// this, no regular transaction would ever be reachable by `Rollback`.
fn mine(store: &Store<TestParams>, codec: &MockCodec, height: i32, tx_bytes: &[u8]) {
    store
        .insert_block(height, block_id(height).hash, 0, 1, vec![])
        .unwrap();
    store
        .insert_tx(codec, tx_bytes, TxType::Regular, 0, Some(block_id(height)))
        .unwrap();
}

/// Asserts I1 (`UnspentIndex` bijective with unspent mined credits) and
/// I2 (`MinedBalance` law) against a frozen [`wallet_state::DatabaseDump`](wallet_state)
/// of `store` as of `tip`.
fn assert_invariants(store: &Store<TestParams>, tip: i32) {
    let dump = store.database_dump(tip.max(0)).expect("dump must succeed");

    let unspent_mined_credits: std::collections::HashSet<_> = dump
        .credits
        .iter()
        .filter(|(_, credit)| credit.is_unspent())
        .map(|(key, _)| key.outpoint())
        .collect();
    let unspent_index_keys: std::collections::HashSet<_> =
        dump.unspent.iter().map(|(outpoint, _)| *outpoint).collect();
    assert_eq!(
        unspent_mined_credits, unspent_index_keys,
        "I1 violated: UnspentIndex must exactly match unspent mined credits"
    );

    let expected_mined_balance: Amount = dump
        .credits
        .iter()
        .filter(|(_, credit)| credit.is_unspent() && credit.op_code.counts_toward_mined_balance())
        .map(|(_, credit)| credit.amount)
        .sum();
    assert_eq!(
        dump.mined_balance, expected_mined_balance,
        "I2 violated: MinedBalance must equal the sum of unspent, non-SStx mined credits"
    );
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn invariants_hold_after_any_op_sequence(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let store = Store::create(&StoreConfig::ephemeral(), Arc::new(TestParams::default())).unwrap();
        let codec = MockCodec;
        let oracle = MockOracle;

        let mut created = Vec::new();
        let mut height: i32 = 0;
        let mut next_tx_id: u32 = 1;

        for op in ops {
            match op {
                Op::Insert { amount } => {
                    height += 1;
                    let hash = hash_from_index(next_tx_id);
                    next_tx_id += 1;
                    let (_, bytes) = MockTxBuilder::new(hash).output(Amount(amount)).build();
                    mine(&store, &codec, height, &bytes);
                    store
                        .add_credit(&codec, &oracle, &bytes, Some(block_id(height)), 0, false)
                        .unwrap();
                    created.push(outpoint(hash, 0));
                }
                Op::Spend { idx, amount } => {
                    if created.is_empty() {
                        continue;
                    }
                    height += 1;
                    let target = created[idx % created.len()];
                    let hash = hash_from_index(next_tx_id);
                    next_tx_id += 1;
                    let (_, bytes) = MockTxBuilder::new(hash)
                        .input(target)
                        .output(Amount(amount))
                        .build();
                    mine(&store, &codec, height, &bytes);
                }
                Op::Rollback { depth } => {
                    let target = (height - depth as i32).max(0);
                    store.rollback(&codec, target).unwrap();
                    height = target.saturating_sub(1).max(0);
                }
            }

            assert_invariants(&store, height.max(0));
        }
    }
}
