//! The six literal end-to-end scenarios: credit/spend within a block,
//! reorg undoing a spend, tickets never touching `MinedBalance`,
//! coinbase immaturity, a reorg that cleans up a mem-pool descendant of
//! a vanished coinbase output, and greedy coin selection.

use std::sync::Arc;

use wallet_chain::{Amount, BlockHash, BlockId, ScriptClass, TxType};
use wallet_state::{BalanceMode, Config, Store};
use wallet_test::{hash_from_index, outpoint, MockCodec, MockOracle, MockTxBuilder, TestParams};

fn store() -> Store<TestParams> {
    Store::create(&Config::ephemeral(), Arc::new(TestParams::default())).expect("fresh store")
}

fn block(height: i32) -> BlockId {
    let mut hash = [0u8; 32];
    hash[0..4].copy_from_slice(&height.to_be_bytes());
    BlockId::new(height, BlockHash::from_bytes(hash))
}

#[test]
fn credit_and_spend_in_same_block() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    let hash_a = hash_from_index(1);
    let (_, bytes_a) = MockTxBuilder::new(hash_a).output(Amount(100)).build();
    store
        .insert_tx(&codec, &bytes_a, TxType::Regular, 0, Some(block(100)))
        .unwrap();
    store
        .add_credit(&codec, &oracle, &bytes_a, Some(block(100)), 0, false)
        .unwrap();

    let dump = store.database_dump(100).unwrap();
    assert_eq!(dump.mined_balance, Amount(100));
    assert_eq!(dump.unspent.len(), 1);
    assert_eq!(dump.unspent[0].0, outpoint(hash_a, 0));

    let hash_b = hash_from_index(2);
    let (_, bytes_b) = MockTxBuilder::new(hash_b)
        .input(outpoint(hash_a, 0))
        .output(Amount(100))
        .build();
    store
        .insert_tx(&codec, &bytes_b, TxType::Regular, 1, Some(block(101)))
        .unwrap();

    let dump = store.database_dump(101).unwrap();
    assert_eq!(dump.mined_balance, Amount(0));
    assert_eq!(dump.debits.len(), 1);
    assert_eq!(dump.debits[0].amount, Amount(100));
    assert!(dump.unspent.is_empty());
    let (_, credit_a) = dump
        .credits
        .iter()
        .find(|(key, _)| key.tx_hash == hash_a)
        .expect("credit A:0 still on record");
    assert!(!credit_a.is_unspent());
}

#[test]
fn reorg_undoes_spend() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    let hash_a = hash_from_index(1);
    let (_, bytes_a) = MockTxBuilder::new(hash_a).output(Amount(100)).build();
    store
        .insert_tx(&codec, &bytes_a, TxType::Regular, 0, Some(block(100)))
        .unwrap();
    store
        .add_credit(&codec, &oracle, &bytes_a, Some(block(100)), 0, false)
        .unwrap();

    let hash_b = hash_from_index(2);
    let (_, bytes_b) = MockTxBuilder::new(hash_b)
        .input(outpoint(hash_a, 0))
        .output(Amount(100))
        .build();
    store
        .insert_tx(&codec, &bytes_b, TxType::Regular, 1, Some(block(101)))
        .unwrap();

    // A regular transaction's block only becomes detachable once its
    // child confirms it via the parent-valid vote bit (spec §4.5).
    store.insert_block(102, block(102).hash, 2, 1, vec![]).unwrap();

    store.rollback(&codec, 101).unwrap();

    let dump = store.database_dump(100).unwrap();
    assert!(dump.debits.is_empty());
    assert_eq!(dump.mined_balance, Amount(100));
    assert_eq!(dump.unspent.len(), 1);
    assert_eq!(dump.unspent[0].0, outpoint(hash_a, 0));
    let (_, credit_a) = dump
        .credits
        .iter()
        .find(|(key, _)| key.tx_hash == hash_a)
        .expect("credit A:0 restored");
    assert!(credit_a.is_unspent());

    assert!(dump.unmined_tx_records.iter().any(|(h, _)| *h == hash_b));
    assert!(dump
        .unmined_inputs
        .iter()
        .any(|(op, spender)| *op == outpoint(hash_a, 0) && *spender == hash_b));
}

#[test]
fn ticket_never_counted() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    let hash_t = hash_from_index(1);
    let (_, bytes_t) = MockTxBuilder::new(hash_t)
        .stake_output(Amount(50), ScriptClass::StakeSubmission)
        .build();
    store
        .insert_tx(&codec, &bytes_t, TxType::SStx, 0, Some(block(50)))
        .unwrap();
    store
        .add_credit(&codec, &oracle, &bytes_t, Some(block(50)), 0, false)
        .unwrap();

    assert_eq!(store.balance(BalanceMode::All, 1, 50).unwrap(), Amount(50));
    assert_eq!(store.balance(BalanceMode::LockedStake, 1, 50).unwrap(), Amount(50));
    assert_eq!(store.balance(BalanceMode::Spendable, 1, 50).unwrap(), Amount(0));
}

#[test]
fn coinbase_immaturity() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    let hash_c = hash_from_index(1);
    let (_, bytes_c) = wallet_test::mock_coinbase(hash_c, Amount(50));
    store
        .insert_tx(&codec, &bytes_c, TxType::Regular, 0, Some(block(200)))
        .unwrap();
    store
        .add_credit(&codec, &oracle, &bytes_c, Some(block(200)), 0, false)
        .unwrap();

    // TestParams::default() sets coinbase_maturity = 16.
    assert_eq!(store.balance(BalanceMode::Spendable, 1, 210).unwrap(), Amount(0));
    assert_eq!(store.balance(BalanceMode::Spendable, 1, 216).unwrap(), Amount(50));
}

#[test]
fn coinbase_reorg_cleans_mempool_descendant() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    let hash_c = hash_from_index(1);
    let (_, bytes_c) = wallet_test::mock_coinbase(hash_c, Amount(50));
    store
        .insert_tx(&codec, &bytes_c, TxType::Regular, 0, Some(block(200)))
        .unwrap();
    store
        .add_credit(&codec, &oracle, &bytes_c, Some(block(200)), 0, false)
        .unwrap();

    let hash_m = hash_from_index(2);
    let (_, bytes_m) = wallet_test::mock_tx(hash_m, outpoint(hash_c, 0), Amount(50));
    store.insert_tx(&codec, &bytes_m, TxType::Regular, 1, None).unwrap();

    let dump = store.database_dump(200).unwrap();
    assert!(dump.unmined_tx_records.iter().any(|(h, _)| *h == hash_m));

    store.insert_block(201, block(201).hash, 2, 1, vec![]).unwrap();
    store.rollback(&codec, 200).unwrap();

    let dump = store.database_dump(200).unwrap();
    assert!(dump.credits.iter().all(|(key, _)| key.tx_hash != hash_c));
    assert!(!dump.unmined_tx_records.iter().any(|(h, _)| *h == hash_m));
    assert!(!dump.unmined_inputs.iter().any(|(op, _)| *op == outpoint(hash_c, 0)));
}

#[test]
fn coin_selection_is_greedy_descending() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    for (i, amount) in [3i64, 7, 2, 5].into_iter().enumerate() {
        let hash = hash_from_index(i as u32 + 1);
        let (_, bytes) = MockTxBuilder::new(hash).output(Amount(amount)).build();
        let height = i as i32 + 1;
        store
            .insert_tx(&codec, &bytes, TxType::Regular, 0, Some(block(height)))
            .unwrap();
        store
            .add_credit(&codec, &oracle, &bytes, Some(block(height)), 0, false)
            .unwrap();
    }

    let selected = store.unspent_outputs_for_amount(Amount(8), 100, 1).unwrap();
    let amounts: Vec<i64> = selected.iter().map(|u| u.amount.0).collect();
    assert_eq!(amounts, vec![7, 3]);
    let total: i64 = amounts.iter().sum();
    assert!(total >= 8);

    let none = store.unspent_outputs_for_amount(Amount(20), 100, 1).unwrap();
    assert!(none.is_empty());
}

#[test]
fn spendable_at_zero_conf_includes_mempool_credit() {
    let store = store();
    let codec = MockCodec;
    let oracle = MockOracle;

    let hash_a = hash_from_index(1);
    let (_, bytes_a) = MockTxBuilder::new(hash_a).output(Amount(100)).build();
    store
        .insert_tx(&codec, &bytes_a, TxType::Regular, 0, Some(block(100)))
        .unwrap();
    store
        .add_credit(&codec, &oracle, &bytes_a, Some(block(100)), 0, false)
        .unwrap();

    let hash_m = hash_from_index(2);
    let (_, bytes_m) = MockTxBuilder::new(hash_m).output(Amount(30)).build();
    store.insert_tx(&codec, &bytes_m, TxType::Regular, 1, None).unwrap();
    store.add_credit(&codec, &oracle, &bytes_m, None, 0, false).unwrap();

    assert_eq!(store.balance(BalanceMode::Spendable, 1, 100).unwrap(), Amount(100));
    assert_eq!(store.balance(BalanceMode::Spendable, 0, 100).unwrap(), Amount(130));
}
