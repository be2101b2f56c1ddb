/// The network a `Store` is tracking chain state for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    Simnet,
}

/// Chain-consensus constants the balance and pruning logic depend on
/// (spec §1 `ChainParams`).
///
/// All of these are read-only facts about the network, never mutated by
/// the store; a `Store` holds a `&'static` or `Arc`-shared implementor.
pub trait ChainParams {
    /// Which network these parameters describe.
    fn network(&self) -> Network;

    /// Confirmations before a coinbase output matures (spec §4.6 table).
    fn coinbase_maturity(&self) -> i32;

    /// Confirmations before an `SStxChange` output matures (spec §4.6 table).
    fn sstx_change_maturity(&self) -> i32;

    /// Confirmations before a ticket becomes votable.
    fn ticket_maturity(&self) -> i32;

    /// Target seconds between blocks, used to convert the ticket-pruning
    /// horizon (spec §9) from a block-count window into a time budget.
    fn target_time_per_block_secs(&self) -> i64;

    /// The number of blocks in one proof-of-work difficulty adjustment
    /// window; together with `target_time_per_block_secs` this bounds
    /// how old an unmined ticket must be before `Open`'s pruning pass
    /// considers it abandoned (spec §9).
    fn work_diff_window_size(&self) -> i64;
}
