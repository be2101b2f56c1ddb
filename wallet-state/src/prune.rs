//! Ticket pruning at `Open` (spec §9): unmined tickets nobody ever
//! confirmed eventually stop being worth tracking.

use wallet_chain::{ChainParams, TxCodec, TxHash, TxType};

use crate::rollback::remove_conflict;
use crate::store::{Store, TreeId};
use crate::txn::Txn;

impl<P: ChainParams> Store<P> {
    /// Walks `Unmined` for `SStx` records older than
    /// `targetTimePerBlock × workDiffWindowSize` seconds as of `now`,
    /// and unwinds each one — newest first, so an `SStxChange` chain
    /// built on top of an older ticket purchase unwinds before the
    /// ticket it depends on.
    ///
    /// A crash partway through can leave phantom `UnminedInput`
    /// entries behind; `RepairInconsistencies` is expected to tolerate
    /// that (spec §9), so this makes no attempt at its own recovery.
    pub(crate) fn prune_old_tickets<C: TxCodec>(&self, codec: &C, now: i64) -> crate::Result<()> {
        self.scoped_update(|txn, params| {
            let horizon = params.target_time_per_block_secs() * params.work_diff_window_size();
            let cutoff = now - horizon;

            let mut stale = collect_stale_tickets(txn, cutoff)?;
            stale.sort_unstable_by(|a, b| b.1.cmp(&a.1));

            for (hash, _received) in stale {
                remove_conflict(txn, codec, hash)?;
            }
            Ok(())
        })
    }
}

fn collect_stale_tickets(txn: &Txn, cutoff: i64) -> crate::Result<Vec<(TxHash, i64)>> {
    let mut stale = Vec::new();
    for (key, value) in txn.scan_prefix(TreeId::Unmined, &[])? {
        let arr: [u8; 32] = key
            .as_slice()
            .try_into()
            .map_err(|_| crate::Error::database("malformed unmined tx-record key"))?;
        let hash = TxHash::from_bytes(arr);
        let record = crate::keyspace::codec::decode_tx_record(&value)?;
        if record.tx_type == TxType::SStx && record.received < cutoff {
            stale.push((hash, record.received));
        }
    }
    Ok(stale)
}
