use crate::hash::ScriptHash;

/// The classification of an output script, as produced by a node's
/// script interpreter (spec §1 `ScriptOracle`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScriptClass {
    /// An ordinary (non-stake) output script.
    Regular,
    /// A ticket-submission (SStx) output script.
    StakeSubmission,
    /// A vote (SSGen) output script.
    StakeGeneration,
    /// A revocation (SSRtx) output script.
    StakeRevocation,
    /// Change returned by a ticket purchase.
    StakeChange,
    /// A pay-to-script-hash output, stake class notwithstanding.
    ScriptHash,
}

/// The `(m, n, script-hash)` triple a P2SH multisig output carries, as
/// extracted by the `ScriptOracle` (spec §1, §4.3 `AddMultisigOut`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MultisigInfo {
    pub required: u8,
    pub total: u8,
    pub script_hash: ScriptHash,
}

/// Classifies output scripts and extracts multisig metadata.
///
/// Out of scope per spec §1: a real implementation runs an actual script
/// interpreter. The store only ever consumes the classification, never
/// the script bytes themselves (those are opaque and stored verbatim in
/// the `Scripts` bucket, keyed by their own hash).
pub trait ScriptOracle {
    /// Classifies `script` using chain consensus rules.
    fn classify(&self, script: &[u8]) -> ScriptClass;

    /// If `script` is a (possibly stake-wrapped) pay-to-script-hash
    /// script whose redeem script is a multisig script, extracts its
    /// `(m, n, script-hash)`. Returns `None` otherwise.
    fn multisig_info(&self, script: &[u8]) -> Option<MultisigInfo>;
}
