//! Pure key builders for every bucket (spec §6 "Canonical keys").

use wallet_chain::{BlockHash, BlockId, Outpoint, ScriptHash, TxHash};

use crate::records::CreditKey;

/// `height: int32 big-endian` (4 bytes). Block bucket key.
pub fn block_key(height: i32) -> [u8; 4] {
    height.to_be_bytes()
}

pub fn decode_block_key(bytes: &[u8]) -> crate::Result<i32> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| crate::Error::database("malformed block key"))?;
    Ok(i32::from_be_bytes(arr))
}

/// `tx-hash(32) || height(4) || block-hash(32)` (68 bytes). TxRecord
/// bucket key for a mined record.
pub fn tx_record_key(tx_hash: TxHash, block: BlockId) -> [u8; 68] {
    let mut out = [0u8; 68];
    out[0..32].copy_from_slice(tx_hash.as_bytes());
    out[32..36].copy_from_slice(&block.height.to_be_bytes());
    out[36..68].copy_from_slice(block.hash.as_bytes());
    out
}

pub fn decode_tx_record_key(bytes: &[u8]) -> crate::Result<(TxHash, BlockId)> {
    if bytes.len() != 68 {
        return Err(crate::Error::database("malformed tx-record key"));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[0..32]);
    let height = i32::from_be_bytes(bytes[32..36].try_into().unwrap());
    let mut block_hash = [0u8; 32];
    block_hash.copy_from_slice(&bytes[36..68]);
    Ok((
        TxHash::from_bytes(hash),
        BlockId::new(height, BlockHash::from_bytes(block_hash)),
    ))
}

/// TxRecord bucket key for an unmined record: just the tx-hash.
pub fn unmined_tx_record_key(tx_hash: TxHash) -> [u8; 32] {
    *tx_hash.as_bytes()
}

/// Credit bucket key: TxRecord key `|| out-index(4)` (72 bytes).
pub fn credit_key(key: &CreditKey) -> [u8; 72] {
    let mut out = [0u8; 72];
    out[0..68].copy_from_slice(&tx_record_key(key.tx_hash, key.block));
    out[68..72].copy_from_slice(&key.index.to_be_bytes());
    out
}

pub fn decode_credit_key(bytes: &[u8]) -> crate::Result<CreditKey> {
    if bytes.len() != 72 {
        return Err(crate::Error::database("malformed credit key"));
    }
    let (tx_hash, block) = decode_tx_record_key(&bytes[0..68])?;
    let index = u32::from_be_bytes(bytes[68..72].try_into().unwrap());
    Ok(CreditKey {
        tx_hash,
        block,
        index,
    })
}

/// Outpoint key: `tx-hash(32) || out-index(4)` (36 bytes). Used for the
/// Unspent, UnminedCredits, UnminedInputs, and Multisig buckets.
pub fn outpoint_key(outpoint: Outpoint) -> [u8; 36] {
    let mut out = [0u8; 36];
    out[0..32].copy_from_slice(outpoint.hash.as_bytes());
    out[32..36].copy_from_slice(&outpoint.index.to_be_bytes());
    out
}

pub fn decode_outpoint_key(bytes: &[u8]) -> crate::Result<Outpoint> {
    if bytes.len() != 36 {
        return Err(crate::Error::database("malformed outpoint key"));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[0..32]);
    let index = u32::from_be_bytes(bytes[32..36].try_into().unwrap());
    Ok(Outpoint::new(TxHash::from_bytes(hash), index))
}

/// Script bucket key: the 20-byte RIPEMD-160 script hash.
pub fn script_key(hash: ScriptHash) -> [u8; 20] {
    *hash.as_bytes()
}

pub fn decode_script_key(bytes: &[u8]) -> crate::Result<ScriptHash> {
    let arr: [u8; 20] = bytes
        .try_into()
        .map_err(|_| crate::Error::database("malformed script key"))?;
    Ok(ScriptHash::from_bytes(arr))
}
