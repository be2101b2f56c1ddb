//! Pure value (de)serializers for every bucket (spec §6 "Canonical
//! values").

use wallet_chain::{Amount, BlockHash, BlockId, OpCode, ScriptHash, Spender, TxHash, TxType};

use crate::records::{
    BlockRecord, CreditKey, CreditRecord, DebitRecord, MultisigOutRecord, TxRecord,
    UnminedCreditRecord, UnspentRecord,
};

use super::keys::{decode_credit_key, credit_key};

const SPENDER_INDEX_UNSPENT: u32 = 0xFFFF_FFFF;

fn op_code_tag(op: OpCode) -> u8 {
    match op {
        OpCode::NonStake => 0,
        OpCode::SStx => 1,
        OpCode::SSGen => 2,
        OpCode::SSRtx => 3,
        OpCode::SStxChange => 4,
    }
}

fn op_code_from_tag(tag: u8) -> crate::Result<OpCode> {
    Ok(match tag {
        0 => OpCode::NonStake,
        1 => OpCode::SStx,
        2 => OpCode::SSGen,
        3 => OpCode::SSRtx,
        4 => OpCode::SStxChange,
        _ => return Err(crate::Error::database("unknown op-code tag")),
    })
}

fn tx_type_tag(t: TxType) -> u8 {
    match t {
        TxType::Regular => 0,
        TxType::SStx => 1,
        TxType::SSGen => 2,
        TxType::SSRtx => 3,
    }
}

fn tx_type_from_tag(tag: u8) -> crate::Result<TxType> {
    Ok(match tag {
        0 => TxType::Regular,
        1 => TxType::SStx,
        2 => TxType::SSGen,
        3 => TxType::SSRtx,
        _ => return Err(crate::Error::database("unknown tx-type tag")),
    })
}

/// Block record: `block-hash(32) || time(8) || voteBits(2) || txCount(4) || tx-hash[]`.
pub fn encode_block(record: &BlockRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 8 + 2 + 4 + record.tx_hashes.len() * 32);
    out.extend_from_slice(record.hash.as_bytes());
    out.extend_from_slice(&record.time.to_be_bytes());
    out.extend_from_slice(&record.vote_bits.to_be_bytes());
    out.extend_from_slice(&(record.tx_hashes.len() as u32).to_be_bytes());
    for hash in &record.tx_hashes {
        out.extend_from_slice(hash.as_bytes());
    }
    out
}

pub fn decode_block(bytes: &[u8]) -> crate::Result<BlockRecord> {
    if bytes.len() < 46 {
        return Err(crate::Error::database("truncated block record"));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[0..32]);
    let time = i64::from_be_bytes(bytes[32..40].try_into().unwrap());
    let vote_bits = u16::from_be_bytes(bytes[40..42].try_into().unwrap());
    let tx_count = u32::from_be_bytes(bytes[42..46].try_into().unwrap()) as usize;
    let mut tx_hashes = Vec::with_capacity(tx_count);
    let mut offset = 46;
    for _ in 0..tx_count {
        if bytes.len() < offset + 32 {
            return Err(crate::Error::database("truncated block record tx list"));
        }
        let mut h = [0u8; 32];
        h.copy_from_slice(&bytes[offset..offset + 32]);
        tx_hashes.push(TxHash::from_bytes(h));
        offset += 32;
    }
    Ok(BlockRecord {
        hash: BlockHash::from_bytes(hash),
        time,
        vote_bits,
        tx_hashes,
    })
}

/// TxRecord value: `received(8) || serializedTxLen(4) || serializedTx || txType(1)`.
pub fn encode_tx_record(record: &TxRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 4 + record.serialized_tx.len() + 1);
    out.extend_from_slice(&record.received.to_be_bytes());
    out.extend_from_slice(&(record.serialized_tx.len() as u32).to_be_bytes());
    out.extend_from_slice(&record.serialized_tx);
    out.push(tx_type_tag(record.tx_type));
    out
}

pub fn decode_tx_record(bytes: &[u8]) -> crate::Result<TxRecord> {
    if bytes.len() < 13 {
        return Err(crate::Error::database("truncated tx record"));
    }
    let received = i64::from_be_bytes(bytes[0..8].try_into().unwrap());
    let tx_len = u32::from_be_bytes(bytes[8..12].try_into().unwrap()) as usize;
    if bytes.len() != 12 + tx_len + 1 {
        return Err(crate::Error::database("tx record length mismatch"));
    }
    let serialized_tx = bytes[12..12 + tx_len].to_vec();
    let tx_type = tx_type_from_tag(bytes[12 + tx_len])?;
    Ok(TxRecord {
        received,
        serialized_tx,
        tx_type,
    })
}

const FLAG_CHANGE: u8 = 0b001;
const FLAG_SPENT: u8 = 0b010;
const FLAG_COINBASE: u8 = 0b100;

/// Credit value: `amount(8) || flags(1) || spenderBlock(36) || spenderHash(32) || spenderIndex(4) || opCode(1)`.
///
/// Spender fields are all-zero/sentinel when unspent (spec §9 "Spender
/// sentinels"); this is the one place that translation happens.
pub fn encode_credit(record: &CreditRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 1 + 36 + 32 + 4 + 1);
    out.extend_from_slice(&record.amount.0.to_be_bytes());

    let mut flags = 0u8;
    if record.change {
        flags |= FLAG_CHANGE;
    }
    if record.coinbase {
        flags |= FLAG_COINBASE;
    }
    if !record.is_unspent() {
        flags |= FLAG_SPENT;
    }
    out.push(flags);

    match &record.spender {
        Spender::Unspent => {
            out.extend_from_slice(&[0u8; 36]);
            out.extend_from_slice(&[0u8; 32]);
            out.extend_from_slice(&SPENDER_INDEX_UNSPENT.to_be_bytes());
        }
        Spender::By { hash, block, index } => {
            out.extend_from_slice(&block.height.to_be_bytes());
            out.extend_from_slice(block.hash.as_bytes());
            out.extend_from_slice(hash.as_bytes());
            out.extend_from_slice(&index.to_be_bytes());
        }
    }

    out.push(op_code_tag(record.op_code));
    out
}

pub fn decode_credit(bytes: &[u8]) -> crate::Result<CreditRecord> {
    if bytes.len() != 8 + 1 + 36 + 32 + 4 + 1 {
        return Err(crate::Error::database("malformed credit value"));
    }
    let amount = Amount(i64::from_be_bytes(bytes[0..8].try_into().unwrap()));
    let flags = bytes[8];
    let change = flags & FLAG_CHANGE != 0;
    let coinbase = flags & FLAG_COINBASE != 0;
    let spent = flags & FLAG_SPENT != 0;

    let spender_height = i32::from_be_bytes(bytes[9..13].try_into().unwrap());
    let mut spender_block_hash = [0u8; 32];
    spender_block_hash.copy_from_slice(&bytes[13..45]);
    let mut spender_hash = [0u8; 32];
    spender_hash.copy_from_slice(&bytes[45..77]);
    let spender_index = u32::from_be_bytes(bytes[77..81].try_into().unwrap());

    let spender = if spent && spender_index != SPENDER_INDEX_UNSPENT {
        Spender::By {
            hash: TxHash::from_bytes(spender_hash),
            block: BlockId::new(spender_height, BlockHash::from_bytes(spender_block_hash)),
            index: spender_index,
        }
    } else {
        Spender::Unspent
    };

    let op_code = op_code_from_tag(bytes[81])?;

    Ok(CreditRecord {
        amount,
        change,
        coinbase,
        op_code,
        spender,
    })
}

/// Debit value: `amount(8) || credit-key(72)`.
pub fn encode_debit(record: &DebitRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 72);
    out.extend_from_slice(&record.amount.0.to_be_bytes());
    out.extend_from_slice(&credit_key(&record.spent_credit_key));
    out
}

pub fn decode_debit(bytes: &[u8]) -> crate::Result<DebitRecord> {
    if bytes.len() != 8 + 72 {
        return Err(crate::Error::database("malformed debit value"));
    }
    let amount = Amount(i64::from_be_bytes(bytes[0..8].try_into().unwrap()));
    let spent_credit_key = decode_credit_key(&bytes[8..80])?;
    Ok(DebitRecord {
        amount,
        spent_credit_key,
    })
}

/// Unspent value: `block(36)`.
pub fn encode_unspent(record: &UnspentRecord) -> [u8; 36] {
    let mut out = [0u8; 36];
    out[0..4].copy_from_slice(&record.block.height.to_be_bytes());
    out[4..36].copy_from_slice(record.block.hash.as_bytes());
    out
}

pub fn decode_unspent(bytes: &[u8]) -> crate::Result<UnspentRecord> {
    if bytes.len() != 36 {
        return Err(crate::Error::database("malformed unspent value"));
    }
    let height = i32::from_be_bytes(bytes[0..4].try_into().unwrap());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[4..36]);
    Ok(UnspentRecord {
        block: BlockId::new(height, BlockHash::from_bytes(hash)),
    })
}

/// UnminedCredit value: `amount(8) || flags(1) || opCode(1)`.
pub fn encode_unmined_credit(record: &UnminedCreditRecord) -> [u8; 10] {
    let mut out = [0u8; 10];
    out[0..8].copy_from_slice(&record.amount.0.to_be_bytes());
    out[8] = if record.change { FLAG_CHANGE } else { 0 };
    out[9] = op_code_tag(record.op_code);
    out
}

pub fn decode_unmined_credit(bytes: &[u8]) -> crate::Result<UnminedCreditRecord> {
    if bytes.len() != 10 {
        return Err(crate::Error::database("malformed unmined-credit value"));
    }
    let amount = Amount(i64::from_be_bytes(bytes[0..8].try_into().unwrap()));
    let change = bytes[8] & FLAG_CHANGE != 0;
    let op_code = op_code_from_tag(bytes[9])?;
    Ok(UnminedCreditRecord {
        amount,
        change,
        op_code,
    })
}

/// MultisigOut value:
/// `scriptHash(20) || m(1) || n(1) || tree(1) || flags(1:spent) || blockHash(32) || blockHeight(4) || amount(8) || spenderHash(32) || spenderIndex(4) || txHash(32)`.
pub fn encode_multisig_out(record: &MultisigOutRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(20 + 1 + 1 + 1 + 1 + 32 + 4 + 8 + 32 + 4 + 32);
    out.extend_from_slice(record.script_hash.as_bytes());
    out.push(record.required);
    out.push(record.total);
    out.push(record.tree);
    out.push(if record.is_spent() { 1 } else { 0 });

    match record.block {
        Some(block) => {
            out.extend_from_slice(block.hash.as_bytes());
            out.extend_from_slice(&block.height.to_be_bytes());
        }
        None => {
            out.extend_from_slice(&[0u8; 32]);
            out.extend_from_slice(&[0u8; 4]);
        }
    }

    out.extend_from_slice(&record.amount.0.to_be_bytes());

    match record.spender {
        Some((hash, index)) => {
            out.extend_from_slice(hash.as_bytes());
            out.extend_from_slice(&index.to_be_bytes());
        }
        None => {
            out.extend_from_slice(&[0u8; 32]);
            out.extend_from_slice(&SPENDER_INDEX_UNSPENT.to_be_bytes());
        }
    }

    out.extend_from_slice(record.tx_hash.as_bytes());
    out
}

pub fn decode_multisig_out(bytes: &[u8]) -> crate::Result<MultisigOutRecord> {
    if bytes.len() != 20 + 1 + 1 + 1 + 1 + 32 + 4 + 8 + 32 + 4 + 32 {
        return Err(crate::Error::database("malformed multisig-out value"));
    }
    let mut script_hash = [0u8; 20];
    script_hash.copy_from_slice(&bytes[0..20]);
    let required = bytes[20];
    let total = bytes[21];
    let tree = bytes[22];
    let spent_flag = bytes[23] != 0;

    let mut block_hash = [0u8; 32];
    block_hash.copy_from_slice(&bytes[24..56]);
    let block_height = i32::from_be_bytes(bytes[56..60].try_into().unwrap());
    let block = if block_hash != [0u8; 32] || block_height != 0 {
        Some(BlockId::new(block_height, BlockHash::from_bytes(block_hash)))
    } else {
        None
    };

    let amount = Amount(i64::from_be_bytes(bytes[60..68].try_into().unwrap()));

    let mut spender_hash = [0u8; 32];
    spender_hash.copy_from_slice(&bytes[68..100]);
    let spender_index = u32::from_be_bytes(bytes[100..104].try_into().unwrap());
    let spender = if spent_flag && spender_index != SPENDER_INDEX_UNSPENT {
        Some((TxHash::from_bytes(spender_hash), spender_index))
    } else {
        None
    };

    let mut tx_hash = [0u8; 32];
    tx_hash.copy_from_slice(&bytes[104..136]);

    Ok(MultisigOutRecord {
        script_hash: ScriptHash::from_bytes(script_hash),
        required,
        total,
        tree,
        amount,
        block,
        spender,
        tx_hash: TxHash::from_bytes(tx_hash),
    })
}

/// The single `minedBalance` scalar kept in the metadata bucket.
pub fn encode_mined_balance(amount: Amount) -> [u8; 8] {
    amount.0.to_be_bytes()
}

pub fn decode_mined_balance(bytes: &[u8]) -> crate::Result<Amount> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| crate::Error::database("malformed mined-balance value"))?;
    Ok(Amount(i64::from_be_bytes(arr)))
}
