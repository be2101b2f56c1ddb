//! The byte format [`MockCodec`](crate::MockCodec) parses: fixed-width
//! fields in the same spirit as `wallet-state`'s own on-disk codecs, but
//! self-describing (it carries its own hash and a variable output
//! count) since test fixtures are built once and never need a stable
//! wire format.

use wallet_chain::{Amount, Input, Outpoint, Output, ScriptClass, ScriptHash, TxHash};

use crate::MockCodecError;

const MULTISIG_MARKER: [u8; 4] = *b"MSIG";
const STAKE_MARKER: [u8; 4] = *b"STK:";

fn stake_class_byte(class: ScriptClass) -> Option<u8> {
    match class {
        ScriptClass::StakeSubmission => Some(1),
        ScriptClass::StakeGeneration => Some(2),
        ScriptClass::StakeRevocation => Some(3),
        ScriptClass::StakeChange => Some(4),
        ScriptClass::Regular | ScriptClass::ScriptHash => None,
    }
}

fn stake_class_from_byte(byte: u8) -> Option<ScriptClass> {
    match byte {
        1 => Some(ScriptClass::StakeSubmission),
        2 => Some(ScriptClass::StakeGeneration),
        3 => Some(ScriptClass::StakeRevocation),
        4 => Some(ScriptClass::StakeChange),
        _ => None,
    }
}

/// Builds the stake-class-marker script [`decode_stake_marker`] reads
/// back — the mock stand-in for a real script interpreter recognizing
/// one of the stake-cycle output shapes.
pub fn stake_script(class: ScriptClass) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.extend_from_slice(&STAKE_MARKER);
    out.push(stake_class_byte(class).expect("stake_script called with a non-stake ScriptClass"));
    out
}

pub(crate) fn decode_stake_marker(script: &[u8]) -> Option<ScriptClass> {
    if script.len() != 5 || script[0..4] != STAKE_MARKER {
        return None;
    }
    stake_class_from_byte(script[4])
}

pub(crate) struct Decoded {
    pub(crate) hash: TxHash,
    pub(crate) inputs: Vec<Input>,
    pub(crate) outputs: Vec<Output>,
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Decoded, MockCodecError> {
    let mut cursor = Cursor::new(bytes);
    let hash = TxHash::from_bytes(cursor.take_array::<32>()?);

    let input_count = cursor.take_u32()?;
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let prev_hash = TxHash::from_bytes(cursor.take_array::<32>()?);
        let prev_index = cursor.take_u32()?;
        inputs.push(Input {
            previous_outpoint: Outpoint::new(prev_hash, prev_index),
        });
    }

    let output_count = cursor.take_u32()?;
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        let value = Amount(cursor.take_i64()?);
        let script_len = cursor.take_u32()? as usize;
        let script = cursor.take_n(script_len)?.to_vec();
        outputs.push(Output { value, script });
    }

    Ok(Decoded { hash, inputs, outputs })
}

/// If `script` carries a [`MockTxBuilder::multisig_output`] marker,
/// returns its `(required, total, script_hash)`.
pub(crate) fn decode_multisig_marker(script: &[u8]) -> Option<(u8, u8, ScriptHash)> {
    if script.len() != 4 + 1 + 1 + 20 || script[0..4] != MULTISIG_MARKER {
        return None;
    }
    let required = script[4];
    let total = script[5];
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[6..26]);
    Some((required, total, ScriptHash::from_bytes(hash)))
}

/// Builds the multisig-marker script [`decode_multisig_marker`] reads
/// back.
pub fn multisig_script(required: u8, total: u8, script_hash: ScriptHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(26);
    out.extend_from_slice(&MULTISIG_MARKER);
    out.push(required);
    out.push(total);
    out.extend_from_slice(script_hash.as_bytes());
    out
}

/// Builds a mock transaction's serialized form. `hash` is carried
/// literally in the encoding, so [`MockCodec::hash`](crate::MockCodec)
/// never has to compute one.
#[derive(Clone, Debug)]
pub struct MockTxBuilder {
    hash: TxHash,
    inputs: Vec<Outpoint>,
    outputs: Vec<Output>,
}

impl MockTxBuilder {
    pub fn new(hash: TxHash) -> Self {
        MockTxBuilder {
            hash,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, previous_outpoint: Outpoint) -> Self {
        self.inputs.push(previous_outpoint);
        self
    }

    pub fn output(mut self, amount: Amount) -> Self {
        self.outputs.push(crate::regular_output(amount));
        self
    }

    pub fn multisig_output(mut self, amount: Amount, required: u8, total: u8, script_hash: ScriptHash) -> Self {
        self.outputs.push(Output {
            value: amount,
            script: multisig_script(required, total, script_hash),
        });
        self
    }

    /// An output whose script carries an explicit stake classification,
    /// e.g. `ScriptClass::StakeSubmission` for an `SStx` ticket output.
    pub fn stake_output(mut self, amount: Amount, class: ScriptClass) -> Self {
        self.outputs.push(Output {
            value: amount,
            script: stake_script(class),
        });
        self
    }

    pub fn build(self) -> (TxHash, Vec<u8>) {
        let mut out = Vec::new();
        out.extend_from_slice(self.hash.as_bytes());

        out.extend_from_slice(&(self.inputs.len() as u32).to_be_bytes());
        for outpoint in &self.inputs {
            out.extend_from_slice(outpoint.hash.as_bytes());
            out.extend_from_slice(&outpoint.index.to_be_bytes());
        }

        out.extend_from_slice(&(self.outputs.len() as u32).to_be_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.value.0.to_be_bytes());
            out.extend_from_slice(&(output.script.len() as u32).to_be_bytes());
            out.extend_from_slice(&output.script);
        }

        (self.hash, out)
    }
}

/// A one-input, one-output transaction spending `spends` and paying
/// itself `amount`, identified by `hash`.
pub fn mock_tx(hash: TxHash, spends: Outpoint, amount: Amount) -> (TxHash, Vec<u8>) {
    MockTxBuilder::new(hash).input(spends).output(amount).build()
}

/// A coinbase transaction: its one input's previous outpoint is the
/// all-zero sentinel [`Input::is_stakebase`] also uses to recognize a
/// stakebase, at index 0 — the same shape `TxCodec::is_coinbase`'s
/// default implementation checks for.
pub fn mock_coinbase(hash: TxHash, amount: Amount) -> (TxHash, Vec<u8>) {
    MockTxBuilder::new(hash)
        .input(Outpoint::new(TxHash::default(), 0))
        .output(amount)
        .build()
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take_n(&mut self, n: usize) -> Result<&'a [u8], MockCodecError> {
        let end = self.pos.checked_add(n).ok_or(MockCodecError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(MockCodecError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], MockCodecError> {
        self.take_n(N)?.try_into().map_err(|_| MockCodecError::Truncated)
    }

    fn take_u32(&mut self) -> Result<u32, MockCodecError> {
        Ok(u32::from_be_bytes(self.take_array::<4>()?))
    }

    fn take_i64(&mut self) -> Result<i64, MockCodecError> {
        Ok(i64::from_be_bytes(self.take_array::<8>()?))
    }
}
