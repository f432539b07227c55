//! Sighash protocol: which transaction fields a signature commits to
//!
//! A signing digest is built as
//!
//! ```text
//! H( tag ‖ input scope ‖ output scope )
//! ```
//!
//! where the tag is the sighash type as ASCII decimal, an input entry is
//! `tx_hash ‖ index ‖ lock_hash` of the consumed cell, and an output entry
//! is `capacity ‖ lock_hash ‖ type_hash?`. Writing the tag first binds the
//! mode itself into the signature.

use crate::constants::*;
use crate::error::{AuthError, Result};
use crate::hash::Hasher;
use crate::types::*;
use tracing::trace;

/// Which outputs enter the digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputScope {
    All,
    None,
    Single(usize),
    Multiple(Vec<usize>),
}

/// A complete sighash selection: output scope plus the ANYONECANPAY modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SighashType {
    pub outputs: OutputScope,
    pub anyone_can_pay: bool,
}

impl SighashType {
    pub fn all() -> Self {
        Self { outputs: OutputScope::All, anyone_can_pay: false }
    }

    pub fn none() -> Self {
        Self { outputs: OutputScope::None, anyone_can_pay: false }
    }

    pub fn single(index: usize) -> Self {
        Self { outputs: OutputScope::Single(index), anyone_can_pay: false }
    }

    pub fn multiple(indices: Vec<usize>) -> Self {
        Self { outputs: OutputScope::Multiple(indices), anyone_can_pay: false }
    }

    /// Restrict the input scope to the signer's own input
    pub fn anyone_can_pay(mut self) -> Self {
        self.anyone_can_pay = true;
        self
    }

    /// The integer type tag, e.g. `0x81` for ALL|ANYONECANPAY
    pub fn tag(&self) -> u8 {
        let base = match self.outputs {
            OutputScope::All => SIGHASH_ALL,
            OutputScope::None => SIGHASH_NONE,
            OutputScope::Single(_) => SIGHASH_SINGLE,
            OutputScope::Multiple(_) => SIGHASH_MULTIPLE,
        };
        if self.anyone_can_pay {
            base | SIGHASH_ANYONECANPAY
        } else {
            base
        }
    }

    /// Decode from unlock metadata: the ASCII decimal tag and, for SINGLE and
    /// MULTIPLE, the ASCII output index list
    pub fn from_unlock_args(tag: &[u8], outputs: Option<&[u8]>) -> Result<Self> {
        let tag = parse_decimal(tag, "sighash type")?;
        let tag = u8::try_from(tag)
            .map_err(|_| AuthError::MalformedInput(format!("sighash type {} out of range", tag)))?;
        let anyone_can_pay = tag & SIGHASH_ANYONECANPAY != 0;

        let scope = match tag & !SIGHASH_ANYONECANPAY {
            SIGHASH_ALL => OutputScope::All,
            SIGHASH_NONE => OutputScope::None,
            SIGHASH_SINGLE => {
                let raw = outputs.ok_or_else(|| {
                    AuthError::MalformedInput("SIGHASH_SINGLE requires an output index".to_string())
                })?;
                OutputScope::Single(parse_decimal(raw, "output index")? as usize)
            }
            SIGHASH_MULTIPLE => {
                let raw = outputs.ok_or_else(|| {
                    AuthError::MalformedInput("SIGHASH_MULTIPLE requires output indices".to_string())
                })?;
                OutputScope::Multiple(parse_index_list(raw)?)
            }
            other => {
                return Err(AuthError::MalformedInput(format!("unknown sighash type 0x{:02x}", other)));
            }
        };

        let has_outputs_arg = matches!(scope, OutputScope::Single(_) | OutputScope::Multiple(_));
        if outputs.is_some() && !has_outputs_arg {
            return Err(AuthError::MalformedInput(format!(
                "sighash type 0x{:02x} takes no output list",
                tag
            )));
        }

        Ok(Self { outputs: scope, anyone_can_pay })
    }

    /// Encode as unlock metadata: `[tag]` or `[tag, outputs]`
    pub fn to_unlock_args(&self) -> Vec<Bytes> {
        let mut args = vec![self.tag().to_string().into_bytes()];
        match &self.outputs {
            OutputScope::Single(i) => args.push(i.to_string().into_bytes()),
            OutputScope::Multiple(indices) => {
                let list: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                args.push(list.join(OUTPUT_INDEX_SEPARATOR).into_bytes());
            }
            OutputScope::All | OutputScope::None => {}
        }
        args
    }
}

fn parse_decimal(raw: &[u8], what: &str) -> Result<u64> {
    std::str::from_utf8(raw)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| AuthError::MalformedInput(format!("invalid {}: {:?}", what, String::from_utf8_lossy(raw))))
}

fn parse_index_list(raw: &[u8]) -> Result<Vec<usize>> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| AuthError::MalformedInput("output index list is not ASCII".to_string()))?;
    if text.is_empty() {
        return Err(AuthError::MalformedInput("empty output index list".to_string()));
    }
    text.split(OUTPUT_INDEX_SEPARATOR)
        .map(|part| parse_decimal(part.as_bytes(), "output index").map(|i| i as usize))
        .collect()
}

/// Write one input entry: out-point coordinates and the consumed cell's lock hash
pub(crate) fn hash_input(hasher: &mut Hasher, input: &CellInput, cell: &CellOutput) {
    hasher.update(&input.previous_output.tx_hash);
    hasher.update_decimal(input.previous_output.index);
    hasher.update(&cell.lock_hash());
}

/// Write one output entry: capacity, lock hash, and type hash when present
pub(crate) fn hash_output(hasher: &mut Hasher, output: &CellOutput) {
    hasher.update_decimal(output.capacity);
    hasher.update(&output.lock_hash());
    if let Some(type_hash) = output.type_hash() {
        hasher.update(&type_hash);
    }
}

fn output_at(rtx: &ResolvedTransaction, index: usize) -> Result<&CellOutput> {
    rtx.outputs().get(index).ok_or_else(|| {
        AuthError::MalformedInput(format!(
            "signed output index {} out of range ({} outputs)",
            index,
            rtx.outputs().len()
        ))
    })
}

/// ComputeSighash: 𝒯𝒳 × 𝒮𝐻 × ℕ? → ℍ
///
/// `current_input` is required when ANYONECANPAY is set and ignored otherwise.
pub fn compute_sighash(
    rtx: &ResolvedTransaction,
    sighash: &SighashType,
    current_input: Option<usize>,
) -> Result<Hash> {
    let mut hasher = Hasher::new();
    hasher.update_decimal(sighash.tag());

    if sighash.anyone_can_pay {
        let index = current_input.ok_or_else(|| {
            AuthError::MalformedInput("ANYONECANPAY requires the current input index".to_string())
        })?;
        let (input, cell) = rtx.input(index)?;
        hash_input(&mut hasher, input, cell);
    } else {
        for (input, cell) in rtx.inputs().iter().zip(&rtx.resolved_inputs) {
            hash_input(&mut hasher, input, cell);
        }
    }

    match &sighash.outputs {
        OutputScope::All => {
            for output in rtx.outputs() {
                hash_output(&mut hasher, output);
            }
        }
        OutputScope::None => {}
        OutputScope::Single(index) => {
            hash_output(&mut hasher, output_at(rtx, *index)?);
        }
        OutputScope::Multiple(indices) => {
            for index in indices {
                hash_output(&mut hasher, output_at(rtx, *index)?);
            }
        }
    }

    trace!(tag = sighash.tag(), ?current_input, "computed sighash digest");
    Ok(hasher.finalize())
}
