//! Core cell-ledger types for transaction authorization

use crate::encoding::{hex_bytes, hex_bytes_list, hex_hash, hex_hash_opt};
use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};

/// Hash type: 256-bit digest
pub type Hash = [u8; 32];

/// Byte string type
pub type Bytes = Vec<u8>;

/// Capacity: integer count of the ledger's storage-cost unit
pub type Capacity = u64;

/// OutPoint: reference to output `index` of transaction `tx_hash`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    #[serde(with = "hex_hash")]
    pub tx_hash: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: Hash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

/// Script: code reference plus ordered argument list
///
/// A script without a code hash is defined purely by inline code carried in
/// its arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    #[serde(with = "hex_hash_opt", default)]
    pub code_hash: Option<Hash>,
    #[serde(with = "hex_bytes_list", default)]
    pub args: Vec<Bytes>,
}

impl Script {
    pub fn new(code_hash: Hash, args: Vec<Bytes>) -> Self {
        Self { code_hash: Some(code_hash), args }
    }

    pub fn inline(args: Vec<Bytes>) -> Self {
        Self { code_hash: None, args }
    }
}

/// Cell output: capacity, data payload, lock script and optional type script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutput {
    pub capacity: Capacity,
    #[serde(with = "hex_bytes", default)]
    pub data: Bytes,
    pub lock: Script,
    #[serde(rename = "type", default)]
    pub type_: Option<Script>,
}

impl CellOutput {
    pub fn new(capacity: Capacity, data: Bytes, lock: Script, type_: Option<Script>) -> Self {
        Self { capacity, data, lock, type_ }
    }
}

/// Cell input: previous output plus unlock arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInput {
    pub previous_output: OutPoint,
    #[serde(with = "hex_bytes_list", default)]
    pub args: Vec<Bytes>,
    /// Relative timelock, carried but not interpreted here
    #[serde(default)]
    pub since: u64,
}

impl CellInput {
    pub fn new(previous_output: OutPoint, args: Vec<Bytes>) -> Self {
        Self { previous_output, args, since: 0 }
    }
}

/// Unsigned arguments addressed to the type script hashing to `type_hash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    #[serde(with = "hex_hash")]
    pub type_hash: Hash,
    #[serde(with = "hex_bytes_list", default)]
    pub args: Vec<Bytes>,
}

/// Transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    #[serde(default)]
    pub deps: Vec<OutPoint>,
    pub inputs: Vec<CellInput>,
    pub outputs: Vec<CellOutput>,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
}

impl Transaction {
    /// Witness arguments addressed to the given type script, if any
    pub fn witness_args(&self, type_hash: &Hash) -> Option<&[Bytes]> {
        self.witnesses
            .iter()
            .find(|w| &w.type_hash == type_hash)
            .map(|w| w.args.as_slice())
    }
}

/// A transaction together with the cells its inputs consume, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransaction {
    pub transaction: Transaction,
    pub resolved_inputs: Vec<CellOutput>,
}

impl ResolvedTransaction {
    pub fn new(transaction: Transaction, resolved_inputs: Vec<CellOutput>) -> Result<Self> {
        if transaction.inputs.len() != resolved_inputs.len() {
            return Err(AuthError::MalformedInput(format!(
                "{} inputs but {} resolved cells",
                transaction.inputs.len(),
                resolved_inputs.len()
            )));
        }
        Ok(Self { transaction, resolved_inputs })
    }

    pub fn inputs(&self) -> &[CellInput] {
        &self.transaction.inputs
    }

    pub fn outputs(&self) -> &[CellOutput] {
        &self.transaction.outputs
    }

    /// The cell consumed by input `index`
    pub fn input_cell(&self, index: usize) -> Result<&CellOutput> {
        self.resolved_inputs.get(index).ok_or_else(|| {
            AuthError::MalformedInput(format!(
                "input index {} out of range ({} inputs)",
                index,
                self.resolved_inputs.len()
            ))
        })
    }

    /// Input `index` paired with the cell it consumes
    pub fn input(&self, index: usize) -> Result<(&CellInput, &CellOutput)> {
        let cell = self.input_cell(index)?;
        Ok((&self.transaction.inputs[index], cell))
    }
}

/// Outcome of a facade-level verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(AuthError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}
