//! User-defined token contract (type script)
//!
//! A UDT balance is the first 8 bytes of a cell's data, little-endian,
//! meaningful only on cells whose type hash equals the contract identity.
//! The contract keeps no state of its own: sums are re-derived from the
//! transaction on every run.
//!
//! Policy: tokens may be destroyed but never created, unless the issuer
//! authorizes the exact balance set with a supermode signature.

use crate::config::ScriptsConfig;
use crate::constants::UDT_BALANCE_SIZE;
use crate::error::{AuthError, Result};
use crate::hash::Hasher;
use crate::lock::LockArgs;
use crate::signing::{verify_signature, PrivateKey};
use crate::types::*;
use tracing::debug;

/// Raw balance field of a cell
pub fn balance_bytes(cell: &CellOutput) -> Result<&[u8]> {
    cell.data.get(..UDT_BALANCE_SIZE).ok_or_else(|| {
        AuthError::MalformedInput(format!(
            "token cell data holds {} bytes, balance needs {}",
            cell.data.len(),
            UDT_BALANCE_SIZE
        ))
    })
}

/// Balance field of a cell as an integer
pub fn udt_balance(cell: &CellOutput) -> Result<u64> {
    let mut raw = [0u8; UDT_BALANCE_SIZE];
    raw.copy_from_slice(balance_bytes(cell)?);
    Ok(u64::from_le_bytes(raw))
}

/// Encode a balance as cell data
pub fn balance_data(amount: u64) -> Bytes {
    amount.to_le_bytes().to_vec()
}

/// Input-side cells carrying `contract_hash`, in input order
pub(crate) fn matching_inputs<'a>(
    rtx: &'a ResolvedTransaction,
    contract_hash: &'a Hash,
) -> impl Iterator<Item = (usize, &'a CellOutput)> + 'a {
    rtx.resolved_inputs
        .iter()
        .enumerate()
        .filter(move |(_, cell)| cell.type_hash().as_ref() == Some(contract_hash))
}

/// Output-side cells carrying `contract_hash`, in output order
pub(crate) fn matching_outputs<'a>(
    rtx: &'a ResolvedTransaction,
    contract_hash: &'a Hash,
) -> impl Iterator<Item = (usize, &'a CellOutput)> + 'a {
    rtx.outputs()
        .iter()
        .enumerate()
        .filter(move |(_, cell)| cell.type_hash().as_ref() == Some(contract_hash))
}

/// Σ balances of inputs and outputs governed by `contract_hash`
pub fn udt_sums(rtx: &ResolvedTransaction, contract_hash: &Hash) -> Result<(u128, u128)> {
    let mut input_sum = 0u128;
    for (_, cell) in matching_inputs(rtx, contract_hash) {
        input_sum += udt_balance(cell)? as u128;
    }
    let mut output_sum = 0u128;
    for (_, cell) in matching_outputs(rtx, contract_hash) {
        output_sum += udt_balance(cell)? as u128;
    }
    Ok((input_sum, output_sum))
}

/// Type arguments: `[token_name, issuer_pubkey]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtTypeArgs {
    pub name: Bytes,
    pub issuer_pubkey: Bytes,
}

impl UdtTypeArgs {
    pub fn decode(type_script: &Script) -> Result<Self> {
        match type_script.args.as_slice() {
            [name, issuer_pubkey] => Ok(Self { name: name.clone(), issuer_pubkey: issuer_pubkey.clone() }),
            other => Err(AuthError::MalformedInput(format!(
                "UDT contract takes 2 arguments, got {}",
                other.len()
            ))),
        }
    }
}

/// How the contract is being invoked, decoded from its witness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdtRequest {
    Normal,
    Supermode { signature: Bytes },
}

impl UdtRequest {
    pub fn decode(witness_args: Option<&[Bytes]>) -> Result<Self> {
        match witness_args.unwrap_or_default() {
            [] => Ok(UdtRequest::Normal),
            [signature] => Ok(UdtRequest::Supermode { signature: signature.clone() }),
            other => Err(AuthError::MalformedInput(format!(
                "UDT witness takes at most 1 argument, got {}",
                other.len()
            ))),
        }
    }
}

/// SupermodeDigest = H(contract_hash ‖ balance(i) for matching inputs ‖ balance(o) for matching outputs)
pub fn supermode_digest(rtx: &ResolvedTransaction, contract_hash: &Hash) -> Result<Hash> {
    let mut hasher = Hasher::new();
    hasher.update(contract_hash);
    for (_, cell) in matching_inputs(rtx, contract_hash) {
        hasher.update(balance_bytes(cell)?);
    }
    for (_, cell) in matching_outputs(rtx, contract_hash) {
        hasher.update(balance_bytes(cell)?);
    }
    Ok(hasher.finalize())
}

/// VerifyUdt: 𝒮 × 𝒯𝒳 × ℛ → {accept, reject}
///
/// Normal mode requires Σin ≥ Σout. Supermode requires a valid issuer
/// signature over the supermode digest and then skips the sum check.
pub fn verify_udt(type_script: &Script, rtx: &ResolvedTransaction, request: &UdtRequest) -> Result<()> {
    let args = UdtTypeArgs::decode(type_script)?;
    let contract_hash = type_script.hash();

    if let UdtRequest::Supermode { signature } = request {
        let digest = supermode_digest(rtx, &contract_hash)?;
        verify_signature(&args.issuer_pubkey, signature, &digest)?;
        debug!(token = %String::from_utf8_lossy(&args.name), "UDT supermode authorized");
        return Ok(());
    }

    let (input_sum, output_sum) = udt_sums(rtx, &contract_hash)?;
    if input_sum < output_sum {
        return Err(AuthError::ConservationViolation(format!(
            "outputs hold {} tokens but inputs only {}",
            output_sum, input_sum
        )));
    }
    debug!(input_sum = %input_sum, output_sum = %output_sum, "UDT sums verified");
    Ok(())
}

/// Produce the issuer's supermode witness for the transaction as assembled
pub fn sign_supermode(rtx: &ResolvedTransaction, type_script: &Script, issuer: &PrivateKey) -> Result<Witness> {
    let contract_hash = type_script.hash();
    let digest = supermode_digest(rtx, &contract_hash)?;
    Ok(Witness { type_hash: contract_hash, args: vec![issuer.sign(&digest)] })
}

/// Descriptor of a UDT: the pair (name, issuer pubkey) identifies a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtToken {
    pub scripts: ScriptsConfig,
    pub name: Bytes,
    pub issuer_pubkey: Bytes,
}

impl UdtToken {
    pub fn new(scripts: ScriptsConfig, name: impl Into<Bytes>, issuer_pubkey: Bytes) -> Self {
        Self { scripts, name: name.into(), issuer_pubkey }
    }

    pub fn type_script(&self) -> Script {
        Script::new(self.scripts.udt_type, vec![self.name.clone(), self.issuer_pubkey.clone()])
    }

    pub fn type_hash(&self) -> Hash {
        self.type_script().hash()
    }

    /// Signature-only lock for `owner_pubkey`'s token cells
    pub fn lock(&self, owner_pubkey: Bytes) -> Script {
        let args = LockArgs::Pubkey { label: self.name.clone(), pubkey: owner_pubkey };
        Script::new(self.scripts.ownership_lock, args.encode())
    }

    /// Account lock, which also accepts unsigned deposits
    pub fn account_lock(&self, owner_pubkey: Bytes) -> Script {
        let args = LockArgs::Pubkey { label: self.name.clone(), pubkey: owner_pubkey };
        Script::new(self.scripts.account_lock, args.encode())
    }

    /// A token cell holding `amount`
    pub fn cell(&self, capacity: Capacity, amount: u64, lock: Script) -> CellOutput {
        CellOutput::new(capacity, balance_data(amount), lock, Some(self.type_script()))
    }
}
