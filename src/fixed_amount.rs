//! Fixed-amount UDT: replay-bound genesis and fixed-rate exchange
//!
//! The token's type arguments embed a digest of the bootstrap transaction's
//! input set. Inputs can only be spent once, so the issuer can run the
//! bootstrap exactly once per contract identity and the supply created there
//! is the supply forever. After bootstrap the contract enforces strict
//! conservation.
//!
//! The genesis cell sits under a genesis lock. The issuer may move it with a
//! signature; anyone may buy from it by paying `ceil(sold / rate)` capacity
//! into a fresh cell under the issuer's payment lock.

use crate::config::ScriptsConfig;
use crate::error::{AuthError, Result};
use crate::hash::Hasher;
use crate::lock::{sign_input, verify_signature_unlock, LockArgs, SignatureUnlock};
use crate::sighash::{hash_input, hash_output, SighashType};
use crate::signing::{verify_signature, PrivateKey};
use crate::types::*;
use crate::udt::{balance_bytes, balance_data, udt_balance, udt_sums};
use tracing::debug;

/// InputSetDigest = H(tx_hash ‖ index ‖ lock_hash for each input)
pub fn input_set_digest(rtx: &ResolvedTransaction) -> Hash {
    let mut hasher = Hasher::new();
    for (input, cell) in rtx.inputs().iter().zip(&rtx.resolved_inputs) {
        hash_input(&mut hasher, input, cell);
    }
    hasher.finalize()
}

fn decode_hash(arg: &[u8], what: &str) -> Result<Hash> {
    arg.try_into()
        .map_err(|_| AuthError::MalformedInput(format!("{} must be 32 bytes, got {}", what, arg.len())))
}

/// Type arguments: `[input_set_digest, issuer_pubkey]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedAmountTypeArgs {
    pub input_hash: Hash,
    pub issuer_pubkey: Bytes,
}

impl FixedAmountTypeArgs {
    pub fn decode(type_script: &Script) -> Result<Self> {
        match type_script.args.as_slice() {
            [input_hash, issuer_pubkey] => Ok(Self {
                input_hash: decode_hash(input_hash, "input set digest")?,
                issuer_pubkey: issuer_pubkey.clone(),
            }),
            other => Err(AuthError::MalformedInput(format!(
                "fixed-amount contract takes 2 arguments, got {}",
                other.len()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedAmountRequest {
    Normal,
    Bootstrap { signature: Bytes },
}

impl FixedAmountRequest {
    pub fn decode(witness_args: Option<&[Bytes]>) -> Result<Self> {
        match witness_args.unwrap_or_default() {
            [] => Ok(FixedAmountRequest::Normal),
            [signature] => Ok(FixedAmountRequest::Bootstrap { signature: signature.clone() }),
            other => Err(AuthError::MalformedInput(format!(
                "fixed-amount witness takes at most 1 argument, got {}",
                other.len()
            ))),
        }
    }
}

/// BootstrapDigest: contract hash, then every input and every output with
/// the raw balance of cells governed by the contract
pub fn bootstrap_digest(rtx: &ResolvedTransaction, contract_hash: &Hash) -> Result<Hash> {
    let mut hasher = Hasher::new();
    hasher.update(contract_hash);
    for (input, cell) in rtx.inputs().iter().zip(&rtx.resolved_inputs) {
        hash_input(&mut hasher, input, cell);
        if cell.type_hash().as_ref() == Some(contract_hash) {
            hasher.update(balance_bytes(cell)?);
        }
    }
    for output in rtx.outputs() {
        hash_output(&mut hasher, output);
        if output.type_hash().as_ref() == Some(contract_hash) {
            hasher.update(balance_bytes(output)?);
        }
    }
    Ok(hasher.finalize())
}

/// VerifyFixedAmountType: 𝒮 × 𝒯𝒳 × ℛ → {accept, reject}
pub fn verify_fixed_amount_type(
    type_script: &Script,
    rtx: &ResolvedTransaction,
    request: &FixedAmountRequest,
) -> Result<()> {
    let args = FixedAmountTypeArgs::decode(type_script)?;
    let contract_hash = type_script.hash();

    match request {
        FixedAmountRequest::Bootstrap { signature } => {
            if input_set_digest(rtx) != args.input_hash {
                return Err(AuthError::HashMismatch(
                    "bootstrap inputs differ from the contract's input set".to_string(),
                ));
            }
            let digest = bootstrap_digest(rtx, &contract_hash)?;
            verify_signature(&args.issuer_pubkey, signature, &digest)?;
            debug!("fixed-amount bootstrap authorized");
            Ok(())
        }
        FixedAmountRequest::Normal => {
            let (input_sum, output_sum) = udt_sums(rtx, &contract_hash)?;
            if input_sum != output_sum {
                return Err(AuthError::ConservationViolation(format!(
                    "fixed supply requires equal sums, inputs {} outputs {}",
                    input_sum, output_sum
                )));
            }
            Ok(())
        }
    }
}

/// Genesis lock arguments: `[input_set_digest, rate, payment_lock_hash, issuer_pubkey]`
///
/// `rate` is tokens per unit of capacity, as ASCII decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisLockArgs {
    pub input_hash: Hash,
    pub rate: u64,
    pub payment_lock_hash: Hash,
    pub issuer_pubkey: Bytes,
}

impl GenesisLockArgs {
    pub fn decode(lock: &Script) -> Result<Self> {
        match lock.args.as_slice() {
            [input_hash, rate, payment_lock_hash, issuer_pubkey] => Ok(Self {
                input_hash: decode_hash(input_hash, "input set digest")?,
                rate: parse_rate(rate)?,
                payment_lock_hash: decode_hash(payment_lock_hash, "payment lock hash")?,
                issuer_pubkey: issuer_pubkey.clone(),
            }),
            other => Err(AuthError::MalformedInput(format!(
                "genesis lock takes 4 arguments, got {}",
                other.len()
            ))),
        }
    }

    pub fn encode(&self) -> Vec<Bytes> {
        vec![
            self.input_hash.to_vec(),
            self.rate.to_string().into_bytes(),
            self.payment_lock_hash.to_vec(),
            self.issuer_pubkey.clone(),
        ]
    }

    /// The issuer's signature path, shaped as an embedded-pubkey lock
    fn issuer_lock(&self) -> LockArgs {
        LockArgs::Pubkey { label: self.input_hash.to_vec(), pubkey: self.issuer_pubkey.clone() }
    }
}

fn parse_rate(raw: &[u8]) -> Result<u64> {
    let rate = std::str::from_utf8(raw)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| AuthError::MalformedInput(format!("invalid exchange rate {:?}", String::from_utf8_lossy(raw))))?;
    if rate == 0 {
        return Err(AuthError::MalformedInput("exchange rate must be positive".to_string()));
    }
    Ok(rate)
}

/// Capacity owed for `sold` tokens at `rate` tokens per unit, rounded up
pub fn required_payment(sold: u64, rate: u64) -> Result<Capacity> {
    if rate == 0 {
        return Err(AuthError::MalformedInput("exchange rate must be positive".to_string()));
    }
    Ok(sold.div_ceil(rate))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenesisRequest {
    Signature(SignatureUnlock),
    Exchange,
}

impl GenesisRequest {
    pub fn decode(lock: &GenesisLockArgs, args: &[Bytes]) -> Result<Self> {
        if args.is_empty() {
            return Ok(GenesisRequest::Exchange);
        }
        SignatureUnlock::decode(&lock.issuer_lock(), args).map(GenesisRequest::Signature)
    }
}

/// VerifyGenesisLock: 𝒮 × 𝒯𝒳 × ℕ → {accept, reject}
pub fn verify_genesis_lock(lock: &Script, rtx: &ResolvedTransaction, input_index: usize) -> Result<()> {
    let (input, _) = rtx.input(input_index)?;
    let args = GenesisLockArgs::decode(lock)?;
    match GenesisRequest::decode(&args, &input.args)? {
        GenesisRequest::Signature(unlock) => {
            debug!(input_index, "genesis cell moved by issuer");
            verify_signature_unlock(rtx, input_index, &unlock)
        }
        GenesisRequest::Exchange => verify_exchange(&args, rtx, input_index),
    }
}

/// Exchange rules for the genesis cell consumed by `input_index`
pub fn verify_exchange(args: &GenesisLockArgs, rtx: &ResolvedTransaction, input_index: usize) -> Result<()> {
    let current = rtx.input_cell(input_index)?;
    let lock_hash = current.lock_hash();
    let type_hash = current
        .type_hash()
        .ok_or_else(|| AuthError::MalformedInput("genesis cell carries no token type".to_string()))?;

    // One genesis cell per exchange, otherwise two inputs can share one payment
    let genesis_inputs = rtx
        .resolved_inputs
        .iter()
        .filter(|c| c.lock_hash() == lock_hash && c.type_hash() == Some(type_hash))
        .count();
    if genesis_inputs > 1 {
        return Err(AuthError::StructuralViolation(format!(
            "exchange consumes {} genesis cells, at most one allowed",
            genesis_inputs
        )));
    }

    let continuations: Vec<&CellOutput> = rtx
        .outputs()
        .iter()
        .filter(|o| o.lock_hash() == lock_hash && o.type_hash() == Some(type_hash) && o.capacity == current.capacity)
        .collect();
    let continuation = match continuations.as_slice() {
        [output] => *output,
        other => {
            return Err(AuthError::StructuralViolation(format!(
                "exchange needs exactly one continuation of the genesis cell, found {}",
                other.len()
            )))
        }
    };

    let before = udt_balance(current)?;
    let after = udt_balance(continuation)?;
    if after >= before {
        return Err(AuthError::ConservationViolation(format!(
            "exchange must sell tokens ({} -> {})",
            before, after
        )));
    }

    let payments: Vec<&CellOutput> =
        rtx.outputs().iter().filter(|o| o.lock_hash() == args.payment_lock_hash).collect();
    let payment = match payments.as_slice() {
        [output] => *output,
        other => {
            return Err(AuthError::StructuralViolation(format!(
                "exchange needs exactly one payment output, found {}",
                other.len()
            )))
        }
    };
    if !payment.data.is_empty() || payment.type_.is_some() {
        return Err(AuthError::StructuralViolation("payment output must be an empty cell".to_string()));
    }

    let sold = before - after;
    let required = required_payment(sold, args.rate)?;
    if payment.capacity < required {
        return Err(AuthError::CapacityInsufficient(format!(
            "{} tokens at rate {} cost {}, paid {}",
            sold, args.rate, required, payment.capacity
        )));
    }
    if payment.capacity > required {
        return Err(AuthError::StructuralViolation(format!(
            "{} tokens at rate {} cost exactly {}, paid {}",
            sold, args.rate, required, payment.capacity
        )));
    }
    debug!(input_index, sold, paid = payment.capacity, "genesis exchange accepted");
    Ok(())
}

/// Descriptor of a fixed-amount token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedAmountToken {
    pub scripts: ScriptsConfig,
    pub input_hash: Hash,
    pub rate: u64,
    pub payment_lock_hash: Hash,
    pub issuer_pubkey: Bytes,
}

impl FixedAmountToken {
    /// Describe the token a bootstrap over `rtx`'s inputs would create
    pub fn for_inputs(
        scripts: ScriptsConfig,
        rtx: &ResolvedTransaction,
        rate: u64,
        payment_lock_hash: Hash,
        issuer_pubkey: Bytes,
    ) -> Self {
        Self { scripts, input_hash: input_set_digest(rtx), rate, payment_lock_hash, issuer_pubkey }
    }

    pub fn genesis_lock_args(&self) -> GenesisLockArgs {
        GenesisLockArgs {
            input_hash: self.input_hash,
            rate: self.rate,
            payment_lock_hash: self.payment_lock_hash,
            issuer_pubkey: self.issuer_pubkey.clone(),
        }
    }

    pub fn genesis_lock(&self) -> Script {
        Script::new(self.scripts.genesis_lock, self.genesis_lock_args().encode())
    }

    pub fn type_script(&self) -> Script {
        Script::new(self.scripts.fixed_amount_type, vec![self.input_hash.to_vec(), self.issuer_pubkey.clone()])
    }

    pub fn type_hash(&self) -> Hash {
        self.type_script().hash()
    }

    /// Account lock for holders of this token
    pub fn account_lock(&self, owner_pubkey: Bytes) -> Script {
        let args = LockArgs::Pubkey { label: self.input_hash.to_vec(), pubkey: owner_pubkey };
        Script::new(self.scripts.account_lock, args.encode())
    }

    pub fn cell(&self, capacity: Capacity, amount: u64, lock: Script) -> CellOutput {
        CellOutput::new(capacity, balance_data(amount), lock, Some(self.type_script()))
    }

    pub fn genesis_cell(&self, capacity: Capacity, supply: u64) -> CellOutput {
        self.cell(capacity, supply, self.genesis_lock())
    }

    /// Issuer's bootstrap witness over the transaction as assembled
    pub fn sign_bootstrap(&self, rtx: &ResolvedTransaction, issuer: &PrivateKey) -> Result<Witness> {
        let contract_hash = self.type_hash();
        let digest = bootstrap_digest(rtx, &contract_hash)?;
        Ok(Witness { type_hash: contract_hash, args: vec![issuer.sign(&digest)] })
    }

    /// Issuer-sign the genesis cell consumed by `input_index`
    pub fn sign_genesis_input(
        &self,
        rtx: &mut ResolvedTransaction,
        issuer: &PrivateKey,
        sighash: &SighashType,
        input_index: usize,
    ) -> Result<()> {
        let unlock = sign_input(rtx, issuer, sighash, input_index)?;
        let args = unlock.encode(&self.genesis_lock_args().issuer_lock());
        rtx.transaction.inputs[input_index].args = args;
        Ok(())
    }

    /// Append the genesis cell holding the whole supply and the bootstrap witness
    ///
    /// Outputs added after this call invalidate the witness.
    pub fn bootstrap(
        &self,
        rtx: &mut ResolvedTransaction,
        capacity: Capacity,
        supply: u64,
        issuer: &PrivateKey,
    ) -> Result<()> {
        if input_set_digest(rtx) != self.input_hash {
            return Err(AuthError::HashMismatch("token was described over a different input set".to_string()));
        }
        rtx.transaction.outputs.push(self.genesis_cell(capacity, supply));
        let witness = self.sign_bootstrap(rtx, issuer)?;
        rtx.transaction.witnesses.push(witness);
        Ok(())
    }
}
