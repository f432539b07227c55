//! Transaction structure checks and transaction identity

use crate::capacity::total_capacity;
use crate::config::LimitsConfig;
use crate::error::{AuthError, Result};
use crate::hash::Hasher;
use crate::types::*;

/// CheckTransaction: 𝒯𝒳 → {valid, invalid}
///
/// A transaction tx = (v, deps, ins, outs, ws) is well formed if and only if:
/// 1. |ins| > 0 ∧ |outs| > 0
/// 2. |ins| ≤ limits.max_inputs
/// 3. |outs| ≤ limits.max_outputs
/// 4. each witness addresses a distinct type hash
pub fn check_transaction(tx: &Transaction, limits: &LimitsConfig) -> Result<()> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(AuthError::StructuralViolation("empty inputs or outputs".to_string()));
    }

    if tx.inputs.len() > limits.max_inputs {
        return Err(AuthError::StructuralViolation(format!("too many inputs: {}", tx.inputs.len())));
    }

    if tx.outputs.len() > limits.max_outputs {
        return Err(AuthError::StructuralViolation(format!("too many outputs: {}", tx.outputs.len())));
    }

    for (i, witness) in tx.witnesses.iter().enumerate() {
        if tx.witnesses[..i].iter().any(|w| w.type_hash == witness.type_hash) {
            return Err(AuthError::MalformedInput(format!(
                "witness {} repeats type hash {}",
                i,
                hex::encode(witness.type_hash)
            )));
        }
    }

    Ok(())
}

/// CheckCapacityBalance: 𝒯𝒳 → {valid, invalid} × ℕ
///
/// Σ capacity(outs) ≤ Σ capacity(consumed cells); returns the difference.
pub fn check_capacity_balance(rtx: &ResolvedTransaction) -> Result<u128> {
    let total_in = total_capacity(&rtx.resolved_inputs);
    let total_out = total_capacity(rtx.outputs());
    if total_out > total_in {
        return Err(AuthError::CapacityInsufficient(format!(
            "outputs hold {} capacity but inputs only {}",
            total_out, total_in
        )));
    }
    Ok(total_in - total_out)
}

fn update_len_prefixed(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_out_point(hasher: &mut Hasher, out_point: &OutPoint) {
    hasher.update(&out_point.tx_hash);
    hasher.update(&out_point.index.to_le_bytes());
}

/// TransactionHash: 𝒯𝒳 → ℍ
///
/// Covers version, deps, inputs (out point, unlock arguments, since) and
/// outputs (capacity, data, lock hash, type hash). Witnesses are excluded.
pub fn transaction_hash(tx: &Transaction) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(&tx.version.to_le_bytes());

    hasher.update(&(tx.deps.len() as u64).to_le_bytes());
    for dep in &tx.deps {
        update_out_point(&mut hasher, dep);
    }

    hasher.update(&(tx.inputs.len() as u64).to_le_bytes());
    for input in &tx.inputs {
        update_out_point(&mut hasher, &input.previous_output);
        hasher.update(&(input.args.len() as u64).to_le_bytes());
        for arg in &input.args {
            update_len_prefixed(&mut hasher, arg);
        }
        hasher.update(&input.since.to_le_bytes());
    }

    hasher.update(&(tx.outputs.len() as u64).to_le_bytes());
    for output in &tx.outputs {
        hasher.update(&output.capacity.to_le_bytes());
        update_len_prefixed(&mut hasher, &output.data);
        hasher.update(&output.lock_hash());
        match output.type_hash() {
            Some(type_hash) => hasher.update(&[1]).update(&type_hash),
            None => hasher.update(&[0]),
        };
    }

    hasher.finalize()
}
