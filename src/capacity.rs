//! Cell capacity model
//!
//! Every output must declare at least as much capacity as its own
//! serialized size occupies on the ledger.

use crate::constants::CELL_CAPACITY_OVERHEAD;
use crate::error::{AuthError, Result};
use crate::types::*;

/// MinimumCapacity: 𝒪𝓊𝓉 → ℕ
///
/// min(o) = 8 + |o.data| + size(o.lock) + size(o.type)?
pub fn minimum_capacity(output: &CellOutput) -> Capacity {
    let mut capacity = CELL_CAPACITY_OVERHEAD + output.data.len() as u64 + output.lock.serialized_size();
    if let Some(type_) = &output.type_ {
        capacity += type_.serialized_size();
    }
    capacity
}

/// Reject an output whose declared capacity cannot pay for itself
pub fn check_output_capacity(output: &CellOutput, index: usize) -> Result<()> {
    let needed = minimum_capacity(output);
    if output.capacity < needed {
        return Err(AuthError::CapacityInsufficient(format!(
            "output {} declares {} but needs {}",
            index, output.capacity, needed
        )));
    }
    Ok(())
}

/// Check every output of a transaction
pub fn check_outputs_capacity(tx: &Transaction) -> Result<()> {
    for (i, output) in tx.outputs.iter().enumerate() {
        check_output_capacity(output, i)?;
    }
    Ok(())
}

/// Total declared capacity of a set of cells
pub fn total_capacity<'a, I>(cells: I) -> u128
where
    I: IntoIterator<Item = &'a CellOutput>,
{
    cells.into_iter().map(|c| c.capacity as u128).sum()
}
