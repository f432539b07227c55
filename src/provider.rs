//! Ledger collaborator interfaces
//!
//! The authorization core never talks to a node itself. Callers resolve the
//! cells a transaction consumes through a [`CellProvider`] and submit through
//! a [`LedgerClient`]. [`MemoryLedger`] implements both in process.

use crate::error::{AuthError, Result};
use crate::transaction::transaction_hash;
use crate::types::*;
use crate::verifier::TransactionVerifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Source of previously created cells
pub trait CellProvider {
    fn resolve_cell(&self, out_point: &OutPoint) -> Result<CellOutput>;
}

/// A live cell as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCell {
    pub out_point: OutPoint,
    pub output: CellOutput,
    pub block_number: u64,
}

/// Ledger RPC surface used by wallets
pub trait LedgerClient: CellProvider {
    /// Submit a transaction, returning its hash
    fn submit_transaction(&self, tx: &Transaction) -> Result<Hash>;

    /// Live cells under `lock_hash` created in blocks `from..=to`
    fn cells_by_lock_hash(&self, lock_hash: &Hash, from: u64, to: u64) -> Result<Vec<LiveCell>>;

    fn tip_number(&self) -> Result<u64>;
}

/// Pair a transaction with the cells its inputs consume
pub fn resolve_transaction<P: CellProvider + ?Sized>(tx: Transaction, provider: &P) -> Result<ResolvedTransaction> {
    let cells = tx
        .inputs
        .iter()
        .map(|input| provider.resolve_cell(&input.previous_output))
        .collect::<Result<Vec<_>>>()?;
    ResolvedTransaction::new(tx, cells)
}

#[derive(Debug, Default)]
struct LedgerState {
    live: HashMap<OutPoint, LiveCell>,
    tip: u64,
}

/// In-memory ledger: one block per submitted transaction
///
/// With a verifier attached, submissions are verified before they apply.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    verifier: Option<TransactionVerifier>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verifier(verifier: TransactionVerifier) -> Self {
        Self { state: RwLock::default(), verifier: Some(verifier) }
    }

    /// Create a cell out of thin air at block 0
    pub fn insert_cell(&self, out_point: OutPoint, output: CellOutput) -> Result<()> {
        let mut state = self.state.write().map_err(|_| AuthError::Ledger("ledger lock poisoned".to_string()))?;
        state.live.insert(out_point, LiveCell { out_point, output, block_number: 0 });
        Ok(())
    }

    pub fn live_cell_count(&self) -> Result<usize> {
        let state = self.state.read().map_err(|_| AuthError::Ledger("ledger lock poisoned".to_string()))?;
        Ok(state.live.len())
    }
}

impl CellProvider for MemoryLedger {
    fn resolve_cell(&self, out_point: &OutPoint) -> Result<CellOutput> {
        let state = self.state.read().map_err(|_| AuthError::Ledger("ledger lock poisoned".to_string()))?;
        state.live.get(out_point).map(|cell| cell.output.clone()).ok_or_else(|| {
            AuthError::CellNotFound(format!("{}:{}", hex::encode(out_point.tx_hash), out_point.index))
        })
    }
}

impl LedgerClient for MemoryLedger {
    fn submit_transaction(&self, tx: &Transaction) -> Result<Hash> {
        let mut state = self.state.write().map_err(|_| AuthError::Ledger("ledger lock poisoned".to_string()))?;

        let mut cells = Vec::with_capacity(tx.inputs.len());
        for (i, input) in tx.inputs.iter().enumerate() {
            if tx.inputs[..i].iter().any(|other| other.previous_output == input.previous_output) {
                return Err(AuthError::StructuralViolation(format!("input {} spends a cell twice", i)));
            }
            let cell = state.live.get(&input.previous_output).ok_or_else(|| {
                AuthError::CellNotFound(format!(
                    "{}:{}",
                    hex::encode(input.previous_output.tx_hash),
                    input.previous_output.index
                ))
            })?;
            cells.push(cell.output.clone());
        }

        if let Some(verifier) = &self.verifier {
            let rtx = ResolvedTransaction::new(tx.clone(), cells)?;
            verifier.verify(&rtx)?;
        }

        let tx_hash = transaction_hash(tx);
        let block_number = state.tip + 1;
        for input in &tx.inputs {
            state.live.remove(&input.previous_output);
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            let out_point = OutPoint::new(tx_hash, index as u32);
            state.live.insert(out_point, LiveCell { out_point, output: output.clone(), block_number });
        }
        state.tip = block_number;
        debug!(tx_hash = %hex::encode(tx_hash), block_number, "transaction committed");
        Ok(tx_hash)
    }

    fn cells_by_lock_hash(&self, lock_hash: &Hash, from: u64, to: u64) -> Result<Vec<LiveCell>> {
        let state = self.state.read().map_err(|_| AuthError::Ledger("ledger lock poisoned".to_string()))?;
        let mut cells: Vec<LiveCell> = state
            .live
            .values()
            .filter(|cell| (from..=to).contains(&cell.block_number) && &cell.output.lock_hash() == lock_hash)
            .cloned()
            .collect();
        cells.sort_by_key(|cell| (cell.block_number, cell.out_point.tx_hash, cell.out_point.index));
        Ok(cells)
    }

    fn tip_number(&self) -> Result<u64> {
        let state = self.state.read().map_err(|_| AuthError::Ledger("ledger lock poisoned".to_string()))?;
        Ok(state.tip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock(n: u8) -> Script {
        Script::new([n; 32], vec![vec![n; 32]])
    }

    fn seeded() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.insert_cell(OutPoint::new([1; 32], 0), CellOutput::new(1000, vec![], lock(1), None)).unwrap();
        ledger
    }

    fn spend(out_point: OutPoint, to: u8) -> Transaction {
        Transaction {
            version: 0,
            inputs: vec![CellInput::new(out_point, vec![])],
            outputs: vec![CellOutput::new(600, vec![], lock(to), None), CellOutput::new(400, vec![], lock(1), None)],
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_transaction() {
        let ledger = seeded();
        let rtx = resolve_transaction(spend(OutPoint::new([1; 32], 0), 2), &ledger).unwrap();
        assert_eq!(rtx.resolved_inputs[0].capacity, 1000);

        let missing = resolve_transaction(spend(OutPoint::new([1; 32], 1), 2), &ledger);
        assert!(matches!(missing, Err(AuthError::CellNotFound(_))));
    }

    #[test]
    fn test_submit_moves_cells() {
        let ledger = seeded();
        let tx = spend(OutPoint::new([1; 32], 0), 2);
        let tx_hash = ledger.submit_transaction(&tx).unwrap();
        assert_eq!(tx_hash, transaction_hash(&tx));
        assert_eq!(ledger.tip_number().unwrap(), 1);
        assert_eq!(ledger.live_cell_count().unwrap(), 2);

        let mine = ledger.cells_by_lock_hash(&lock(1).hash(), 1, 1).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].out_point, OutPoint::new(tx_hash, 1));
        assert!(ledger.cells_by_lock_hash(&lock(1).hash(), 0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_double_spend_rejected() {
        let ledger = seeded();
        let tx = spend(OutPoint::new([1; 32], 0), 2);
        ledger.submit_transaction(&tx).unwrap();
        assert!(matches!(ledger.submit_transaction(&tx), Err(AuthError::CellNotFound(_))));

        let mut twice = spend(OutPoint::new([1; 32], 0), 3);
        twice.inputs.push(twice.inputs[0].clone());
        assert!(seeded().submit_transaction(&twice).is_err());
    }
}
