//! Whole-transaction verification
//!
//! Runs the structural checks, the capacity rules, every input's lock script
//! and every distinct type script in the transaction. Scripts are dispatched
//! by code hash through a registry built from configuration; an unknown code
//! hash cannot be executed and rejects the transaction.

use crate::account::verify_account_lock;
use crate::capacity::check_outputs_capacity;
use crate::config::{LimitsConfig, ScriptsConfig, VerifierConfig};
use crate::error::{AuthError, Result};
use crate::fixed_amount::{verify_fixed_amount_type, verify_genesis_lock, FixedAmountRequest};
use crate::lock::verify_ownership;
use crate::transaction::{check_capacity_balance, check_transaction};
use crate::types::*;
use crate::udt::{verify_udt, UdtRequest};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Built-in script kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    OwnershipLock,
    AccountLock,
    GenesisLock,
    UdtType,
    FixedAmountType,
}

/// Code hash → script kind
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    kinds: HashMap<Hash, ScriptKind>,
}

impl ScriptRegistry {
    pub fn new(scripts: &ScriptsConfig) -> Self {
        let kinds = HashMap::from([
            (scripts.ownership_lock, ScriptKind::OwnershipLock),
            (scripts.account_lock, ScriptKind::AccountLock),
            (scripts.genesis_lock, ScriptKind::GenesisLock),
            (scripts.udt_type, ScriptKind::UdtType),
            (scripts.fixed_amount_type, ScriptKind::FixedAmountType),
        ]);
        Self { kinds }
    }

    pub fn kind_of(&self, script: &Script) -> Result<ScriptKind> {
        let code_hash = script
            .code_hash
            .ok_or_else(|| AuthError::MalformedInput("script has no code hash to execute".to_string()))?;
        self.kinds
            .get(&code_hash)
            .copied()
            .ok_or_else(|| AuthError::MalformedInput(format!("unknown code hash {}", hex::encode(code_hash))))
    }
}

/// Type scripts of a transaction, unique by hash, in first-seen order
/// (consumed cells first, then outputs)
pub fn distinct_type_scripts(rtx: &ResolvedTransaction) -> Vec<(Hash, &Script)> {
    let mut seen: Vec<(Hash, &Script)> = Vec::new();
    for cell in rtx.resolved_inputs.iter().chain(rtx.outputs()) {
        if let Some(type_script) = &cell.type_ {
            let hash = type_script.hash();
            if !seen.iter().any(|(h, _)| *h == hash) {
                seen.push((hash, type_script));
            }
        }
    }
    seen
}

/// Runs every check a resolved transaction must pass
#[derive(Debug, Clone)]
pub struct TransactionVerifier {
    registry: ScriptRegistry,
    limits: LimitsConfig,
}

impl TransactionVerifier {
    pub fn new(config: &VerifierConfig) -> Self {
        Self { registry: ScriptRegistry::new(&config.scripts), limits: config.limits.clone() }
    }

    /// VerifyTransaction: 𝒯𝒳 → {accept, reject}
    pub fn verify(&self, rtx: &ResolvedTransaction) -> Result<()> {
        let result = self.verify_all(rtx);
        if let Err(e) = &result {
            warn!(error = %e, "transaction rejected");
        }
        result
    }

    fn verify_all(&self, rtx: &ResolvedTransaction) -> Result<()> {
        check_transaction(&rtx.transaction, &self.limits)?;
        if self.limits.enforce_capacity {
            check_outputs_capacity(&rtx.transaction)?;
            check_capacity_balance(rtx)?;
        }

        for index in 0..rtx.inputs().len() {
            self.verify_lock(rtx, index)?;
        }

        let type_scripts = distinct_type_scripts(rtx);
        for witness in &rtx.transaction.witnesses {
            if !type_scripts.iter().any(|(h, _)| *h == witness.type_hash) {
                return Err(AuthError::MalformedInput(format!(
                    "witness addresses absent type {}",
                    hex::encode(witness.type_hash)
                )));
            }
        }
        for (hash, type_script) in type_scripts {
            self.verify_type(type_script, rtx, rtx.transaction.witness_args(&hash))?;
        }

        debug!(inputs = rtx.inputs().len(), outputs = rtx.outputs().len(), "transaction verified");
        Ok(())
    }

    /// Run the lock script of the cell consumed by `input_index`
    pub fn verify_lock(&self, rtx: &ResolvedTransaction, input_index: usize) -> Result<()> {
        let lock = &rtx.input_cell(input_index)?.lock;
        let kind = self.registry.kind_of(lock)?;
        debug!(input_index, ?kind, "running lock script");
        match kind {
            ScriptKind::OwnershipLock => verify_ownership(lock, rtx, input_index),
            ScriptKind::AccountLock => verify_account_lock(lock, rtx, input_index),
            ScriptKind::GenesisLock => verify_genesis_lock(lock, rtx, input_index),
            ScriptKind::UdtType | ScriptKind::FixedAmountType => Err(AuthError::MalformedInput(format!(
                "input {} is locked by a type script",
                input_index
            ))),
        }
    }

    /// Run one type script with the witness arguments addressed to it
    pub fn verify_type(
        &self,
        type_script: &Script,
        rtx: &ResolvedTransaction,
        witness_args: Option<&[Bytes]>,
    ) -> Result<()> {
        let kind = self.registry.kind_of(type_script)?;
        debug!(?kind, "running type script");
        match kind {
            ScriptKind::UdtType => verify_udt(type_script, rtx, &UdtRequest::decode(witness_args)?),
            ScriptKind::FixedAmountType => {
                verify_fixed_amount_type(type_script, rtx, &FixedAmountRequest::decode(witness_args)?)
            }
            ScriptKind::OwnershipLock | ScriptKind::AccountLock | ScriptKind::GenesisLock => {
                Err(AuthError::MalformedInput(format!("{:?} used as a type script", kind)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_scripts;
    use crate::lock::{owner_lock, sign_inputs};
    use crate::sighash::SighashType;
    use crate::signing::PrivateKey;
    use crate::udt::UdtToken;

    fn key() -> PrivateKey {
        PrivateKey::from_slice(&[0x66; 32]).unwrap()
    }

    fn verifier() -> TransactionVerifier {
        TransactionVerifier::new(&VerifierConfig::new(test_scripts()))
    }

    fn transfer(inputs: Vec<CellOutput>, outputs: Vec<CellOutput>) -> ResolvedTransaction {
        let tx = Transaction {
            version: 0,
            inputs: (0..inputs.len())
                .map(|i| CellInput::new(OutPoint::new([0xa0 + i as u8; 32], 0), vec![]))
                .collect(),
            outputs,
            ..Default::default()
        };
        ResolvedTransaction::new(tx, inputs).unwrap()
    }

    fn plain(capacity: Capacity) -> CellOutput {
        CellOutput::new(capacity, vec![], owner_lock(test_scripts().ownership_lock, &key()), None)
    }

    #[test]
    fn test_signed_transfer_verifies() {
        let mut rtx = transfer(vec![plain(1000)], vec![plain(400), plain(600)]);
        sign_inputs(&mut rtx, &key(), &SighashType::all(), &[0]).unwrap();
        assert!(verifier().verify(&rtx).is_ok());
    }

    #[test]
    fn test_unsigned_input_rejected() {
        let rtx = transfer(vec![plain(1000)], vec![plain(1000)]);
        assert!(matches!(verifier().verify(&rtx), Err(AuthError::MalformedInput(_))));
    }

    #[test]
    fn test_capacity_rules_enforced() {
        let mut created = transfer(vec![plain(1000)], vec![plain(1001)]);
        sign_inputs(&mut created, &key(), &SighashType::all(), &[0]).unwrap();
        assert!(matches!(verifier().verify(&created), Err(AuthError::CapacityInsufficient(_))));

        let mut dust = transfer(vec![plain(1000)], vec![plain(10)]);
        sign_inputs(&mut dust, &key(), &SighashType::all(), &[0]).unwrap();
        assert!(matches!(verifier().verify(&dust), Err(AuthError::CapacityInsufficient(_))));

        let mut config = VerifierConfig::new(test_scripts());
        config.limits.enforce_capacity = false;
        assert!(TransactionVerifier::new(&config).verify(&dust).is_ok());
    }

    #[test]
    fn test_unknown_code_hash_rejected() {
        let stranger = CellOutput::new(1000, vec![], Script::new([0xee; 32], vec![]), None);
        let rtx = transfer(vec![stranger], vec![plain(500)]);
        assert!(matches!(verifier().verify(&rtx), Err(AuthError::MalformedInput(_))));
    }

    #[test]
    fn test_type_script_as_lock_rejected() {
        let misplaced = CellOutput::new(1000, vec![], Script::new(test_scripts().udt_type, vec![]), None);
        let rtx = transfer(vec![misplaced], vec![plain(500)]);
        assert!(verifier().verify_lock(&rtx, 0).is_err());
    }

    #[test]
    fn test_lock_script_as_type_rejected() {
        let rtx = transfer(vec![plain(1000)], vec![plain(1000)]);
        let misplaced = Script::new(test_scripts().account_lock, vec![]);
        assert!(matches!(
            verifier().verify_type(&misplaced, &rtx, None),
            Err(AuthError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_udt_mint_rejected_by_verifier() {
        let token = UdtToken::new(test_scripts(), b"coin".to_vec(), key().public_key());
        let owner = token.lock(key().public_key());
        let mut rtx = transfer(
            vec![token.cell(500, 10, owner.clone())],
            vec![token.cell(500, 11, owner)],
        );
        sign_inputs(&mut rtx, &key(), &SighashType::all(), &[0]).unwrap();
        assert!(matches!(verifier().verify(&rtx), Err(AuthError::ConservationViolation(_))));
    }

    #[test]
    fn test_orphan_witness_rejected() {
        let mut rtx = transfer(vec![plain(1000)], vec![plain(1000)]);
        rtx.transaction.witnesses.push(Witness { type_hash: [0x77; 32], args: vec![vec![1]] });
        sign_inputs(&mut rtx, &key(), &SighashType::all(), &[0]).unwrap();
        assert!(matches!(verifier().verify(&rtx), Err(AuthError::MalformedInput(_))));
    }

    #[test]
    fn test_distinct_type_scripts_order() {
        let a = UdtToken::new(test_scripts(), b"a".to_vec(), vec![2; 33]);
        let b = UdtToken::new(test_scripts(), b"b".to_vec(), vec![2; 33]);
        let lock = a.lock(vec![2; 33]);
        let rtx = transfer(
            vec![b.cell(500, 1, lock.clone())],
            vec![a.cell(500, 1, lock.clone()), b.cell(500, 1, lock)],
        );
        let hashes: Vec<Hash> = distinct_type_scripts(&rtx).into_iter().map(|(h, _)| h).collect();
        assert_eq!(hashes, vec![b.type_hash(), a.type_hash()]);
    }
}
