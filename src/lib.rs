//! # Cell-Auth
//!
//! Transaction authorization for a cell-based ledger.
//!
//! A cell is an output carrying capacity, a data payload, a lock script that
//! decides who may spend it, and an optional type script that constrains how
//! it may be transformed. This crate implements the deterministic core those
//! scripts are made of: script identity, sighash digests, ownership locks,
//! user-defined token (UDT) contracts and the fixed-supply token bootstrap.
//!
//! ## Architecture
//!
//! Leaves first:
//! - `hash`: Blake2b-256 with the ledger personalization
//! - `script`: script identity and serialized size
//! - `types`, `capacity`: cells, transactions and the capacity rule
//! - `sighash`: digest scope selection (ALL, NONE, SINGLE, MULTIPLE, ANYONECANPAY)
//! - `lock`, `account`: ownership locks
//! - `udt`, `fixed_amount`: token contracts
//! - `verifier`: dispatches every script of a resolved transaction
//! - `provider`: ledger collaborator traits and an in-memory ledger
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every verifier takes the resolved transaction explicitly
//! 2. **Fail Closed**: any failed check rejects the whole transaction
//! 3. **Exact Version Pinning**: authorization-critical cryptography pinned to exact versions
//! 4. **Byte Compatibility**: digests match the deployed scripts byte for byte
//!
//! ## Usage
//!
//! ```rust
//! use cell_auth::lock::{owner_lock, sign_inputs};
//! use cell_auth::*;
//!
//! let scripts = ScriptsConfig {
//!     ownership_lock: [1; 32],
//!     account_lock: [2; 32],
//!     genesis_lock: [3; 32],
//!     udt_type: [4; 32],
//!     fixed_amount_type: [5; 32],
//! };
//! let core = AuthorizationCore::new(VerifierConfig::new(scripts.clone()));
//!
//! let key = PrivateKey::from_slice(&[7; 32])?;
//! let lock = owner_lock(scripts.ownership_lock, &key);
//! let tx = Transaction {
//!     version: 0,
//!     inputs: vec![CellInput::new(OutPoint::new([9; 32], 0), vec![])],
//!     outputs: vec![CellOutput::new(900, vec![], lock.clone(), None)],
//!     ..Default::default()
//! };
//! let mut rtx = ResolvedTransaction::new(tx, vec![CellOutput::new(1000, vec![], lock, None)])?;
//! sign_inputs(&mut rtx, &key, &SighashType::all(), &[0])?;
//!
//! assert_eq!(core.verify_transaction(&rtx)?, ValidationResult::Valid);
//! # Ok::<(), AuthError>(())
//! ```

pub mod types;
pub mod constants;
pub mod hash;
pub mod encoding;
pub mod script;
pub mod capacity;
pub mod signing;
pub mod sighash;
pub mod lock;
pub mod account;
pub mod udt;
pub mod fixed_amount;
pub mod transaction;
pub mod config;
pub mod verifier;
pub mod provider;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{AuthError, Result};
pub use config::{LimitsConfig, ScriptsConfig, VerifierConfig};
pub use script::script_hash;
pub use sighash::{OutputScope, SighashType};
pub use signing::PrivateKey;
pub use verifier::TransactionVerifier;
pub use provider::{CellProvider, LedgerClient, LiveCell, MemoryLedger};

/// Map a check outcome onto the facade's result shape: rule violations
/// become `Invalid`, failures to evaluate stay errors
fn classify(outcome: Result<()>) -> Result<ValidationResult> {
    match outcome {
        Ok(()) => Ok(ValidationResult::Valid),
        Err(e) if e.is_rejection() => Ok(ValidationResult::Invalid(e)),
        Err(e) => Err(e),
    }
}

/// Main authorization entry point
///
/// # Examples
///
/// ```
/// use cell_auth::*;
///
/// let scripts = ScriptsConfig {
///     ownership_lock: [1; 32],
///     account_lock: [2; 32],
///     genesis_lock: [3; 32],
///     udt_type: [4; 32],
///     fixed_amount_type: [5; 32],
/// };
/// let core = AuthorizationCore::new(VerifierConfig::new(scripts));
///
/// let script = Script::new([1; 32], vec![b"arg".to_vec()]);
/// assert_eq!(core.derive_script_hash(&script), script_hash(&script));
/// ```
#[derive(Debug, Clone)]
pub struct AuthorizationCore {
    config: VerifierConfig,
    verifier: TransactionVerifier,
}

impl AuthorizationCore {
    pub fn new(config: VerifierConfig) -> Self {
        let verifier = TransactionVerifier::new(&config);
        Self { config, verifier }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn verifier(&self) -> &TransactionVerifier {
        &self.verifier
    }

    /// Identity of a script, as used for lock and type hashes
    pub fn derive_script_hash(&self, script: &Script) -> Hash {
        script_hash(script)
    }

    /// Digest an input's signature must cover
    pub fn compute_sighash(
        &self,
        rtx: &ResolvedTransaction,
        sighash: &SighashType,
        current_input: Option<usize>,
    ) -> Result<Hash> {
        crate::sighash::compute_sighash(rtx, sighash, current_input)
    }

    /// DER signature over `digest`
    pub fn sign(&self, key: &PrivateKey, digest: &Hash) -> Bytes {
        key.sign(digest)
    }

    /// Check the signature unlocking `lock` at `input_index`
    ///
    /// # Examples
    ///
    /// ```
    /// use cell_auth::*;
    ///
    /// # let scripts = ScriptsConfig {
    /// #     ownership_lock: [1; 32],
    /// #     account_lock: [2; 32],
    /// #     genesis_lock: [3; 32],
    /// #     udt_type: [4; 32],
    /// #     fixed_amount_type: [5; 32],
    /// # };
    /// let core = AuthorizationCore::new(VerifierConfig::new(scripts));
    /// let key = PrivateKey::from_slice(&[7; 32])?;
    /// let lock = cell_auth::lock::owner_lock([1; 32], &key);
    /// let tx = Transaction {
    ///     version: 0,
    ///     inputs: vec![CellInput::new(OutPoint::new([9; 32], 0), vec![])],
    ///     outputs: vec![CellOutput::new(900, vec![], lock.clone(), None)],
    ///     ..Default::default()
    /// };
    /// let rtx = ResolvedTransaction::new(tx, vec![CellOutput::new(1000, vec![], lock.clone(), None)])?;
    ///
    /// // No signature yet
    /// let result = core.verify_ownership(&lock, &rtx, 0)?;
    /// assert!(!result.is_valid());
    /// # Ok::<(), AuthError>(())
    /// ```
    pub fn verify_ownership(
        &self,
        lock: &Script,
        rtx: &ResolvedTransaction,
        input_index: usize,
    ) -> Result<ValidationResult> {
        classify(crate::lock::verify_ownership(lock, rtx, input_index))
    }

    /// Run whichever lock guards the cell consumed by `input_index`
    pub fn verify_input(&self, rtx: &ResolvedTransaction, input_index: usize) -> Result<ValidationResult> {
        classify(self.verifier.verify_lock(rtx, input_index))
    }

    /// Run a UDT contract with the witness the transaction addresses to it
    pub fn verify_udt(&self, type_script: &Script, rtx: &ResolvedTransaction) -> Result<ValidationResult> {
        let outcome = udt::UdtRequest::decode(rtx.transaction.witness_args(&type_script.hash()))
            .and_then(|request| udt::verify_udt(type_script, rtx, &request));
        classify(outcome)
    }

    /// Run every check on a resolved transaction
    pub fn verify_transaction(&self, rtx: &ResolvedTransaction) -> Result<ValidationResult> {
        classify(self.verifier.verify(rtx))
    }

    /// Resolve inputs through `provider`, then verify
    ///
    /// Missing cells are an error, not a verdict.
    pub fn verify_with_provider<P: CellProvider + ?Sized>(
        &self,
        tx: Transaction,
        provider: &P,
    ) -> Result<ValidationResult> {
        let rtx = crate::provider::resolve_transaction(tx, provider)?;
        self.verify_transaction(&rtx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_scripts;
    use crate::lock::{owner_lock, sign_inputs};
    use crate::udt::UdtToken;

    fn core() -> AuthorizationCore {
        AuthorizationCore::new(VerifierConfig::new(test_scripts()))
    }

    fn key() -> PrivateKey {
        PrivateKey::from_slice(&[0x77; 32]).unwrap()
    }

    fn rtx() -> ResolvedTransaction {
        let lock = owner_lock(test_scripts().ownership_lock, &key());
        let tx = Transaction {
            version: 0,
            inputs: vec![CellInput::new(OutPoint::new([3; 32], 0), vec![])],
            outputs: vec![CellOutput::new(500, vec![], lock.clone(), None)],
            ..Default::default()
        };
        ResolvedTransaction::new(tx, vec![CellOutput::new(500, vec![], lock, None)]).unwrap()
    }

    #[test]
    fn test_verify_transaction_valid() {
        let mut rtx = rtx();
        sign_inputs(&mut rtx, &key(), &SighashType::all(), &[0]).unwrap();
        assert_eq!(core().verify_transaction(&rtx).unwrap(), ValidationResult::Valid);
        assert!(core().verify_input(&rtx, 0).unwrap().is_valid());
    }

    #[test]
    fn test_rejection_reported_as_invalid() {
        let result = core().verify_transaction(&rtx()).unwrap();
        assert!(matches!(result, ValidationResult::Invalid(AuthError::MalformedInput(_))));
    }

    #[test]
    fn test_sign_matches_compute_sighash() {
        let core = core();
        let rtx = rtx();
        let digest = core.compute_sighash(&rtx, &SighashType::none(), None).unwrap();
        let signature = core.sign(&key(), &digest);
        assert!(signing::verify_signature(&key().public_key(), &signature, &digest).is_ok());
    }

    #[test]
    fn test_verify_udt_reads_witness() {
        let core = core();
        let token = UdtToken::new(test_scripts(), b"coin".to_vec(), key().public_key());
        let lock = token.lock(key().public_key());
        let tx = Transaction {
            version: 0,
            inputs: vec![CellInput::new(OutPoint::new([3; 32], 0), vec![])],
            outputs: vec![token.cell(500, 50, lock.clone())],
            ..Default::default()
        };
        let mut rtx = ResolvedTransaction::new(tx, vec![token.cell(500, 10, lock)]).unwrap();
        assert!(!core.verify_udt(&token.type_script(), &rtx).unwrap().is_valid());

        let witness = udt::sign_supermode(&rtx, &token.type_script(), &key()).unwrap();
        rtx.transaction.witnesses.push(witness);
        assert!(core.verify_udt(&token.type_script(), &rtx).unwrap().is_valid());
    }

    #[test]
    fn test_missing_cell_is_error() {
        let ledger = MemoryLedger::new();
        let result = core().verify_with_provider(rtx().transaction, &ledger);
        assert!(matches!(result, Err(AuthError::CellNotFound(_))));
    }

    #[test]
    fn test_derive_script_hash() {
        let script = Script::new([1; 32], vec![b"a".to_vec()]);
        assert_eq!(core().derive_script_hash(&script), script.hash());
    }
}
