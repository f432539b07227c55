//! Script identity: the canonical hash of a code reference plus arguments
//!
//! The script hash is the address space of the system. It names lock
//! scripts (who may spend a cell) and type scripts (which contract governs
//! a cell), so two scripts with the same code hash and arguments are
//! interchangeable for every authorization purpose.

use crate::constants::SCRIPT_SIZE_OVERHEAD;
use crate::hash::Hasher;
use crate::types::*;

/// ScriptHash: 𝒮 → ℍ
///
/// script_hash(s) = H(s.code_hash? ‖ s.args[0] ‖ … ‖ s.args[n-1])
///
/// A missing code hash contributes nothing; an empty argument list is the
/// digest of the code hash alone.
pub fn script_hash(script: &Script) -> Hash {
    let mut hasher = Hasher::new();
    if let Some(code_hash) = &script.code_hash {
        hasher.update(code_hash);
    }
    for arg in &script.args {
        hasher.update(arg);
    }
    hasher.finalize()
}

/// Serialized size of a script as charged against cell capacity
///
/// size(s) = 1 + |s.code_hash| + Σ |arg|
pub fn script_serialized_size(script: &Script) -> u64 {
    let code = script.code_hash.map(|h| h.len() as u64).unwrap_or(0);
    let args: u64 = script.args.iter().map(|a| a.len() as u64).sum();
    SCRIPT_SIZE_OVERHEAD + code + args
}

impl Script {
    pub fn hash(&self) -> Hash {
        script_hash(self)
    }

    pub fn serialized_size(&self) -> u64 {
        script_serialized_size(self)
    }
}

impl CellOutput {
    pub fn lock_hash(&self) -> Hash {
        self.lock.hash()
    }

    /// Type hash, present only when the cell carries a type script
    pub fn type_hash(&self) -> Option<Hash> {
        self.type_.as_ref().map(Script::hash)
    }
}
