//! Verifier configuration
//!
//! Scripts are identified on chain by the code hash of their binary. The
//! verifier needs to know which code hash means which built-in script, so
//! the mapping is loaded from configuration rather than compiled in.

use crate::constants::{MAX_INPUTS, MAX_OUTPUTS};
use crate::encoding::hex_hash;
use crate::error::{AuthError, Result};
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Code hashes of the deployed scripts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptsConfig {
    /// Signature-only ownership lock
    #[serde(with = "hex_hash")]
    pub ownership_lock: Hash,

    /// Ownership lock that also accepts unsigned deposits
    #[serde(with = "hex_hash")]
    pub account_lock: Hash,

    /// Lock guarding a fixed-amount token's genesis cell
    #[serde(with = "hex_hash")]
    pub genesis_lock: Hash,

    /// Plain UDT contract
    #[serde(with = "hex_hash")]
    pub udt_type: Hash,

    /// Fixed-amount UDT contract
    #[serde(with = "hex_hash")]
    pub fixed_amount_type: Hash,
}

impl ScriptsConfig {
    /// Every configured code hash must be distinct
    pub fn validate(&self) -> Result<()> {
        let hashes = self.entries();
        for (i, (name, hash)) in hashes.iter().enumerate() {
            if let Some((other, _)) = hashes[i + 1..].iter().find(|(_, h)| h == hash) {
                return Err(AuthError::Config(format!("{} and {} share a code hash", name, other)));
            }
        }
        Ok(())
    }

    pub(crate) fn entries(&self) -> [(&'static str, Hash); 5] {
        [
            ("ownership_lock", self.ownership_lock),
            ("account_lock", self.account_lock),
            ("genesis_lock", self.genesis_lock),
            ("udt_type", self.udt_type),
            ("fixed_amount_type", self.fixed_amount_type),
        ]
    }
}

/// Structural limits applied before any script runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    #[serde(default = "default_max_inputs")]
    pub max_inputs: usize,

    #[serde(default = "default_max_outputs")]
    pub max_outputs: usize,

    /// Reject outputs whose capacity is below their serialized size
    #[serde(default = "default_enforce_capacity")]
    pub enforce_capacity: bool,
}

fn default_max_inputs() -> usize {
    MAX_INPUTS
}

fn default_max_outputs() -> usize {
    MAX_OUTPUTS
}

fn default_enforce_capacity() -> bool {
    true
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_inputs: default_max_inputs(),
            max_outputs: default_max_outputs(),
            enforce_capacity: default_enforce_capacity(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifierConfig {
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

impl VerifierConfig {
    pub fn new(scripts: ScriptsConfig) -> Self {
        Self { scripts, limits: LimitsConfig::default() }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VerifierConfig = toml::from_str(content).map_err(|e| AuthError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| AuthError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.scripts.validate()?;
        if self.limits.max_inputs == 0 || self.limits.max_outputs == 0 {
            return Err(AuthError::Config("input and output limits must be non-zero".to_string()));
        }
        Ok(())
    }
}
