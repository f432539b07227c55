//! Ledger authorization constants

/// Blake2b personalization used for every digest in the system
pub const HASH_PERSONALIZATION: &[u8; 16] = b"ckb-default-hash";

/// Digest length in bytes
pub const HASH_SIZE: usize = 32;

/// Fixed per-cell overhead: the capacity field itself
pub const CELL_CAPACITY_OVERHEAD: u64 = 8;

/// Fixed per-script overhead in serialized size
pub const SCRIPT_SIZE_OVERHEAD: u64 = 1;

/// Size of the UDT balance field at the start of cell data
pub const UDT_BALANCE_SIZE: usize = 8;

/// Sign over all inputs and all outputs
pub const SIGHASH_ALL: u8 = 0x1;

/// Sign over all inputs and no outputs
pub const SIGHASH_NONE: u8 = 0x2;

/// Sign over all inputs and one designated output
pub const SIGHASH_SINGLE: u8 = 0x3;

/// Sign over all inputs and a chosen list of outputs
pub const SIGHASH_MULTIPLE: u8 = 0x4;

/// Modifier: restrict the input scope to the current input
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Separator between output indices in SIGHASH_MULTIPLE metadata
pub const OUTPUT_INDEX_SEPARATOR: &str = ",";

/// Default maximum number of inputs per transaction
pub const MAX_INPUTS: usize = 1000;

/// Default maximum number of outputs per transaction
pub const MAX_OUTPUTS: usize = 1000;
