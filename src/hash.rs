//! Streaming digest used for every commitment in the system
//!
//! Blake2b-256 personalized with `ckb-default-hash`. Integers that take part
//! in a commitment are written as their ASCII decimal rendering.

use crate::constants::{HASH_PERSONALIZATION, HASH_SIZE};
use crate::types::Hash;
use blake2b_simd::{Params, State};

/// Incremental hasher: update* then finalize
#[derive(Clone)]
pub struct Hasher {
    state: State,
}

impl Hasher {
    pub fn new() -> Self {
        let state = Params::new()
            .hash_length(HASH_SIZE)
            .personal(HASH_PERSONALIZATION)
            .to_state();
        Self { state }
    }

    /// Feed raw bytes
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(data);
        self
    }

    /// Feed an integer as its decimal string, e.g. `129` → `b"129"`
    pub fn update_decimal<N: std::fmt::Display>(&mut self, value: N) -> &mut Self {
        self.state.update(value.to_string().as_bytes());
        self
    }

    pub fn finalize(&self) -> Hash {
        let result = self.state.finalize();
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(result.as_bytes());
        hash
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot digest
pub fn blake2b_256(data: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut hasher = Hasher::new();
        hasher.update(b"hello ").update(b"world");
        assert_eq!(hasher.finalize(), blake2b_256(b"hello world"));
    }

    #[test]
    fn test_decimal_encoding() {
        let mut a = Hasher::new();
        a.update_decimal(129u8);
        assert_eq!(a.finalize(), blake2b_256(b"129"));
    }

    #[test]
    fn test_personalization_applied() {
        let plain = blake2b_simd::Params::new().hash_length(32).hash(b"");
        assert_ne!(blake2b_256(b"").as_slice(), plain.as_bytes());
    }

    #[test]
    fn test_empty_digest_is_stable() {
        assert_eq!(Hasher::new().finalize(), blake2b_256(&[]));
        assert_ne!(blake2b_256(&[]), [0u8; 32]);
    }
}
