//! secp256k1 ECDSA signing and verification over 32-byte digests
//!
//! Signatures travel in DER form; public keys in 33-byte compressed form.

use crate::encoding::from_prefixed_hex;
use crate::error::{AuthError, Result};
use crate::hash::blake2b_256;
use crate::types::{Bytes, Hash};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};

/// A spender's private key
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| AuthError::MalformedInput(format!("invalid private key: {}", e)))?;
        Ok(Self { secret })
    }

    /// Parse a `0x`-prefixed 32-byte hex key
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&from_prefixed_hex(s)?)
    }

    /// Compressed public key
    pub fn public_key(&self) -> Bytes {
        let secp = Secp256k1::signing_only();
        PublicKey::from_secret_key(&secp, &self.secret).serialize().to_vec()
    }

    /// Hash of the compressed public key, as embedded in pubkey-hash locks
    pub fn public_key_hash(&self) -> Hash {
        pubkey_hash(&self.public_key())
    }

    pub fn sign(&self, digest: &Hash) -> Bytes {
        sign(&self.secret, digest)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("public_key", &hex::encode(self.public_key())).finish()
    }
}

/// Sign a digest, returning a DER-encoded signature
pub fn sign(secret_key: &SecretKey, digest: &Hash) -> Bytes {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(*digest);
    secp.sign_ecdsa(&message, secret_key).serialize_der().to_vec()
}

/// Verify a DER signature over `digest` against a serialized public key
pub fn verify_signature(pubkey_bytes: &[u8], signature_bytes: &[u8], digest: &Hash) -> Result<()> {
    let pubkey = PublicKey::from_slice(pubkey_bytes)
        .map_err(|e| AuthError::MalformedInput(format!("invalid public key: {}", e)))?;
    let signature = Signature::from_der(signature_bytes)
        .map_err(|e| AuthError::SignatureInvalid(format!("undecodable signature: {}", e)))?;

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*digest);
    secp.verify_ecdsa(&message, &signature, &pubkey)
        .map_err(|_| AuthError::SignatureInvalid("signature does not match digest".to_string()))
}

/// PubkeyHash: H(H(pubkey))
pub fn pubkey_hash(pubkey: &[u8]) -> Hash {
    blake2b_256(&blake2b_256(pubkey))
}
