//! Ownership verification: the minimal lock script
//!
//! A cell guarded by an ownership lock may be spent only by an input whose
//! unlock arguments carry a valid ECDSA signature over the sighash digest of
//! the spending transaction. There is no soft-fail path: any failure rejects
//! the whole transaction.

use crate::error::{AuthError, Result};
use crate::sighash::{compute_sighash, SighashType};
use crate::signing::{pubkey_hash, verify_signature, PrivateKey};
use crate::types::*;
use tracing::debug;

/// Lock arguments, decoded once from the lock script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockArgs {
    /// `[H(H(pubkey))]`: the spender reveals the pubkey in the unlock arguments
    PubkeyHash(Hash),
    /// `[label, pubkey]`: the pubkey is embedded; the label only separates
    /// lock hashes, e.g. per token
    Pubkey { label: Bytes, pubkey: Bytes },
}

impl LockArgs {
    pub fn decode(lock: &Script) -> Result<Self> {
        match lock.args.as_slice() {
            [hash] => {
                let hash: Hash = hash.as_slice().try_into().map_err(|_| {
                    AuthError::MalformedInput(format!("pubkey hash must be 32 bytes, got {}", hash.len()))
                })?;
                Ok(LockArgs::PubkeyHash(hash))
            }
            [label, pubkey] => Ok(LockArgs::Pubkey { label: label.clone(), pubkey: pubkey.clone() }),
            other => Err(AuthError::MalformedInput(format!(
                "ownership lock takes 1 or 2 arguments, got {}",
                other.len()
            ))),
        }
    }

    pub fn encode(&self) -> Vec<Bytes> {
        match self {
            LockArgs::PubkeyHash(hash) => vec![hash.to_vec()],
            LockArgs::Pubkey { label, pubkey } => vec![label.clone(), pubkey.clone()],
        }
    }
}

/// A signature-bearing unlock request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureUnlock {
    pub signature: Bytes,
    pub pubkey: Bytes,
    pub sighash: SighashType,
}

impl SignatureUnlock {
    /// Decode unlock arguments against the lock they claim to open
    ///
    /// * `PubkeyHash`: `[signature, pubkey, tag, outputs?]`
    /// * `Pubkey`:     `[signature, tag, outputs?]`
    pub fn decode(lock: &LockArgs, args: &[Bytes]) -> Result<Self> {
        match lock {
            LockArgs::PubkeyHash(expected) => {
                let (signature, pubkey, rest) = match args {
                    [signature, pubkey, rest @ ..] if (1..=2).contains(&rest.len()) => (signature, pubkey, rest),
                    _ => {
                        return Err(AuthError::MalformedInput(format!(
                            "pubkey-hash unlock takes 3 or 4 arguments, got {}",
                            args.len()
                        )))
                    }
                };
                if &pubkey_hash(pubkey) != expected {
                    return Err(AuthError::HashMismatch("pubkey does not match lock pubkey hash".to_string()));
                }
                Ok(Self {
                    signature: signature.clone(),
                    pubkey: pubkey.clone(),
                    sighash: decode_sighash(rest)?,
                })
            }
            LockArgs::Pubkey { pubkey, .. } => match args {
                [signature, rest @ ..] if (1..=2).contains(&rest.len()) => Ok(Self {
                    signature: signature.clone(),
                    pubkey: pubkey.clone(),
                    sighash: decode_sighash(rest)?,
                }),
                _ => Err(AuthError::MalformedInput(format!(
                    "pubkey unlock takes 2 or 3 arguments, got {}",
                    args.len()
                ))),
            },
        }
    }

    /// Encode for the given lock layout
    pub fn encode(&self, lock: &LockArgs) -> Vec<Bytes> {
        let mut args = vec![self.signature.clone()];
        if let LockArgs::PubkeyHash(_) = lock {
            args.push(self.pubkey.clone());
        }
        args.extend(self.sighash.to_unlock_args());
        args
    }
}

/// `[tag]` or `[tag, outputs]`
pub(crate) fn decode_sighash(args: &[Bytes]) -> Result<SighashType> {
    match args {
        [tag] => SighashType::from_unlock_args(tag, None),
        [tag, outputs] => SighashType::from_unlock_args(tag, Some(outputs)),
        _ => Err(AuthError::MalformedInput("missing sighash type".to_string())),
    }
}

/// Recompute the digest the request claims and check its signature
pub fn verify_signature_unlock(rtx: &ResolvedTransaction, input_index: usize, unlock: &SignatureUnlock) -> Result<()> {
    let digest = compute_sighash(rtx, &unlock.sighash, Some(input_index))?;
    verify_signature(&unlock.pubkey, &unlock.signature, &digest)
}

/// VerifyOwnership: 𝒮 × 𝒯𝒳 × ℕ → {accept, reject}
pub fn verify_ownership(lock: &Script, rtx: &ResolvedTransaction, input_index: usize) -> Result<()> {
    let (input, _) = rtx.input(input_index)?;
    let lock_args = LockArgs::decode(lock)?;
    let unlock = SignatureUnlock::decode(&lock_args, &input.args)?;
    debug!(input_index, tag = unlock.sighash.tag(), "verifying ownership lock");
    verify_signature_unlock(rtx, input_index, &unlock)
}

/// Ownership lock keyed by the hash of `key`'s public key
pub fn owner_lock(code_hash: Hash, key: &PrivateKey) -> Script {
    Script::new(code_hash, LockArgs::PubkeyHash(key.public_key_hash()).encode())
}

/// Build the signature unlock for one input without touching the transaction
pub fn sign_input(
    rtx: &ResolvedTransaction,
    key: &PrivateKey,
    sighash: &SighashType,
    input_index: usize,
) -> Result<SignatureUnlock> {
    let digest = compute_sighash(rtx, sighash, Some(input_index))?;
    Ok(SignatureUnlock {
        signature: key.sign(&digest),
        pubkey: key.public_key(),
        sighash: sighash.clone(),
    })
}

/// Sign the given inputs in place, replacing their unlock arguments with the
/// layout their lock expects
///
/// Unlock arguments are outside every digest, so the order inputs are signed
/// in does not matter.
pub fn sign_inputs(
    rtx: &mut ResolvedTransaction,
    key: &PrivateKey,
    sighash: &SighashType,
    input_indices: &[usize],
) -> Result<()> {
    for &index in input_indices {
        let lock_args = LockArgs::decode(&rtx.input_cell(index)?.lock)?;
        let unlock = sign_input(rtx, key, sighash, index)?;
        rtx.transaction.inputs[index].args = unlock.encode(&lock_args);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: Hash = [0xaa; 32];

    fn key(n: u8) -> PrivateKey {
        PrivateKey::from_slice(&[n; 32]).unwrap()
    }

    fn rtx_owned_by(lock: Script) -> ResolvedTransaction {
        let tx = Transaction {
            version: 0,
            inputs: vec![CellInput::new(OutPoint::new([1; 32], 0), vec![])],
            outputs: vec![CellOutput::new(1000, vec![], Script::new(CODE, vec![vec![9; 32]]), None)],
            ..Default::default()
        };
        ResolvedTransaction::new(tx, vec![CellOutput::new(1000, vec![], lock, None)]).unwrap()
    }

    #[test]
    fn test_decode_lock_args() {
        assert_eq!(
            LockArgs::decode(&Script::new(CODE, vec![vec![1; 32]])).unwrap(),
            LockArgs::PubkeyHash([1; 32])
        );
        assert!(LockArgs::decode(&Script::new(CODE, vec![vec![1; 20]])).is_err());
        assert!(LockArgs::decode(&Script::new(CODE, vec![])).is_err());
        assert!(LockArgs::decode(&Script::new(CODE, vec![vec![]; 3])).is_err());
    }

    #[test]
    fn test_pubkey_hash_lock_round_trip() {
        let k = key(1);
        let mut rtx = rtx_owned_by(owner_lock(CODE, &k));
        sign_inputs(&mut rtx, &k, &SighashType::all(), &[0]).unwrap();
        assert_eq!(rtx.inputs()[0].args.len(), 3);
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(verify_ownership(&lock, &rtx, 0).is_ok());
    }

    #[test]
    fn test_embedded_pubkey_lock() {
        let k = key(2);
        let lock = Script::new(CODE, LockArgs::Pubkey { label: b"coin".to_vec(), pubkey: k.public_key() }.encode());
        let mut rtx = rtx_owned_by(lock.clone());
        sign_inputs(&mut rtx, &k, &SighashType::single(0), &[0]).unwrap();
        assert_eq!(rtx.inputs()[0].args.len(), 3);
        assert!(verify_ownership(&lock, &rtx, 0).is_ok());
    }

    #[test]
    fn test_wrong_pubkey_is_hash_mismatch() {
        let owner = key(1);
        let thief = key(2);
        let mut rtx = rtx_owned_by(owner_lock(CODE, &owner));
        sign_inputs(&mut rtx, &thief, &SighashType::all(), &[0]).unwrap();
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(verify_ownership(&lock, &rtx, 0), Err(AuthError::HashMismatch(_))));
    }

    #[test]
    fn test_tampered_output_fails_signature() {
        let k = key(1);
        let mut rtx = rtx_owned_by(owner_lock(CODE, &k));
        sign_inputs(&mut rtx, &k, &SighashType::all(), &[0]).unwrap();
        rtx.transaction.outputs[0].capacity -= 1;
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(verify_ownership(&lock, &rtx, 0), Err(AuthError::SignatureInvalid(_))));
    }

    #[test]
    fn test_substituted_sighash_type_fails() {
        let k = key(1);
        let mut rtx = rtx_owned_by(owner_lock(CODE, &k));
        sign_inputs(&mut rtx, &k, &SighashType::all(), &[0]).unwrap();
        rtx.transaction.inputs[0].args[2] = b"2".to_vec();
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(verify_ownership(&lock, &rtx, 0), Err(AuthError::SignatureInvalid(_))));
    }

    #[test]
    fn test_missing_arguments_malformed() {
        let k = key(1);
        let rtx = rtx_owned_by(owner_lock(CODE, &k));
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(verify_ownership(&lock, &rtx, 0), Err(AuthError::MalformedInput(_))));
    }

    #[test]
    fn test_single_out_of_range_rejected() {
        let k = key(1);
        let mut rtx = rtx_owned_by(owner_lock(CODE, &k));
        assert!(sign_inputs(&mut rtx, &k, &SighashType::single(3), &[0]).is_err());
        rtx.transaction.inputs[0].args = vec![vec![0; 70], k.public_key(), b"3".to_vec(), b"3".to_vec()];
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(verify_ownership(&lock, &rtx, 0), Err(AuthError::MalformedInput(_))));
    }
}
