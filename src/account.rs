//! Account-cell lock: one token cell per owner that anyone may deposit into
//!
//! With a signature the lock behaves like the embedded-pubkey ownership lock.
//! Without one it accepts only a deposit: the cell is recreated under the
//! same lock and type with unchanged capacity and a strictly larger balance,
//! so a sender can pay a receiver in one step without the receiver signing.

use crate::error::{AuthError, Result};
use crate::lock::{verify_signature_unlock, LockArgs, SignatureUnlock};
use crate::types::*;
use crate::udt::udt_balance;
use tracing::debug;

/// How an account cell is being unlocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountUnlock {
    Signature(SignatureUnlock),
    Deposit,
}

impl AccountUnlock {
    pub fn decode(lock: &LockArgs, args: &[Bytes]) -> Result<Self> {
        if !matches!(lock, LockArgs::Pubkey { .. }) {
            return Err(AuthError::MalformedInput("account lock takes [label, pubkey]".to_string()));
        }
        if args.is_empty() {
            return Ok(AccountUnlock::Deposit);
        }
        SignatureUnlock::decode(lock, args).map(AccountUnlock::Signature)
    }
}

/// VerifyAccountLock: 𝒮 × 𝒯𝒳 × ℕ → {accept, reject}
pub fn verify_account_lock(lock: &Script, rtx: &ResolvedTransaction, input_index: usize) -> Result<()> {
    let (input, _) = rtx.input(input_index)?;
    let lock_args = LockArgs::decode(lock)?;
    match AccountUnlock::decode(&lock_args, &input.args)? {
        AccountUnlock::Signature(unlock) => {
            debug!(input_index, "account lock opened by signature");
            verify_signature_unlock(rtx, input_index, &unlock)
        }
        AccountUnlock::Deposit => verify_deposit(rtx, input_index),
    }
}

/// Deposit rules for the account cell consumed by `input_index`
pub fn verify_deposit(rtx: &ResolvedTransaction, input_index: usize) -> Result<()> {
    let current = rtx.input_cell(input_index)?;
    let lock_hash = current.lock_hash();
    let type_hash = current
        .type_hash()
        .ok_or_else(|| AuthError::MalformedInput("account cell carries no token type".to_string()))?;
    let same_account = |cell: &CellOutput| cell.lock_hash() == lock_hash && cell.type_hash() == Some(type_hash);

    let input_matches = rtx.resolved_inputs.iter().filter(|c| same_account(c)).count();
    if input_matches > 1 {
        return Err(AuthError::StructuralViolation(format!(
            "{} inputs spend the same account cell",
            input_matches
        )));
    }

    let output_matches: Vec<&CellOutput> = rtx.outputs().iter().filter(|c| same_account(c)).collect();
    let output = match output_matches.as_slice() {
        [output] => *output,
        other => {
            return Err(AuthError::StructuralViolation(format!(
                "deposit needs exactly one recreated account cell, found {}",
                other.len()
            )))
        }
    };

    if output.capacity != current.capacity {
        return Err(AuthError::StructuralViolation(format!(
            "account capacity changed from {} to {}",
            current.capacity, output.capacity
        )));
    }

    let before = udt_balance(current)?;
    let after = udt_balance(output)?;
    if after <= before {
        return Err(AuthError::ConservationViolation(format!(
            "deposit must increase the balance ({} -> {})",
            before, after
        )));
    }
    debug!(input_index, before, after, "account deposit accepted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_scripts;
    use crate::sighash::SighashType;
    use crate::signing::PrivateKey;
    use crate::udt::UdtToken;

    fn owner() -> PrivateKey {
        PrivateKey::from_slice(&[0x33; 32]).unwrap()
    }

    fn token() -> UdtToken {
        UdtToken::new(test_scripts(), b"coin".to_vec(), vec![2; 33])
    }

    fn deposit_rtx(before: u64, outputs: Vec<CellOutput>) -> ResolvedTransaction {
        let token = token();
        let account = token.cell(300, before, token.account_lock(owner().public_key()));
        let tx = Transaction {
            version: 0,
            inputs: vec![CellInput::new(OutPoint::new([1; 32], 0), vec![])],
            outputs,
            ..Default::default()
        };
        ResolvedTransaction::new(tx, vec![account]).unwrap()
    }

    fn account_cell(capacity: Capacity, amount: u64) -> CellOutput {
        let token = token();
        token.cell(capacity, amount, token.account_lock(owner().public_key()))
    }

    #[test]
    fn test_deposit_accepted() {
        let rtx = deposit_rtx(10, vec![account_cell(300, 25)]);
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(verify_account_lock(&lock, &rtx, 0).is_ok());
    }

    #[test]
    fn test_withdrawal_without_signature_rejected() {
        let rtx = deposit_rtx(10, vec![account_cell(300, 9)]);
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(
            verify_account_lock(&lock, &rtx, 0),
            Err(AuthError::ConservationViolation(_))
        ));
        let unchanged = deposit_rtx(10, vec![account_cell(300, 10)]);
        assert!(verify_account_lock(&lock, &unchanged, 0).is_err());
    }

    #[test]
    fn test_capacity_cannot_be_tweaked() {
        let rtx = deposit_rtx(10, vec![account_cell(299, 20)]);
        let lock = rtx.resolved_inputs[0].lock.clone();
        assert!(matches!(
            verify_account_lock(&lock, &rtx, 0),
            Err(AuthError::StructuralViolation(_))
        ));
    }

    #[test]
    fn test_exactly_one_recreated_cell() {
        let lock = account_cell(300, 0).lock;
        let none = deposit_rtx(10, vec![]);
        assert!(matches!(verify_account_lock(&lock, &none, 0), Err(AuthError::StructuralViolation(_))));
        let two = deposit_rtx(10, vec![account_cell(300, 20), account_cell(300, 20)]);
        assert!(matches!(verify_account_lock(&lock, &two, 0), Err(AuthError::StructuralViolation(_))));
    }

    #[test]
    fn test_withdrawal_with_signature() {
        let mut rtx = deposit_rtx(10, vec![account_cell(300, 4)]);
        let lock = rtx.resolved_inputs[0].lock.clone();
        crate::lock::sign_inputs(&mut rtx, &owner(), &SighashType::all(), &[0]).unwrap();
        assert!(verify_account_lock(&lock, &rtx, 0).is_ok());
    }

    #[test]
    fn test_pubkey_hash_args_not_an_account() {
        let lock = Script::new(test_scripts().account_lock, vec![vec![0; 32]]);
        let rtx = deposit_rtx(10, vec![account_cell(300, 20)]);
        assert!(matches!(verify_account_lock(&lock, &rtx, 0), Err(AuthError::MalformedInput(_))));
    }
}
