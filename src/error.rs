//! Error types for transaction authorization

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Hash mismatch: {0}")]
    HashMismatch(String),

    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    #[error("Conservation violation: {0}")]
    ConservationViolation(String),

    #[error("Insufficient capacity: {0}")]
    CapacityInsufficient(String),

    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    #[error("Cell not found: {0}")]
    CellNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(String),
}

impl AuthError {
    /// Whether this error is a terminal rejection of the transaction under
    /// evaluation, as opposed to a failure to evaluate it at all.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedInput(_)
                | AuthError::HashMismatch(_)
                | AuthError::SignatureInvalid(_)
                | AuthError::ConservationViolation(_)
                | AuthError::CapacityInsufficient(_)
                | AuthError::StructuralViolation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(AuthError::SignatureInvalid("bad".into()).is_rejection());
        assert!(AuthError::StructuralViolation("two".into()).is_rejection());
        assert!(!AuthError::CellNotFound("0x00:0".into()).is_rejection());
        assert!(!AuthError::Config("missing".into()).is_rejection());
    }

    #[test]
    fn test_display() {
        let err = AuthError::ConservationViolation("100 < 120".into());
        assert_eq!(err.to_string(), "Conservation violation: 100 < 120");
    }
}
