//! Error types for cat-issuance-driver

use issuance_wallet::WalletError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("Failed to resolve program `{input}`: {reason}")]
    Resolution { input: String, reason: String },

    #[error("Failed to assemble `{expr}`: {reason}")]
    Assembly { expr: String, reason: String },

    #[error("Invalid destination address: {0}")]
    AddressDecode(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Wallet unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Wallet error: {0}")]
    Collaborator(String),

    #[error("Expected exactly one {what} for {target}, found {found}")]
    InvariantViolation {
        what: String,
        target: String,
        found: usize,
    },

    #[error("Invalid signature `{input}`: {reason}")]
    Signature { input: String, reason: String },

    #[error("Invalid spend bundle `{input}`: {reason}")]
    SpendBundle { input: String, reason: String },

    #[error("Failed to allocate CLVM node: {0}")]
    Alloc(String),

    #[error("Failed to run puzzle: {0}")]
    Eval(String),

    #[error("Failed to serialize: {0}")]
    Serialize(String),
}

impl From<WalletError> for IssuanceError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Unavailable { .. } | WalletError::Identity(_) => {
                IssuanceError::CollaboratorUnavailable(err.to_string())
            }
            WalletError::InvalidAddress(reason) => IssuanceError::AddressDecode(reason),
            other => IssuanceError::Collaborator(other.to_string()),
        }
    }
}

impl IssuanceError {
    pub(crate) fn resolution(input: &str, reason: impl std::fmt::Display) -> Self {
        IssuanceError::Resolution {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invariant(
        what: impl Into<String>,
        target: impl Into<String>,
        found: usize,
    ) -> Self {
        IssuanceError::InvariantViolation {
            what: what.into(),
            target: target.into(),
            found,
        }
    }
}
