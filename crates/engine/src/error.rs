//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`NotFound`] thrown when a referenced entity is absent.
//! - [`Unauthorized`] thrown on a role or family-scope mismatch.
//! - [`InvalidState`] thrown when a lifecycle transition is not allowed.
//! - [`InsufficientFunds`] thrown when a debit exceeds the wallet balance.
//! - [`Contention`] thrown when a wallet lock cannot be acquired in time.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`InvalidState`]: EngineError::InvalidState
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`Contention`]: EngineError::Contention
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Contention: {0}")]
    Contention(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Whether the caller may retry the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Contention(a), Self::Contention(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
