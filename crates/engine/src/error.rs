//! The module contains the errors the engine can throw.
//!
//! Errors fall in four groups:
//!
//! - input validation ([`InvalidAmount`], [`InvalidProduct`], [`InvalidInput`]),
//!   rejected before any row lock is taken;
//! - balance checks ([`InsufficientBalance`], [`InsufficientPiggyBalance`]),
//!   detected under lock, the unit of work is rolled back;
//! - gateway failures ([`GatewayUnavailable`], [`GatewayTimeout`],
//!   [`GatewayRejected`]), nothing is committed for the failed call;
//! - reconciliation failures ([`NoMatchingPendingTransaction`]).
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidProduct`]: EngineError::InvalidProduct
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`InsufficientPiggyBalance`]: EngineError::InsufficientPiggyBalance
//!  [`GatewayUnavailable`]: EngineError::GatewayUnavailable
//!  [`GatewayTimeout`]: EngineError::GatewayTimeout
//!  [`GatewayRejected`]: EngineError::GatewayRejected
//!  [`NoMatchingPendingTransaction`]: EngineError::NoMatchingPendingTransaction
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid contribution product: {0}")]
    InvalidProduct(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Insufficient piggy balance")]
    InsufficientPiggyBalance,
    #[error("Recipient not found")]
    RecipientNotFound,
    #[error("Cannot transfer to yourself")]
    SelfTransferNotAllowed,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Payment gateway timed out: {0}")]
    GatewayTimeout(String),
    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),
    #[error("No matching pending transaction for reference \"{0}\"")]
    NoMatchingPendingTransaction(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for gateway failures whose external outcome is unknown
    /// and must be verified again later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GatewayUnavailable(_) | Self::GatewayTimeout(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidProduct(a), Self::InvalidProduct(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InsufficientBalance, Self::InsufficientBalance) => true,
            (Self::InsufficientPiggyBalance, Self::InsufficientPiggyBalance) => true,
            (Self::RecipientNotFound, Self::RecipientNotFound) => true,
            (Self::SelfTransferNotAllowed, Self::SelfTransferNotAllowed) => true,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::GatewayUnavailable(a), Self::GatewayUnavailable(b)) => a == b,
            (Self::GatewayTimeout(a), Self::GatewayTimeout(b)) => a == b,
            (Self::GatewayRejected(a), Self::GatewayRejected(b)) => a == b,
            (Self::NoMatchingPendingTransaction(a), Self::NoMatchingPendingTransaction(b)) => {
                a == b
            }
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
