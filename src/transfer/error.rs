//! Transfer Error Types

use thiserror::Error;

use super::status::DenialReason;
use super::types::TransactionId;
use crate::account::ValidationError;

/// Failures raised by a store back-end
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization failure or deadlock; the unit of work may be re-run
    #[error("Serialization conflict: {0}")]
    Conflict(String),

    #[error("Lock wait timed out on {0}")]
    LockTimeout(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("40001") | Some("40P01") => StoreError::Conflict(db.message().to_string()),
                Some("55P03") => StoreError::LockTimeout(db.message().to_string()),
                Some(code) if code.starts_with("23") => {
                    StoreError::ConstraintViolation(db.message().to_string())
                }
                _ => StoreError::Database(e.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Transfer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Request Shape ===
    #[error("Sender and recipient card cannot be the same")]
    SameAccount,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Amount {0} exceeds the ledger range")]
    AmountTooLarge(rust_decimal::Decimal),

    #[error("Amount has {provided} decimal places, cards hold {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    // === Domain Denials ===
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Recipient not found")]
    RecipientNotFound,

    #[error("Sender not found")]
    SenderNotFound,

    #[error("The user does not have the specified card")]
    SenderCardNotFound,

    // === System ===
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Balance invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl TransferError {
    /// Domain denials become a durable DENIED record instead of an error
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            TransferError::InsufficientFunds => Some(DenialReason::InsufficientFunds),
            TransferError::RecipientNotFound => Some(DenialReason::RecipientNotFound),
            TransferError::SenderNotFound => Some(DenialReason::SenderNotFound),
            TransferError::SenderCardNotFound => Some(DenialReason::SenderCardNotFound),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Store(e) if e.is_retryable())
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::AmountTooLarge(_) => "AMOUNT_TOO_LARGE",
            TransferError::PrecisionOverflow { .. } => "PRECISION_OVERFLOW",
            TransferError::InvalidInput(_) => "INVALID_INPUT",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            TransferError::SenderNotFound => "SENDER_NOT_FOUND",
            TransferError::SenderCardNotFound => "SENDER_CARD_NOT_FOUND",
            TransferError::Store(StoreError::Conflict(_)) => "CONFLICT",
            TransferError::Store(StoreError::LockTimeout(_)) => "LOCK_TIMEOUT",
            TransferError::Store(StoreError::Unavailable(_)) => "SERVICE_UNAVAILABLE",
            TransferError::Store(_) => "DATABASE_ERROR",
            TransferError::InvariantViolation(_) => "SYSTEM_ERROR",
            TransferError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            TransferError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::SameAccount
            | TransferError::InvalidAmount
            | TransferError::AmountTooLarge(_)
            | TransferError::PrecisionOverflow { .. }
            | TransferError::InvalidInput(_) => 400,
            TransferError::SenderCardNotFound => 403,
            TransferError::TransactionNotFound(_) => 404,
            TransferError::RecipientNotFound | TransferError::SenderNotFound => 404,
            TransferError::InsufficientFunds => 422,
            TransferError::Store(StoreError::Conflict(_)) => 409,
            TransferError::Store(StoreError::Unavailable(_))
            | TransferError::Store(StoreError::LockTimeout(_))
            | TransferError::ServiceUnavailable(_) => 503,
            TransferError::Store(_) | TransferError::InvariantViolation(_) => 500,
        }
    }
}

impl From<DenialReason> for TransferError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::InsufficientFunds => TransferError::InsufficientFunds,
            DenialReason::RecipientNotFound => TransferError::RecipientNotFound,
            DenialReason::SenderNotFound => TransferError::SenderNotFound,
            DenialReason::SenderCardNotFound => TransferError::SenderCardNotFound,
            DenialReason::Aborted => {
                TransferError::ServiceUnavailable("transfer aborted".to_string())
            }
        }
    }
}
