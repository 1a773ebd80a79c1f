//! Transaction Status
//!
//! Ids are stored as SMALLINT in `transactions_tb.status` / `denial_reason`.

use serde::Serialize;
use std::fmt;

/// Why a transfer was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum DenialReason {
    /// Locked sender balance is below the amount
    InsufficientFunds = 1,
    /// Recipient card does not exist
    RecipientNotFound = 2,
    /// Requesting identity has no owner profile
    SenderNotFound = 3,
    /// Requesting identity does not own the sender card
    SenderCardNotFound = 4,
    /// Unit of work failed on infrastructure; balances untouched
    Aborted = 5,
}

impl DenialReason {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(DenialReason::InsufficientFunds),
            2 => Some(DenialReason::RecipientNotFound),
            3 => Some(DenialReason::SenderNotFound),
            4 => Some(DenialReason::SenderCardNotFound),
            5 => Some(DenialReason::Aborted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::InsufficientFunds => "INSUFFICIENT_FUNDS",
            DenialReason::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            DenialReason::SenderNotFound => "SENDER_NOT_FOUND",
            DenialReason::SenderCardNotFound => "SENDER_CARD_NOT_FOUND",
            DenialReason::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction lifecycle
///
/// ```text
/// PENDING ──▶ APPROVED
///    └──────▶ DENIED(reason)
/// ```
///
/// `Pending` only ever exists in memory; the ledger accepts terminal records only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Denied(DenialReason),
}

impl TransactionStatus {
    pub const PENDING_ID: i16 = 0;
    pub const APPROVED_ID: i16 = 10;
    pub const DENIED_ID: i16 = -10;

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    #[inline]
    pub fn is_approved(&self) -> bool {
        matches!(self, TransactionStatus::Approved)
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            TransactionStatus::Denied(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Status id for the `status` column
    #[inline]
    pub fn id(&self) -> i16 {
        match self {
            TransactionStatus::Pending => Self::PENDING_ID,
            TransactionStatus::Approved => Self::APPROVED_ID,
            TransactionStatus::Denied(_) => Self::DENIED_ID,
        }
    }

    /// Rebuild from the `status` and `denial_reason` columns
    pub fn from_columns(status: i16, reason: Option<i16>) -> Option<Self> {
        match (status, reason) {
            (Self::PENDING_ID, None) => Some(TransactionStatus::Pending),
            (Self::APPROVED_ID, None) => Some(TransactionStatus::Approved),
            (Self::DENIED_ID, Some(r)) => DenialReason::from_id(r).map(TransactionStatus::Denied),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Denied(_) => "DENIED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Denied(reason) => write!(f, "DENIED({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Approved.is_terminal());
        assert!(TransactionStatus::Denied(DenialReason::InsufficientFunds).is_terminal());
    }

    #[test]
    fn test_denial_reason_accessor() {
        assert_eq!(TransactionStatus::Approved.denial_reason(), None);
        assert_eq!(
            TransactionStatus::Denied(DenialReason::RecipientNotFound).denial_reason(),
            Some(DenialReason::RecipientNotFound)
        );
    }

    #[test]
    fn test_column_decoding() {
        assert_eq!(
            TransactionStatus::from_columns(10, None),
            Some(TransactionStatus::Approved)
        );
        assert_eq!(
            TransactionStatus::from_columns(-10, Some(4)),
            Some(TransactionStatus::Denied(DenialReason::SenderCardNotFound))
        );
        // Denied without reason, approved with reason, unknown ids
        assert_eq!(TransactionStatus::from_columns(-10, None), None);
        assert_eq!(TransactionStatus::from_columns(10, Some(1)), None);
        assert_eq!(TransactionStatus::from_columns(-10, Some(99)), None);
        assert_eq!(TransactionStatus::from_columns(7, None), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionStatus::Approved.to_string(), "APPROVED");
        assert_eq!(
            TransactionStatus::Denied(DenialReason::InsufficientFunds).to_string(),
            "DENIED(INSUFFICIENT_FUNDS)"
        );
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&TransactionStatus::Denied(DenialReason::Aborted)).unwrap();
        assert_eq!(json, r#"{"DENIED":"ABORTED"}"#);
        let json = serde_json::to_string(&TransactionStatus::Approved).unwrap();
        assert_eq!(json, r#""APPROVED""#);
    }
}
