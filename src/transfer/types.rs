//! Transfer Core Types

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::TransferError;
use super::status::{DenialReason, TransactionStatus};
use crate::account::AccountNumber;

/// Ledger row id (`transactions_tb.transaction_id`, BIGSERIAL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Transfer request from the caller
///
/// The requesting identity travels separately as explicit context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub sender: AccountNumber,
    pub recipient: AccountNumber,
    pub amount: Decimal,
    /// Correlation id for log lines
    pub request_id: ulid::Ulid,
}

/// Exclusive upper bound of a `NUMERIC(20, 2)` ledger amount
const AMOUNT_LIMIT: i64 = 1_000_000_000_000_000_000;

impl TransferRequest {
    /// Build a request from raw card numbers
    pub fn parse(sender: &str, recipient: &str, amount: Decimal) -> Result<Self, TransferError> {
        Ok(Self::new(
            AccountNumber::new(sender)?,
            AccountNumber::new(recipient)?,
            amount,
        ))
    }

    pub fn new(sender: AccountNumber, recipient: AccountNumber, amount: Decimal) -> Self {
        Self {
            sender,
            recipient,
            amount,
            request_id: ulid::Ulid::new(),
        }
    }

    /// Shape checks that need no store access
    ///
    /// `scale` is the number of decimal places cards hold.
    pub fn check(&self, scale: u32) -> Result<(), TransferError> {
        if self.amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        if self.amount >= Decimal::from(AMOUNT_LIMIT) {
            return Err(TransferError::AmountTooLarge(self.amount));
        }

        let provided = self.amount.normalize().scale();
        if provided > scale {
            return Err(TransferError::PrecisionOverflow {
                provided,
                max: scale,
            });
        }

        if self.sender == self.recipient {
            return Err(TransferError::SameAccount);
        }

        Ok(())
    }
}

/// A transaction that has not reached a terminal status
///
/// Finalizing consumes the value, so a status can be set exactly once.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    sender: AccountNumber,
    recipient: AccountNumber,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn new(request: &TransferRequest) -> Self {
        Self {
            sender: request.sender.clone(),
            recipient: request.recipient.clone(),
            amount: request.amount,
            // TIMESTAMPTZ keeps microseconds
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::Pending
    }

    pub fn approve(self) -> FinalizedTransaction {
        self.finalize(TransactionStatus::Approved)
    }

    pub fn deny(self, reason: DenialReason) -> FinalizedTransaction {
        self.finalize(TransactionStatus::Denied(reason))
    }

    fn finalize(self, status: TransactionStatus) -> FinalizedTransaction {
        FinalizedTransaction {
            sender: self.sender,
            recipient: self.recipient,
            amount: self.amount,
            status,
            created_at: self.created_at,
        }
    }
}

/// A terminal transaction ready for its single ledger write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedTransaction {
    sender: AccountNumber,
    recipient: AccountNumber,
    amount: Decimal,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl FinalizedTransaction {
    pub fn sender(&self) -> &AccountNumber {
        &self.sender
    }

    pub fn recipient(&self) -> &AccountNumber {
        &self.recipient
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Attach the id the ledger assigned
    pub fn into_persisted(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            sender: self.sender,
            recipient: self.recipient,
            amount: self.amount,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender: AccountNumber,
    pub recipient: AccountNumber,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn involves(&self, number: &AccountNumber) -> bool {
        &self.sender == number || &self.recipient == number
    }
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub const MAX_SIZE: u32 = 500;

    /// Size is clamped to 1..=MAX_SIZE
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number,
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.number as u64 * self.size as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> PagedResult<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.size.max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card(n: &str) -> AccountNumber {
        AccountNumber::new(n).unwrap()
    }

    #[test]
    fn test_request_check() {
        let ok = TransferRequest::new(card("1111"), card("2222"), dec!(10.50));
        assert!(ok.check(2).is_ok());

        let zero = TransferRequest::new(card("1111"), card("2222"), dec!(0));
        assert_eq!(zero.check(2), Err(TransferError::InvalidAmount));

        let negative = TransferRequest::new(card("1111"), card("2222"), dec!(-5));
        assert_eq!(negative.check(2), Err(TransferError::InvalidAmount));

        let same = TransferRequest::new(card("1111"), card("1111"), dec!(5));
        assert_eq!(same.check(2), Err(TransferError::SameAccount));
    }

    #[test]
    fn test_request_precision() {
        let fine = TransferRequest::new(card("1111"), card("2222"), dec!(1.2300));
        assert!(fine.check(2).is_ok(), "trailing zeros do not count");

        let too_fine = TransferRequest::new(card("1111"), card("2222"), dec!(1.001));
        assert_eq!(
            too_fine.check(2),
            Err(TransferError::PrecisionOverflow { provided: 3, max: 2 })
        );
    }

    #[test]
    fn test_pending_finalizes_once() {
        let req = TransferRequest::new(card("1111"), card("2222"), dec!(7));
        let pending = PendingTransaction::new(&req);
        assert_eq!(pending.status(), TransactionStatus::Pending);

        let created_at = pending.created_at;
        let denied = pending.deny(DenialReason::InsufficientFunds);
        assert_eq!(
            denied.status(),
            TransactionStatus::Denied(DenialReason::InsufficientFunds)
        );
        assert_eq!(denied.created_at(), created_at);

        let record = denied.into_persisted(TransactionId::new(42));
        assert_eq!(record.id.get(), 42);
        assert_eq!(record.amount, dec!(7));
        assert!(record.involves(&card("2222")));
        assert!(!record.involves(&card("3333")));
    }

    #[test]
    fn test_page() {
        assert_eq!(Page::new(3, 20).offset(), 60);
        assert_eq!(Page::new(0, 0).size, 1);
        assert_eq!(Page::new(0, 10_000).size, Page::MAX_SIZE);

        let result: PagedResult<u8> = PagedResult {
            items: vec![],
            page: 0,
            size: 20,
            total: 41,
        };
        assert_eq!(result.total_pages(), 3);

        let empty_size: PagedResult<u8> = PagedResult {
            items: vec![],
            page: 0,
            size: 0,
            total: 2,
        };
        assert_eq!(empty_size.total_pages(), 2);
    }

    #[test]
    fn test_request_amount_fits_ledger_column() {
        let widest = TransferRequest::new(card("1111"), card("2222"), dec!(999999999999999999.99));
        assert!(widest.check(2).is_ok());

        let too_wide = TransferRequest::new(card("1111"), card("2222"), dec!(10000000000000000000));
        assert_eq!(
            too_wide.check(2),
            Err(TransferError::AmountTooLarge(dec!(10000000000000000000)))
        );
    }

    #[test]
    fn test_request_parse_rejects_bad_card() {
        let req = TransferRequest::parse(" 1111 ", "2222", dec!(1)).unwrap();
        assert_eq!(req.sender, card("1111"));

        let err = TransferRequest::parse("1111", "22-22", dec!(1)).unwrap_err();
        assert!(matches!(err, TransferError::InvalidInput(_)));
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_transaction_id_parse() {
        assert_eq!("17".parse::<TransactionId>().unwrap(), TransactionId::new(17));
        assert!("x".parse::<TransactionId>().is_err());
    }
}
