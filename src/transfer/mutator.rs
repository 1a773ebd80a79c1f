//! Balance Mutator
//!
//! Applies the two-sided change of a validated transfer inside the caller's
//! unit of work. Any error leaves the unit of work to be rolled back.

use rust_decimal::Decimal;
use tracing::error;

use super::error::TransferError;
use super::store::AccountStore;
use super::validator::ValidatedTransfer;
use crate::logging::TRANSFER_TRACE;

/// Debit the sender, credit the recipient
///
/// The recipient balance is read under a row lock as well, so the credit is
/// computed from the committed value. Arithmetic is checked: a negative debit
/// result or an overflowing credit is an invariant violation, never clamped.
pub async fn apply<S>(accounts: &mut S, transfer: &ValidatedTransfer) -> Result<(), TransferError>
where
    S: AccountStore + ?Sized,
{
    let req = &transfer.request;

    let sender_after = transfer
        .sender_balance
        .checked_sub(req.amount)
        .filter(|b| *b >= Decimal::ZERO)
        .ok_or_else(|| {
            error!(
                request_id = %req.request_id,
                balance = %transfer.sender_balance,
                amount = %req.amount,
                "Debit would overdraw sender after validation"
            );
            TransferError::InvariantViolation(format!(
                "debit of {} from {} underflows",
                req.amount,
                req.sender.masked()
            ))
        })?;

    accounts.update_balance(&req.sender, sender_after).await?;

    let recipient_before = accounts
        .find_account_balance_for_update(&req.recipient)
        .await?
        .ok_or_else(|| {
            error!(
                request_id = %req.request_id,
                recipient = %req.recipient.masked(),
                "Recipient vanished after validation"
            );
            TransferError::InvariantViolation(format!(
                "recipient {} missing during credit",
                req.recipient.masked()
            ))
        })?;

    let recipient_after = recipient_before.checked_add(req.amount).ok_or_else(|| {
        TransferError::InvariantViolation(format!(
            "credit of {} to {} overflows",
            req.amount,
            req.recipient.masked()
        ))
    })?;

    accounts.update_balance(&req.recipient, recipient_after).await?;

    tracing::trace!(
        target: TRANSFER_TRACE,
        request_id = %req.request_id,
        sender_after = %sender_after,
        recipient_after = %recipient_after,
        "Balances updated"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountNumber, Identity};
    use crate::transfer::memory::MemoryStore;
    use crate::transfer::store::{AccountStore, UnitOfWork};
    use crate::transfer::types::TransferRequest;
    use rust_decimal_macros::dec;

    fn card(n: &str) -> AccountNumber {
        AccountNumber::new(n).unwrap()
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let owner = Identity::new("alice@example.com").unwrap();
        store.open_account(&owner, &card("1111"), dec!(80.25));
        store.open_account(&owner, &card("2222"), dec!(19.75));
        store
    }

    fn validated(amount: Decimal, sender_balance: Decimal) -> ValidatedTransfer {
        ValidatedTransfer {
            request: TransferRequest::new(card("1111"), card("2222"), amount),
            sender_balance,
        }
    }

    #[tokio::test]
    async fn test_apply_moves_funds_on_commit() {
        let store = store();
        let mut uow = store.begin_unit();
        uow.find_account_balance_for_update(&card("1111")).await.unwrap();

        apply(&mut uow, &validated(dec!(30.25), dec!(80.25))).await.unwrap();

        // Not visible outside the unit of work yet
        assert_eq!(store.balance(&card("1111")), Some(dec!(80.25)));

        Box::new(uow).commit().await.unwrap();
        assert_eq!(store.balance(&card("1111")), Some(dec!(50.00)));
        assert_eq!(store.balance(&card("2222")), Some(dec!(50.00)));
    }

    #[tokio::test]
    async fn test_apply_rejects_underflow() {
        let store = store();
        let mut uow = store.begin_unit();

        let err = apply(&mut uow, &validated(dec!(100), dec!(80.25)))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvariantViolation(_)));

        Box::new(uow).rollback().await.unwrap();
        assert_eq!(store.balance(&card("1111")), Some(dec!(80.25)));
        assert_eq!(store.balance(&card("2222")), Some(dec!(19.75)));
    }

    #[tokio::test]
    async fn test_apply_missing_recipient_is_invariant_violation() {
        let store = store();
        let mut uow = store.begin_unit();

        let transfer = ValidatedTransfer {
            request: TransferRequest::new(card("1111"), card("9999"), dec!(1)),
            sender_balance: dec!(80.25),
        };
        let err = apply(&mut uow, &transfer).await.unwrap_err();
        assert!(matches!(err, TransferError::InvariantViolation(_)));
    }
}
