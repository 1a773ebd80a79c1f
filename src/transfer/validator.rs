//! Transfer Validator
//!
//! Check-then-decide. Nothing is written here; the only side effects are the
//! sender and recipient row locks, which stay held for the rest of the unit
//! of work.

use rust_decimal::Decimal;
use tracing::debug;

use super::error::TransferError;
use super::store::AccountStore;
use super::types::TransferRequest;
use crate::account::Identity;
use crate::logging::TRANSFER_TRACE;

/// A transfer that passed validation while holding the sender row lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub request: TransferRequest,
    /// Sender balance as read under the lock
    pub sender_balance: Decimal,
}

/// Validate `request` on behalf of `identity`
///
/// Order of checks:
/// 1. requester has an owner profile (`SenderNotFound`)
/// 2. requester owns the sender card (`SenderCardNotFound`)
/// 3. recipient card exists (`RecipientNotFound`)
/// 4. locking reads of both cards, lower card number first
/// 5. amount fits the locked sender balance (`InsufficientFunds`)
///
/// No row is locked unless the requester owns the sender card. Every unit of
/// work locks its two rows in the same global order, so opposing transfers
/// queue behind each other instead of deadlocking.
pub async fn validate<S>(
    accounts: &mut S,
    identity: &Identity,
    request: &TransferRequest,
) -> Result<ValidatedTransfer, TransferError>
where
    S: AccountStore + ?Sized,
{
    let profile = accounts
        .find_owner(identity)
        .await?
        .ok_or(TransferError::SenderNotFound)?;

    if !profile.owns(&request.sender) {
        debug!(
            request_id = %request.request_id,
            identity = %identity,
            sender = %request.sender.masked(),
            "Sender card not owned by requester"
        );
        return Err(TransferError::SenderCardNotFound);
    }

    if accounts.find_account(&request.recipient).await?.is_none() {
        return Err(TransferError::RecipientNotFound);
    }

    let sender_first = request.sender < request.recipient;
    let (first, second) = if sender_first {
        (&request.sender, &request.recipient)
    } else {
        (&request.recipient, &request.sender)
    };
    let first_balance = accounts.find_account_balance_for_update(first).await?;
    let second_balance = accounts.find_account_balance_for_update(second).await?;
    let (sender_balance, recipient_balance) = if sender_first {
        (first_balance, second_balance)
    } else {
        (second_balance, first_balance)
    };

    let sender_balance = sender_balance.ok_or(TransferError::SenderCardNotFound)?;
    if recipient_balance.is_none() {
        return Err(TransferError::RecipientNotFound);
    }

    tracing::trace!(
        target: TRANSFER_TRACE,
        request_id = %request.request_id,
        sender = %request.sender.masked(),
        balance = %sender_balance,
        "Sender and recipient rows locked"
    );

    if request.amount > sender_balance {
        debug!(
            request_id = %request.request_id,
            amount = %request.amount,
            balance = %sender_balance,
            "Insufficient funds"
        );
        return Err(TransferError::InsufficientFunds);
    }

    Ok(ValidatedTransfer {
        request: request.clone(),
        sender_balance,
    })
}
