//! Store Contracts
//!
//! The core talks to persistence only through these traits. A [`UnitOfWork`]
//! is one store transaction with serializable isolation: row locks taken
//! through it are held, and writes made through it stay invisible to others,
//! until `commit()` or `rollback()`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::StoreError;
use super::types::{FinalizedTransaction, Page, PagedResult, Transaction, TransactionId};
use crate::account::{Account, AccountNumber, Identity, OwnerProfile};

/// Card reads and writes scoped to one unit of work
#[async_trait]
pub trait AccountStore: Send {
    /// Owner profile with all cards of `identity`
    async fn find_owner(&mut self, identity: &Identity)
    -> Result<Option<OwnerProfile>, StoreError>;

    /// Plain (non-locking) card lookup
    async fn find_account(&mut self, number: &AccountNumber)
    -> Result<Option<Account>, StoreError>;

    /// Read a balance and lock the card row until the unit of work ends
    ///
    /// Blocks while another unit of work holds the row. Fails with
    /// [`StoreError::LockTimeout`] once the store's lock timeout elapses.
    async fn find_account_balance_for_update(
        &mut self,
        number: &AccountNumber,
    ) -> Result<Option<Decimal>, StoreError>;

    /// Overwrite a card balance
    ///
    /// A negative balance is rejected with [`StoreError::ConstraintViolation`].
    async fn update_balance(
        &mut self,
        number: &AccountNumber,
        new_balance: Decimal,
    ) -> Result<(), StoreError>;
}

/// Ledger writes scoped to one unit of work
#[async_trait]
pub trait LedgerStore: Send {
    /// Append a terminal transaction; the store assigns the id
    async fn insert_transaction(
        &mut self,
        transaction: FinalizedTransaction,
    ) -> Result<Transaction, StoreError>;
}

/// One atomic store transaction
#[async_trait]
pub trait UnitOfWork: AccountStore + LedgerStore {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Entry point of a store back-end
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Open a serializable unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn find_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, StoreError>;

    /// Transactions touching any card of `owner`, newest first
    async fn find_transactions_by_owner(
        &self,
        owner: &Identity,
        page: Page,
    ) -> Result<PagedResult<Transaction>, StoreError>;
}
