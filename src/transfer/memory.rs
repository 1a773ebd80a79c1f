//! In-memory Store
//!
//! Process-local [`TransferStore`] with the same locking contract as the
//! PostgreSQL store: every card row has an async mutex, a unit of work keeps
//! the guards of the rows it touched until it ends, and its writes are
//! buffered until `commit()`. Dropping a unit of work rolls it back. There is
//! no deadlock detector; a lock wait ends with `LockTimeout`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use super::error::StoreError;
use super::store::{AccountStore, LedgerStore, TransferStore, UnitOfWork};
use super::types::{FinalizedTransaction, Page, PagedResult, Transaction, TransactionId};
use crate::account::{Account, AccountNumber, Identity, OwnerProfile};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct State {
    accounts: HashMap<AccountNumber, Account>,
    owners: HashMap<Identity, Vec<AccountNumber>>,
    ledger: BTreeMap<TransactionId, Transaction>,
}

struct Inner {
    state: Mutex<State>,
    row_locks: Mutex<HashMap<AccountNumber, Arc<tokio::sync::Mutex<()>>>>,
    next_id: AtomicI64,
    lock_timeout: Duration,
    fail_updates: AtomicBool,
    fail_inserts: AtomicBool,
    pending_conflicts: AtomicU32,
}

impl Inner {
    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }

    fn row_lock(&self, number: &AccountNumber) -> Result<Option<Arc<tokio::sync::Mutex<()>>>, StoreError> {
        let locks = self
            .row_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("lock table poisoned".to_string()))?;
        Ok(locks.get(number).cloned())
    }
}

/// Shared handle; clones see the same cards and ledger
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                row_locks: Mutex::new(HashMap::new()),
                next_id: AtomicI64::new(1),
                lock_timeout,
                fail_updates: AtomicBool::new(false),
                fail_inserts: AtomicBool::new(false),
                pending_conflicts: AtomicU32::new(0),
            }),
        }
    }

    /// Register an owner profile without cards
    pub fn register_owner(&self, owner: &Identity) {
        if let Ok(mut state) = self.inner.state() {
            state.owners.entry(owner.clone()).or_default();
        }
    }

    /// Open a card for `owner` (replaces the balance if the card exists)
    pub fn open_account(&self, owner: &Identity, number: &AccountNumber, balance: Decimal) {
        let Ok(mut state) = self.inner.state() else {
            return;
        };
        let cards = state.owners.entry(owner.clone()).or_default();
        if !cards.contains(number) {
            cards.push(number.clone());
        }
        state.accounts.insert(
            number.clone(),
            Account {
                number: number.clone(),
                owner: owner.clone(),
                balance,
            },
        );
        drop(state);

        if let Ok(mut locks) = self.inner.row_locks.lock() {
            locks.entry(number.clone()).or_default();
        }
    }

    /// Committed balance of a card
    pub fn balance(&self, number: &AccountNumber) -> Option<Decimal> {
        let state = self.inner.state().ok()?;
        state.accounts.get(number).map(|a| a.balance)
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> Decimal {
        self.inner
            .state()
            .map(|s| s.accounts.values().map(|a| a.balance).sum())
            .unwrap_or_default()
    }

    /// Number of ledger records
    pub fn transaction_count(&self) -> usize {
        self.inner.state().map(|s| s.ledger.len()).unwrap_or(0)
    }

    /// Fault injection: make every `update_balance` fail
    pub fn set_fail_updates(&self, fail: bool) {
        self.inner.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Fault injection: make every `insert_transaction` fail
    pub fn set_fail_inserts(&self, fail: bool) {
        self.inner.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Fault injection: the next `count` calls to `begin()` fail with
    /// [`StoreError::Conflict`]
    pub fn inject_conflicts(&self, count: u32) {
        self.inner.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Open a unit of work with its concrete type
    pub fn begin_unit(&self) -> MemoryUnitOfWork {
        MemoryUnitOfWork {
            inner: self.inner.clone(),
            held: HashMap::new(),
            writes: HashMap::new(),
            inserts: Vec::new(),
        }
    }
}

#[async_trait]
impl TransferStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let conflicted = self
            .inner
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StoreError::Conflict("injected serialization failure".to_string()));
        }
        Ok(Box::new(self.begin_unit()))
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.state()?.ledger.get(&id).cloned())
    }

    async fn find_transactions_by_owner(
        &self,
        owner: &Identity,
        page: Page,
    ) -> Result<PagedResult<Transaction>, StoreError> {
        let state = self.inner.state()?;
        let cards = state.owners.get(owner).cloned().unwrap_or_default();

        let mut matching: Vec<&Transaction> = state
            .ledger
            .values()
            .filter(|t| cards.iter().any(|c| t.involves(c)))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let items = matching
            .iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .map(|t| (*t).clone())
            .collect();

        Ok(PagedResult {
            items,
            page: page.number,
            size: page.size,
            total: matching.len() as u64,
        })
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    held: HashMap<AccountNumber, OwnedMutexGuard<()>>,
    writes: HashMap<AccountNumber, Decimal>,
    inserts: Vec<Transaction>,
}

impl MemoryUnitOfWork {
    pub fn holds_lock(&self, number: &AccountNumber) -> bool {
        self.held.contains_key(number)
    }

    /// Take the row lock unless already held; `false` if the card does not exist
    async fn lock_row(&mut self, number: &AccountNumber) -> Result<bool, StoreError> {
        if self.held.contains_key(number) {
            return Ok(true);
        }

        let Some(row) = self.inner.row_lock(number)? else {
            return Ok(false);
        };

        match tokio::time::timeout(self.inner.lock_timeout, row.lock_owned()).await {
            Ok(guard) => {
                self.held.insert(number.clone(), guard);
                Ok(true)
            }
            Err(_) => {
                debug!(card = %number.masked(), "Row lock wait timed out");
                Err(StoreError::LockTimeout(number.masked()))
            }
        }
    }

    fn visible_balance(&self, number: &AccountNumber) -> Result<Option<Decimal>, StoreError> {
        if let Some(balance) = self.writes.get(number) {
            return Ok(Some(*balance));
        }
        Ok(self.inner.state()?.accounts.get(number).map(|a| a.balance))
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    async fn find_owner(&mut self, identity: &Identity) -> Result<Option<OwnerProfile>, StoreError> {
        let state = self.inner.state()?;
        Ok(state.owners.get(identity).map(|cards| OwnerProfile {
            identity: identity.clone(),
            accounts: cards.clone(),
        }))
    }

    async fn find_account(&mut self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let mut account = self.inner.state()?.accounts.get(number).cloned();
        if let (Some(account), Some(balance)) = (account.as_mut(), self.writes.get(number)) {
            account.balance = *balance;
        }
        Ok(account)
    }

    async fn find_account_balance_for_update(
        &mut self,
        number: &AccountNumber,
    ) -> Result<Option<Decimal>, StoreError> {
        if !self.lock_row(number).await? {
            return Ok(None);
        }
        self.visible_balance(number)
    }

    async fn update_balance(
        &mut self,
        number: &AccountNumber,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        if self.inner.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected update failure".to_string()));
        }
        if new_balance < Decimal::ZERO {
            return Err(StoreError::ConstraintViolation(format!(
                "balance of {} would be negative",
                number.masked()
            )));
        }
        if !self.lock_row(number).await? {
            return Err(StoreError::ConstraintViolation(format!(
                "card {} does not exist",
                number.masked()
            )));
        }

        self.writes.insert(number.clone(), new_balance);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryUnitOfWork {
    async fn insert_transaction(
        &mut self,
        transaction: FinalizedTransaction,
    ) -> Result<Transaction, StoreError> {
        if self.inner.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected insert failure".to_string()));
        }

        let id = TransactionId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let record = transaction.into_persisted(id);
        self.inserts.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut state = this.inner.state()?;

        for (number, balance) in &this.writes {
            if !state.accounts.contains_key(number) {
                warn!(card = %number.masked(), "Commit dropped write to unknown card");
                return Err(StoreError::ConstraintViolation(format!(
                    "card {} does not exist",
                    number.masked()
                )));
            }
            debug_assert!(*balance >= Decimal::ZERO);
        }

        for (number, balance) in this.writes {
            if let Some(account) = state.accounts.get_mut(&number) {
                account.balance = balance;
            }
        }
        for record in this.inserts {
            state.ledger.insert(record.id, record);
        }

        // Row guards in `this.held` are released when `this` drops
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
