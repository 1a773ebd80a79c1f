//! Card-to-card Transfers
//!
//! Moves money between two cards on behalf of an authenticated owner. One
//! transfer runs inside one serializable unit of work: validate, lock and
//! debit the sender, credit the recipient, append the ledger record, commit.
//!
//! # Status Model
//!
//! ```text
//! PENDING ─┬─▶ APPROVED
//!          └─▶ DENIED(reason)
//! ```
//!
//! `PENDING` never leaves the process. Only terminal records reach the
//! ledger, and they are never updated afterwards.
//!
//! # Safety Invariants
//!
//! 1. **Conservation**: an approved transfer moves exactly `amount` from the
//!    sender to the recipient.
//! 2. **No Overdraft**: the sender balance is read under a row lock and no
//!    committed balance is ever negative.
//! 3. **All or Nothing**: balance changes and the ledger insert commit
//!    together or not at all.

pub mod error;
pub mod memory;
pub mod mutator;
pub mod orchestrator;
pub mod pool;
pub mod postgres;
pub mod status;
pub mod store;
pub mod types;
pub mod validator;


// Re-exports for convenience
pub use error::{StoreError, TransferError};
pub use memory::MemoryStore;
pub use orchestrator::TransferOrchestrator;
pub use pool::{TransferSender, TransferWorkerPool};
pub use postgres::PgTransferStore;
pub use status::{DenialReason, TransactionStatus};
pub use store::{AccountStore, LedgerStore, TransferStore, UnitOfWork};
pub use types::{Page, PagedResult, Transaction, TransactionId, TransferRequest};
