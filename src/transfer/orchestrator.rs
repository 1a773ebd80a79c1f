//! Transfer Orchestrator
//!
//! Drives one transfer through its lifecycle inside a single unit of work:
//!
//! ```text
//! begin ─▶ validate ─▶ mutate ─▶ APPROVED ─▶ insert ─▶ commit
//!             │           │
//!             │           └─▶ rollback (error surfaced, DENIED(ABORTED) audit row)
//!             └─▶ DENIED(reason) ─▶ insert ─▶ commit
//! ```
//!
//! # Invariants
//!
//! 1. A record is `APPROVED` only if both balance updates and the ledger
//!    insert committed in the same unit of work.
//! 2. Every domain denial is written to the ledger.
//! 3. A failed unit of work is rolled back as a whole; no one-sided balance
//!    change becomes visible.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::TransferError;
use super::mutator;
use super::status::DenialReason;
use super::store::{TransferStore, UnitOfWork};
use super::types::{
    FinalizedTransaction, Page, PagedResult, PendingTransaction, Transaction, TransactionId,
    TransferRequest,
};
use super::validator;
use crate::account::Identity;
use crate::config::TransferConfig;
use crate::logging::TRANSFER_TRACE;

pub struct TransferOrchestrator {
    store: Arc<dyn TransferStore>,
    config: TransferConfig,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn TransferStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Run a transfer on behalf of `identity`
    ///
    /// Returns the persisted record: `APPROVED`, or `DENIED(reason)` for the
    /// domain denials. Malformed requests are rejected before any store access
    /// and leave no record. Infrastructure failures are returned as errors.
    pub async fn execute(
        &self,
        identity: &Identity,
        request: TransferRequest,
    ) -> Result<Transaction, TransferError> {
        request.check(self.config.amount_scale)?;

        let pending = PendingTransaction::new(&request);
        tracing::trace!(
            target: TRANSFER_TRACE,
            request_id = %request.request_id,
            status = %pending.status(),
            "Transaction created"
        );

        let mut attempt: u32 = 0;
        loop {
            match self.run_once(identity, &request, pending.clone()).await {
                Ok(record) => {
                    info!(
                        request_id = %request.request_id,
                        transaction_id = %record.id,
                        sender = %record.sender.masked(),
                        recipient = %record.recipient.masked(),
                        amount = %record.amount,
                        status = %record.status,
                        "Transfer finished"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        request_id = %request.request_id,
                        attempt = attempt,
                        error = %e,
                        "Serialization conflict, re-running unit of work"
                    );
                }
                Err(e) => {
                    error!(
                        request_id = %request.request_id,
                        code = e.code(),
                        error = %e,
                        "Transfer aborted"
                    );
                    if self.config.record_aborted_attempts {
                        self.record_aborted(&request, pending).await;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One unit of work: validate, mutate, finalize, persist, commit
    async fn run_once(
        &self,
        identity: &Identity,
        request: &TransferRequest,
        pending: PendingTransaction,
    ) -> Result<Transaction, TransferError> {
        let mut uow = self.store.begin().await?;

        let finalized = match validator::validate(uow.as_mut(), identity, request).await {
            Ok(validated) => match mutator::apply(uow.as_mut(), &validated).await {
                Ok(()) => pending.approve(),
                Err(e) => return Err(abort(uow, e).await),
            },
            Err(e) => match e.denial_reason() {
                Some(reason) => pending.deny(reason),
                None => return Err(abort(uow, e).await),
            },
        };

        persist(uow, finalized).await
    }

    /// Best-effort DENIED(ABORTED) row in a fresh unit of work
    async fn record_aborted(&self, request: &TransferRequest, pending: PendingTransaction) {
        let result: Result<Transaction, TransferError> = async {
            let uow = self.store.begin().await?;
            persist(uow, pending.deny(DenialReason::Aborted)).await
        }
        .await;

        match result {
            Ok(record) => warn!(
                request_id = %request.request_id,
                transaction_id = %record.id,
                "Aborted transfer recorded"
            ),
            Err(e) => error!(
                request_id = %request.request_id,
                error = %e,
                "Failed to record aborted transfer"
            ),
        }
    }

    pub async fn find_by_id(&self, id: TransactionId) -> Result<Transaction, TransferError> {
        self.store
            .find_transaction(id)
            .await?
            .ok_or(TransferError::TransactionNotFound(id))
    }

    pub async fn find_by_owner(
        &self,
        owner: &Identity,
        page: Page,
    ) -> Result<PagedResult<Transaction>, TransferError> {
        Ok(self.store.find_transactions_by_owner(owner, page).await?)
    }
}

async fn persist(
    mut uow: Box<dyn UnitOfWork>,
    finalized: FinalizedTransaction,
) -> Result<Transaction, TransferError> {
    let record = match uow.insert_transaction(finalized).await {
        Ok(record) => record,
        Err(e) => return Err(abort(uow, e.into()).await),
    };
    uow.commit().await?;
    Ok(record)
}

async fn abort(uow: Box<dyn UnitOfWork>, cause: TransferError) -> TransferError {
    if let Err(e) = uow.rollback().await {
        warn!(error = %e, cause = %cause, "Rollback failed");
    }
    cause
}
