//! Transfer Worker Pool
//!
//! Bounded queue in front of the orchestrator. Callers submit a job over an
//! mpsc channel and await the outcome on a oneshot channel; a fixed set of
//! workers drains the queue concurrently.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::TransferError;
use super::orchestrator::TransferOrchestrator;
use super::types::{Transaction, TransferRequest};
use crate::account::Identity;

/// One queued transfer
#[derive(Debug)]
pub struct TransferJob {
    pub identity: Identity,
    pub request: TransferRequest,
    /// Response channel (oneshot)
    pub response_tx: oneshot::Sender<Result<Transaction, TransferError>>,
}

/// Submitting side of the pool
#[derive(Clone)]
pub struct TransferSender {
    tx: mpsc::Sender<TransferJob>,
}

impl TransferSender {
    /// Queue a transfer and wait for its outcome
    ///
    /// Waits for queue space when the pool is saturated.
    pub async fn submit(
        &self,
        identity: Identity,
        request: TransferRequest,
    ) -> Result<Transaction, TransferError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(TransferJob {
                identity,
                request,
                response_tx,
            })
            .await
            .map_err(|_| TransferError::ServiceUnavailable("transfer queue closed".to_string()))?;

        response_rx.await.map_err(|_| {
            TransferError::ServiceUnavailable("transfer worker dropped the job".to_string())
        })?
    }
}

pub struct TransferWorkerPool {
    sender: TransferSender,
    workers: Vec<JoinHandle<usize>>,
}

impl TransferWorkerPool {
    /// Start a pool sized from the orchestrator's configuration
    pub fn start(orchestrator: Arc<TransferOrchestrator>) -> Self {
        let workers = orchestrator.config().workers;
        let queue_size = orchestrator.config().queue_size;
        Self::with_size(orchestrator, workers, queue_size)
    }

    pub fn with_size(
        orchestrator: Arc<TransferOrchestrator>,
        workers: usize,
        queue_size: usize,
    ) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| tokio::spawn(run_worker(id, orchestrator.clone(), rx.clone())))
            .collect();

        info!(workers = workers, queue_size = queue_size, "Transfer worker pool started");

        Self {
            sender: TransferSender { tx },
            workers: handles,
        }
    }

    pub fn sender(&self) -> TransferSender {
        self.sender.clone()
    }

    /// Stop accepting work and wait for the queue to drain
    ///
    /// Workers exit once every [`TransferSender`] clone is dropped. Returns the
    /// number of jobs processed.
    pub async fn shutdown(self) -> usize {
        drop(self.sender);

        let mut processed = 0;
        for result in join_all(self.workers).await {
            match result {
                Ok(n) => processed += n,
                Err(e) => warn!(error = %e, "Transfer worker panicked"),
            }
        }

        info!(processed = processed, "Transfer worker pool stopped");
        processed
    }
}

async fn run_worker(
    id: usize,
    orchestrator: Arc<TransferOrchestrator>,
    rx: Arc<Mutex<mpsc::Receiver<TransferJob>>>,
) -> usize {
    let mut processed = 0;

    loop {
        // Only the idle worker holding the mutex waits on the channel
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let request_id = job.request.request_id;
        let result = orchestrator.execute(&job.identity, job.request).await;
        if job.response_tx.send(result).is_err() {
            debug!(worker = id, request_id = %request_id, "Caller went away before the reply");
        }
        processed += 1;
    }

    debug!(worker = id, processed = processed, "Transfer worker exiting");
    processed
}
