//! Card Transfer - card-to-card money transfer core
//!
//! # Modules
//!
//! - [`account`] - Card numbers, owner identities, owner profiles
//! - [`transfer`] - Validation, balance mutation, orchestration, stores
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`config`] - YAML configuration per environment
//! - [`logging`] - tracing subscriber setup

pub mod account;
pub mod config;
pub mod db;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{AccountNumber, Identity};
pub use config::{AppConfig, TransferConfig};
pub use transfer::{
    DenialReason, MemoryStore, PgTransferStore, TransactionStatus, TransferError,
    TransferOrchestrator, TransferRequest, TransferWorkerPool,
};
