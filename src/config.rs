use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::db::schema::AMOUNT_SCALE;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Emit per-step `TRANSFER_TRACE` events
    #[serde(default)]
    pub enable_tracing: bool,
    /// PostgreSQL connection URL for cards and the ledger
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 50,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Transfer processing settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TransferConfig {
    /// Number of concurrent transfer workers
    pub workers: usize,
    /// Bounded queue between submitters and workers
    pub queue_size: usize,
    /// How long a unit of work may wait for a row lock
    pub lock_timeout_ms: u64,
    /// Re-runs of a unit of work after a serialization conflict
    pub max_conflict_retries: u32,
    /// Decimal places shared by amounts and balances
    pub amount_scale: u32,
    /// Write a DENIED(ABORTED) record when a unit of work fails on infrastructure
    pub record_aborted_attempts: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            queue_size: 1024,
            lock_timeout_ms: 5_000,
            max_conflict_retries: 3,
            amount_scale: 2,
            record_aborted_attempts: true,
        }
    }
}

impl TransferConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        anyhow::ensure!(
            config.transfer.amount_scale <= AMOUNT_SCALE,
            "transfer.amount_scale {} exceeds the {} decimal places of the ledger columns",
            config.transfer.amount_scale,
            AMOUNT_SCALE
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: transfer.log
use_json: false
rotation: daily
"#;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert!(config.postgres_url.is_none());
        assert!(!config.enable_tracing);
        assert_eq!(config.transfer.workers, 8);
        assert_eq!(config.transfer.amount_scale, 2);
        assert_eq!(config.transfer.lock_timeout(), Duration::from_secs(5));
        assert_eq!(config.database.max_connections, 50);
    }

    #[test]
    fn test_partial_transfer_section() {
        let yaml = format!("{}transfer:\n  workers: 2\n  max_conflict_retries: 0\n", MINIMAL);
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.transfer.workers, 2);
        assert_eq!(config.transfer.max_conflict_retries, 0);
        assert_eq!(config.transfer.queue_size, 1024);
        assert!(config.transfer.record_aborted_attempts);
    }

    #[test]
    fn test_scale_wider_than_ledger_is_rejected() {
        let yaml = format!("{}transfer:\n  amount_scale: 4\n", MINIMAL);
        assert!(AppConfig::from_yaml(&yaml).is_err());

        let yaml = format!("{}transfer:\n  amount_scale: 0\n", MINIMAL);
        assert_eq!(AppConfig::from_yaml(&yaml).unwrap().transfer.amount_scale, 0);
    }

    #[test]
    fn test_missing_required_field_is_error() {
        assert!(AppConfig::from_yaml("log_level: info\n").is_err());
    }
}
