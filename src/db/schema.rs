//! PostgreSQL schema for cards and the transaction ledger
//!
//! `transactions_tb` has no foreign keys to `cards_tb`; denied attempts may
//! name cards that do not exist.

use sqlx::PgPool;

/// Decimal places of every money column
pub const AMOUNT_SCALE: u32 = 2;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users_tb (
    email       VARCHAR(255) PRIMARY KEY,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const CREATE_CARDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cards_tb (
    card_number  VARCHAR(32) PRIMARY KEY,
    owner_email  VARCHAR(255) NOT NULL REFERENCES users_tb (email),
    balance      NUMERIC(20, 2) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const CREATE_CARDS_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_cards_owner ON cards_tb (owner_email)";

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions_tb (
    transaction_id         BIGSERIAL PRIMARY KEY,
    sender_card_number     VARCHAR(32) NOT NULL,
    recipient_card_number  VARCHAR(32) NOT NULL,
    amount                 NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    status                 SMALLINT NOT NULL CHECK (status <> 0),
    denial_reason          SMALLINT,
    created_at             TIMESTAMPTZ NOT NULL,
    CHECK ((status = -10) = (denial_reason IS NOT NULL))
)"#;

const CREATE_TRANSACTIONS_SENDER_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_transactions_sender \
     ON transactions_tb (sender_card_number, created_at DESC)";

const CREATE_TRANSACTIONS_RECIPIENT_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_transactions_recipient \
     ON transactions_tb (recipient_card_number, created_at DESC)";

const STATEMENTS: [(&str, &str); 6] = [
    ("users_tb", CREATE_USERS_TABLE),
    ("cards_tb", CREATE_CARDS_TABLE),
    ("idx_cards_owner", CREATE_CARDS_OWNER_INDEX),
    ("transactions_tb", CREATE_TRANSACTIONS_TABLE),
    ("idx_transactions_sender", CREATE_TRANSACTIONS_SENDER_INDEX),
    ("idx_transactions_recipient", CREATE_TRANSACTIONS_RECIPIENT_INDEX),
];

/// Create tables and indexes (idempotent)
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, ddl) in STATEMENTS {
        sqlx::query(ddl).execute(pool).await.inspect_err(|e| {
            tracing::error!(object = name, error = %e, "Failed to create schema object");
        })?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}
