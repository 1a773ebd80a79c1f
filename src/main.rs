//! Card Transfer - operator CLI
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│  Worker Pool │───▶│ Orchestrator │───▶│  Store   │
//! │  (YAML)  │    │ (mpsc queue) │    │ (UoW / txn)  │    │ (PG/mem) │
//! └──────────┘    └──────────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! Every command prints its result as JSON on stdout. Logs go to the file
//! configured for the environment and, in text mode, to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use card_transfer::account::{AccountNumber, Identity};
use card_transfer::config::AppConfig;
use card_transfer::db::Database;
use card_transfer::logging::init_logging;
use card_transfer::transfer::{
    MemoryStore, Page, PgTransferStore, TransactionId, TransferOrchestrator, TransferRequest,
    TransferWorkerPool,
};

#[derive(Parser)]
#[command(name = "card_transfer")]
#[command(about = "Card-to-card transfer core")]
#[command(version = env!("BUILD_ID"))]
struct Cli {
    /// Config environment (loads config/<env>.yaml)
    #[arg(short, long, default_value = "dev")]
    env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables and indexes
    InitSchema,
    /// Provision an owner and a card with an opening balance
    OpenAccount {
        #[arg(long, value_parser = Identity::new)]
        owner: Identity,
        #[arg(long, value_parser = AccountNumber::new)]
        card: AccountNumber,
        #[arg(long)]
        balance: Decimal,
    },
    /// Transfer money on behalf of an owner
    Transfer {
        /// Authenticated owner email
        #[arg(long = "as", value_parser = Identity::new)]
        identity: Identity,
        /// Sender card number
        #[arg(long)]
        from: String,
        /// Recipient card number
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Decimal,
    },
    /// Show one transaction
    Show {
        #[arg(long)]
        id: TransactionId,
    },
    /// List transactions touching an owner's cards, newest first
    History {
        #[arg(long = "as", value_parser = Identity::new)]
        identity: Identity,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    /// Run the concurrent-debit scenario against the in-memory store
    Demo,
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    code: &'a str,
    status: u16,
    message: String,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::load(&cli.env)?;
    let _log_guard = init_logging(&app_config);

    tracing::info!(env = %cli.env, build = env!("BUILD_ID"), "Starting card_transfer");

    if matches!(cli.command, Commands::Demo) {
        return run_demo(&app_config).await;
    }

    let url = app_config
        .postgres_url
        .as_deref()
        .context("postgres_url is not configured for this environment")?;
    let db = Database::connect(url, &app_config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = Arc::new(PgTransferStore::new(
        db.pool().clone(),
        app_config.transfer.lock_timeout(),
    ));
    let orchestrator = TransferOrchestrator::new(store.clone(), app_config.transfer.clone());

    let outcome = match cli.command {
        Commands::InitSchema => {
            db.init_schema().await?;
            return print_json(&serde_json::json!({ "schema": "ready" }));
        }
        Commands::OpenAccount {
            owner,
            card,
            balance,
        } => {
            store.open_account(&owner, &card, balance).await?;
            return print_json(&serde_json::json!({
                "owner": owner,
                "card": card.masked(),
                "balance": balance,
            }));
        }
        Commands::Transfer {
            identity,
            from,
            to,
            amount,
        } => match TransferRequest::parse(&from, &to, amount) {
            Ok(request) => orchestrator.execute(&identity, request).await,
            Err(e) => Err(e),
        }
        .map(serde_json::to_value),
        Commands::Show { id } => orchestrator.find_by_id(id).await.map(serde_json::to_value),
        Commands::History {
            identity,
            page,
            size,
        } => orchestrator
            .find_by_owner(&identity, Page::new(page, size))
            .await
            .map(serde_json::to_value),
        Commands::Demo => return run_demo(&app_config).await,
    };

    match outcome {
        Ok(value) => print_json(&value?),
        Err(e) => {
            print_json(&ErrorOutput {
                code: e.code(),
                status: e.http_status(),
                message: e.to_string(),
            })?;
            std::process::exit(1);
        }
    }
}

/// Two concurrent debits of 60 against a balance of 100
async fn run_demo(app_config: &AppConfig) -> anyhow::Result<()> {
    let store = MemoryStore::with_lock_timeout(app_config.transfer.lock_timeout());
    let alice = Identity::new("alice@example.com")?;
    let sender = AccountNumber::new("4000000000000001")?;
    let recipients = [
        AccountNumber::new("4000000000000002")?,
        AccountNumber::new("4000000000000003")?,
    ];

    store.open_account(&alice, &sender, Decimal::from(100));
    store.open_account(&Identity::new("bob@example.com")?, &recipients[0], Decimal::ZERO);
    store.open_account(&Identity::new("carol@example.com")?, &recipients[1], Decimal::ZERO);

    let orchestrator = Arc::new(TransferOrchestrator::new(
        Arc::new(store.clone()),
        app_config.transfer.clone(),
    ));
    let pool = TransferWorkerPool::start(orchestrator);

    let submit = |to: &AccountNumber| {
        let tx = pool.sender();
        let request = TransferRequest::new(sender.clone(), to.clone(), Decimal::from(60));
        let alice = alice.clone();
        async move { tx.submit(alice, request).await }
    };
    let (first, second) = tokio::join!(submit(&recipients[0]), submit(&recipients[1]));
    let results = [first?, second?];
    pool.shutdown().await;

    print_json(&serde_json::json!({
        "transactions": results,
        "balances": {
            "sender": store.balance(&sender),
            "recipients": recipients.iter().map(|r| store.balance(r)).collect::<Vec<_>>(),
        },
        "total": store.total_balance(),
    }))
}
