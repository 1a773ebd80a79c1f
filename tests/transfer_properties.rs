use std::sync::Arc;

use card_transfer::config::TransferConfig;
use card_transfer::transfer::{
    DenialReason, MemoryStore, Page, TransactionStatus, TransferError, TransferOrchestrator,
    TransferRequest, TransferWorkerPool,
};
use card_transfer::{AccountNumber, Identity};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn card(n: &str) -> AccountNumber {
    AccountNumber::new(n).unwrap()
}

fn owner(name: &str) -> Identity {
    Identity::new(&format!("{name}@bank.test")).unwrap()
}

/// Orchestrator over a fresh store with the given cards
fn setup(cards: &[(&str, &str, Decimal)]) -> (MemoryStore, Arc<TransferOrchestrator>) {
    let store = MemoryStore::new();
    for (name, number, balance) in cards {
        store.open_account(&owner(name), &card(number), *balance);
    }
    let orchestrator = Arc::new(TransferOrchestrator::new(
        Arc::new(store.clone()),
        TransferConfig::default(),
    ));
    (store, orchestrator)
}

#[tokio::test]
async fn qa_approved_transfer_conserves_money() {
    let (store, orchestrator) = setup(&[("ann", "5100", dec!(80.25)), ("ben", "5200", dec!(19.75))]);

    let record = orchestrator
        .execute(&owner("ann"), TransferRequest::new(card("5100"), card("5200"), dec!(30.25)))
        .await
        .unwrap();

    assert_eq!(record.status, TransactionStatus::Approved);
    assert_eq!(store.balance(&card("5100")), Some(dec!(50.00)));
    assert_eq!(store.balance(&card("5200")), Some(dec!(50.00)));
    assert_eq!(store.total_balance(), dec!(100));
}

#[tokio::test]
async fn qa_overdraft_is_denied_and_recorded() {
    let (store, orchestrator) = setup(&[("ann", "5100", dec!(10)), ("ben", "5200", dec!(0))]);

    let record = orchestrator
        .execute(&owner("ann"), TransferRequest::new(card("5100"), card("5200"), dec!(10.01)))
        .await
        .unwrap();

    assert_eq!(
        record.status,
        TransactionStatus::Denied(DenialReason::InsufficientFunds)
    );
    assert_eq!(store.balance(&card("5100")), Some(dec!(10)));
    assert_eq!(orchestrator.find_by_id(record.id).await.unwrap(), record);
}

#[tokio::test]
async fn qa_unknown_requester_is_denied() {
    let (store, orchestrator) = setup(&[("ann", "5100", dec!(10)), ("ben", "5200", dec!(0))]);

    let record = orchestrator
        .execute(&owner("eve"), TransferRequest::new(card("5100"), card("5200"), dec!(1)))
        .await
        .unwrap();

    assert_eq!(
        record.status,
        TransactionStatus::Denied(DenialReason::SenderNotFound)
    );
    assert_eq!(store.balance(&card("5100")), Some(dec!(10)));
}

#[tokio::test]
async fn qa_sub_cent_amount_is_rejected() {
    let (store, orchestrator) = setup(&[("ann", "5100", dec!(10)), ("ben", "5200", dec!(0))]);

    let err = orchestrator
        .execute(&owner("ann"), TransferRequest::new(card("5100"), card("5200"), dec!(0.001)))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::PrecisionOverflow { .. }));
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qa_worker_pool_serializes_competing_debits() {
    let (store, orchestrator) = setup(&[
        ("ann", "5100", dec!(100)),
        ("ben", "5200", dec!(0)),
        ("cat", "5300", dec!(0)),
    ]);
    let pool = TransferWorkerPool::with_size(orchestrator.clone(), 4, 16);

    let submissions = ["5200", "5300"].map(|to| {
        let sender = pool.sender();
        async move {
            sender
                .submit(owner("ann"), TransferRequest::new(card("5100"), card(to), dec!(60)))
                .await
        }
    });
    let results: Vec<_> = join_all(submissions)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    pool.shutdown().await;

    let statuses: Vec<_> = results.iter().map(|t| t.status).collect();
    assert!(statuses.contains(&TransactionStatus::Approved));
    assert!(statuses.contains(&TransactionStatus::Denied(DenialReason::InsufficientFunds)));
    assert_eq!(store.balance(&card("5100")), Some(dec!(40)));
    assert_eq!(store.total_balance(), dec!(100));

    let history = orchestrator
        .find_by_owner(&owner("ann"), Page::default())
        .await
        .unwrap();
    assert_eq!(history.total, 2);
}
