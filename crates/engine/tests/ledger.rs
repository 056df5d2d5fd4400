mod common;

use std::sync::Arc;

use engine::{EngineError, EntryKind, Reference, ReferenceKind};
use uuid::Uuid;

use common::{harness, household};

#[tokio::test]
async fn credit_and_debit_keep_wallet_totals_in_step() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;

    let assignment = Uuid::new_v4();
    h.engine
        .credit(home.child.id, 30, "Birthday", Some(Reference::assignment(assignment)))
        .await
        .unwrap();
    let entry = h
        .engine
        .debit(home.child.id, 12, "Stickers", None)
        .await
        .unwrap();
    assert_eq!(entry.kind, EntryKind::Debit);
    assert_eq!(entry.balance_after, 18);

    let wallet = h.engine.wallet(home.child.id, home.parent.id).await.unwrap();
    assert_eq!(wallet.balance, 18);
    assert_eq!(wallet.total_earned, 30);
    assert_eq!(wallet.total_spent, 12);
    assert_eq!(wallet.balance, wallet.total_earned - wallet.total_spent);

    let ledger = h
        .engine
        .wallet_transactions(home.child.id, home.child.id, None, 0)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 2);
    let credit = ledger
        .iter()
        .find(|e| e.kind == EntryKind::Credit)
        .unwrap();
    assert_eq!(credit.amount, 30);
    assert_eq!(credit.reason, "Birthday");
    let reference = credit.reference.unwrap();
    assert_eq!(reference.kind, ReferenceKind::Assignment);
    assert_eq!(reference.id, assignment);
}

#[tokio::test]
async fn debit_beyond_balance_changes_nothing() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    h.engine.credit(home.child.id, 10, "Gift", None).await.unwrap();

    let err = h
        .engine
        .debit(home.child.id, 11, "Too much", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 10);
    assert_eq!(wallet.total_spent, 0);
    let ledger = h
        .engine
        .wallet_transactions(home.child.id, home.child.id, None, 0)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn rejects_bad_amounts_and_reasons() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;

    for amount in [0, -5] {
        let err = h
            .engine
            .credit(home.child.id, amount, "Gift", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
    let err = h
        .engine
        .credit(home.child.id, 5, "   ", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("reason must not be empty".to_string())
    );
}

#[tokio::test]
async fn parents_have_no_wallet() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;

    let err = h
        .engine
        .credit(home.parent.id, 5, "Gift", None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("wallet".to_string()));
}

#[tokio::test]
async fn concurrent_movements_never_lose_updates() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    h.engine.credit(home.child.id, 100, "Start", None).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = Arc::clone(&h.engine);
        let child_id = home.child.id;
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.credit(child_id, 5, "Bonus", None).await
            } else {
                engine.debit(child_id, 7, "Snack", None).await
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 100 + 10 * 5 - 10 * 7);
    assert_eq!(wallet.total_earned, 150);
    assert_eq!(wallet.total_spent, 70);

    let ledger = h
        .engine
        .wallet_transactions(home.child.id, home.child.id, Some(200), 0)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 21);
    assert!(ledger.iter().all(|e| e.balance_after >= 0));
}

#[tokio::test]
async fn concurrent_debits_stop_at_zero() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    h.engine.credit(home.child.id, 50, "Start", None).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = Arc::clone(&h.engine);
        let child_id = home.child.id;
        handles.push(tokio::spawn(async move {
            engine.debit(child_id, 10, "Candy", None).await
        }));
    }
    let mut succeeded = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EngineError::InsufficientFunds(_)) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 5);
    assert_eq!(refused, 5);

    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.total_spent, 50);
}

#[tokio::test]
async fn only_the_child_and_its_parents_see_the_wallet() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    let sibling = h.engine.create_child(home.parent.id, "Mia").await.unwrap();
    let other = household(&h.engine, "Bianchi").await;

    let err = h
        .engine
        .wallet(home.child.id, sibling.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let err = h
        .engine
        .wallet(home.child.id, other.parent.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Unauthorized("parent belongs to another family".to_string())
    );

    let err = h
        .engine
        .wallet_transactions(home.child.id, home.parent.id, Some(0), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn ledger_pages_cover_every_entry() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    for amount in 1..=5 {
        h.engine
            .credit(home.child.id, amount, "Allowance", None)
            .await
            .unwrap();
    }

    let first = h
        .engine
        .wallet_transactions(home.child.id, home.parent.id, Some(2), 0)
        .await
        .unwrap();
    let rest = h
        .engine
        .wallet_transactions(home.child.id, home.parent.id, Some(10), 2)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(rest.len(), 3);
    let mut balances: Vec<i64> = first
        .iter()
        .chain(rest.iter())
        .map(|e| e.balance_after)
        .collect();
    balances.sort_unstable();
    assert_eq!(balances, vec![1, 3, 6, 10, 15]);
}
