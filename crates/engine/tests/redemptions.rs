mod common;

use engine::{EngineError, EntryKind, NotificationKind, RedemptionStatus, ReferenceKind};

use common::{earn, harness, household, reward};

#[tokio::test]
async fn rejected_redemption_refunds_the_frozen_amount() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    earn(&h.engine, &home, 100).await;
    let movie = reward(&h.engine, &home, "Movie night", 100).await;

    let redemption = h
        .engine
        .request_redemption(movie.id, home.child.id)
        .await
        .unwrap();
    assert_eq!(redemption.status, RedemptionStatus::Pending);
    assert_eq!(redemption.coin_amount, 100);
    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 0);
    assert!(
        h.sink
            .kinds_for(home.parent.id)
            .contains(&NotificationKind::RedemptionRequested)
    );

    let rejected = h
        .engine
        .reject_redemption(redemption.id, home.parent.id, "Not on a school night")
        .await
        .unwrap();
    assert_eq!(rejected.status, RedemptionStatus::Rejected);
    assert_eq!(rejected.reviewed_by, Some(home.parent.id));
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Not on a school night")
    );

    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 100);
    assert_eq!(wallet.total_spent, 100);
    assert_eq!(wallet.total_earned, 200);
    assert!(
        h.sink
            .kinds_for(home.child.id)
            .contains(&NotificationKind::RedemptionRejected)
    );

    let ledger = h
        .engine
        .wallet_transactions(home.child.id, home.parent.id, None, 0)
        .await
        .unwrap();
    let refund = ledger
        .iter()
        .find(|e| e.reason == "Refund: Movie night")
        .unwrap();
    assert_eq!(refund.kind, EntryKind::Credit);
    assert_eq!(refund.amount, 100);
    let reference = refund.reference.unwrap();
    assert_eq!(reference.kind, ReferenceKind::Redemption);
    assert_eq!(reference.id, redemption.id);
}

#[tokio::test]
async fn approval_leaves_the_wallet_alone() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    earn(&h.engine, &home, 80).await;
    let ice_cream = reward(&h.engine, &home, "Ice cream", 30).await;

    let redemption = h
        .engine
        .request_redemption(ice_cream.id, home.child.id)
        .await
        .unwrap();
    let before = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(before.balance, 50);

    let approved = h
        .engine
        .approve_redemption(redemption.id, home.parent.id)
        .await
        .unwrap();
    assert_eq!(approved.status, RedemptionStatus::Approved);
    assert!(approved.reviewed_at.is_some());

    let after = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(after.balance, before.balance);
    assert_eq!(after.total_spent, before.total_spent);

    // Terminal: no second review either way.
    let err = h
        .engine
        .approve_redemption(redemption.id, home.parent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    let err = h
        .engine
        .reject_redemption(redemption.id, home.parent.id, "oops")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    let after = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(after.balance, 50);
}

#[tokio::test]
async fn price_is_frozen_at_request_time() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    earn(&h.engine, &home, 40).await;
    let comic = reward(&h.engine, &home, "Comic", 40).await;

    let redemption = h
        .engine
        .request_redemption(comic.id, home.child.id)
        .await
        .unwrap();
    // Hiding the reward afterwards does not affect the pending request.
    h.engine
        .set_reward_active(comic.id, home.parent.id, false)
        .await
        .unwrap();

    h.engine
        .reject_redemption(redemption.id, home.parent.id, "Sold out")
        .await
        .unwrap();
    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 40);
}

#[tokio::test]
async fn request_needs_funds_and_an_active_family_reward() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    let other = household(&h.engine, "Bianchi").await;
    earn(&h.engine, &home, 20).await;

    let bike = reward(&h.engine, &home, "New bike", 500).await;
    let err = h
        .engine
        .request_redemption(bike.id, home.child.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientFunds("balance is 20, need 500".to_string())
    );

    let sticker = reward(&h.engine, &home, "Sticker", 5).await;
    h.engine
        .set_reward_active(sticker.id, home.parent.id, false)
        .await
        .unwrap();
    let err = h
        .engine
        .request_redemption(sticker.id, home.child.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("reward is not active".to_string())
    );

    let foreign = reward(&h.engine, &other, "Zoo trip", 5).await;
    let err = h
        .engine
        .request_redemption(foreign.id, home.child.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Unauthorized("reward belongs to another family".to_string())
    );

    let err = h
        .engine
        .request_redemption(sticker.id, home.parent.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Unauthorized("only a child can do this".to_string())
    );

    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 20);
    assert!(
        h.engine
            .redemptions(home.child.id, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn reviews_are_for_parents_of_the_family() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    let other = household(&h.engine, "Bianchi").await;
    earn(&h.engine, &home, 20).await;
    let sticker = reward(&h.engine, &home, "Sticker", 5).await;
    let redemption = h
        .engine
        .request_redemption(sticker.id, home.child.id)
        .await
        .unwrap();

    let err = h
        .engine
        .approve_redemption(redemption.id, other.parent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    let err = h
        .engine
        .reject_redemption(redemption.id, home.child.id, "I changed my mind")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    let err = h
        .engine
        .reject_redemption(redemption.id, home.parent.id, "")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let pending = h
        .engine
        .redemptions(home.parent.id, Some(RedemptionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert!(
        h.engine
            .redemptions(other.parent.id, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn catalog_is_family_scoped() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    let other = household(&h.engine, "Bianchi").await;

    let movie = reward(&h.engine, &home, "Movie night", 100).await;
    reward(&h.engine, &home, "Sticker", 5).await;
    reward(&h.engine, &other, "Zoo trip", 50).await;
    h.engine
        .set_reward_active(movie.id, home.parent.id, false)
        .await
        .unwrap();

    let parent_view = h.engine.rewards(home.parent.id).await.unwrap();
    let names: Vec<&str> = parent_view.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Sticker", "Movie night"]);

    let child_view = h.engine.rewards(home.child.id).await.unwrap();
    assert_eq!(child_view.len(), 1);
    assert_eq!(child_view[0].name, "Sticker");

    let err = h
        .engine
        .set_reward_active(movie.id, other.parent.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let err = h
        .engine
        .create_reward(engine::NewRewardCmd::new(home.parent.id, "Free", 0))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("coin_cost must be > 0".to_string())
    );
}
