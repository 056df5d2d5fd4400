mod common;

use engine::{EngineError, Notification, NotificationKind, Reference, ReferenceKind, Role};
use uuid::Uuid;

use common::{harness, household};

#[tokio::test]
async fn stored_notifications_can_be_read() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;

    let assignment = Uuid::new_v4();
    let first = h
        .engine
        .store_notification(
            &Notification::new(home.child.id, NotificationKind::TaskAssigned, "New task", "Dishes")
                .reference(Reference::assignment(assignment)),
        )
        .await
        .unwrap();
    h.engine
        .store_notification(&Notification::new(
            home.child.id,
            NotificationKind::LevelUp,
            "Level up!",
            "You reached level 2",
        ))
        .await
        .unwrap();
    assert!(!first.read);
    let reference = first.notification.reference.unwrap();
    assert_eq!(reference.kind, ReferenceKind::Assignment);
    assert_eq!(reference.id, assignment);

    assert_eq!(h.engine.unread_notifications(home.child.id).await.unwrap(), 2);
    assert_eq!(h.engine.notifications(home.child.id).await.unwrap().len(), 2);
    assert_eq!(h.engine.unread_notifications(home.parent.id).await.unwrap(), 0);

    let read = h
        .engine
        .mark_notification_read(first.id, home.child.id)
        .await
        .unwrap();
    assert!(read.read);
    assert_eq!(h.engine.unread_notifications(home.child.id).await.unwrap(), 1);

    assert_eq!(
        h.engine
            .mark_all_notifications_read(home.child.id)
            .await
            .unwrap(),
        1
    );
    assert_eq!(h.engine.unread_notifications(home.child.id).await.unwrap(), 0);
}

#[tokio::test]
async fn inbox_is_private() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;
    let stored = h
        .engine
        .store_notification(&Notification::new(
            home.child.id,
            NotificationKind::TaskApproved,
            "Task approved!",
            "+10 coins",
        ))
        .await
        .unwrap();

    let err = h
        .engine
        .mark_notification_read(stored.id, home.parent.id)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("notification".to_string()));

    let err = h
        .engine
        .store_notification(&Notification::new(
            Uuid::new_v4(),
            NotificationKind::LevelUp,
            "Level up!",
            "",
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("user".to_string()));
}

#[tokio::test]
async fn children_come_with_wallet_and_xp() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;

    let wallet = h.engine.wallet(home.child.id, home.child.id).await.unwrap();
    assert_eq!(wallet.balance, 0);
    let summary = h
        .engine
        .gamification(home.child.id, home.parent.id)
        .await
        .unwrap();
    assert_eq!(summary.xp.current_level, 1);
    assert_eq!(summary.xp.total_xp, 0);
    assert!(summary.badges.is_empty());

    let members = h.engine.family_members(home.family.id, None).await.unwrap();
    assert_eq!(members.len(), 2);
    let children = h
        .engine
        .family_members(home.family.id, Some(Role::Child))
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, home.child.id);
    assert_eq!(children[0].role, Role::Child);
    let parent = h.engine.user(home.parent.id).await.unwrap();
    assert_eq!(parent.display_name, "Mum");
    assert_eq!(parent.family_id, home.family.id);
}

#[tokio::test]
async fn directory_rejects_bad_input() {
    let h = harness().await;
    let home = household(&h.engine, "Rossi").await;

    let err = h.engine.create_family("  ").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("family name must not be empty".to_string())
    );
    let err = h
        .engine
        .create_parent(Uuid::new_v4(), "Dad")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("family".to_string()));
    let err = h
        .engine
        .create_child(home.child.id, "Baby")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Unauthorized("only a parent can do this".to_string())
    );
    let err = h.engine.user(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("user".to_string()));
}
