#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Engine, Family, NewRewardCmd, NewTaskCmd, Notification, NotificationKind, NotificationSink,
    NotifyError, Reward, Task, TaskAssignment, User,
};
use migration::MigratorTrait;

/// Keeps every notification handed to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl NotificationSink for RecordingSink {
    fn create(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

impl RecordingSink {
    pub fn all(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds_for(&self, user_id: Uuid) -> Vec<NotificationKind> {
        self.all()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.kind)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

/// Refuses every notification.
#[derive(Debug, Default)]
pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn create(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError("push service unavailable".to_string()))
    }
}

pub async fn database() -> DatabaseConnection {
    // A single connection: every pooled connection would otherwise see its
    // own empty in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub sink: Arc<RecordingSink>,
}

pub async fn harness() -> Harness {
    let db = database().await;
    let sink = Arc::new(RecordingSink::default());
    let engine = Engine::builder()
        .database(db.clone())
        .notification_sink(sink.clone())
        .build()
        .await
        .unwrap();
    Harness {
        engine: Arc::new(engine),
        db,
        sink,
    }
}

pub async fn engine_with_sink(sink: Arc<dyn NotificationSink>) -> (Arc<Engine>, DatabaseConnection) {
    let db = database().await;
    let engine = Engine::builder()
        .database(db.clone())
        .notification_sink(sink)
        .build()
        .await
        .unwrap();
    (Arc::new(engine), db)
}

/// One family with one parent and one child.
pub struct Household {
    pub family: Family,
    pub parent: User,
    pub child: User,
}

pub async fn household(engine: &Engine, name: &str) -> Household {
    let family = engine.create_family(name).await.unwrap();
    let parent = engine.create_parent(family.id, "Mum").await.unwrap();
    let child = engine.create_child(parent.id, "Leo").await.unwrap();
    Household {
        family,
        parent,
        child,
    }
}

/// A one-off task assigned to the household's child.
pub async fn chore(engine: &Engine, home: &Household, coins: i64, xp: i64) -> (Task, TaskAssignment) {
    let (task, mut assignments) = engine
        .create_task(NewTaskCmd::new(home.parent.id, "Wash the dishes", coins, xp).assign_to(home.child.id))
        .await
        .unwrap();
    (task, assignments.remove(0))
}

/// Complete and approve `coins` worth of work so the child has money.
pub async fn earn(engine: &Engine, home: &Household, coins: i64) {
    let (_, assignment) = chore(engine, home, coins, 5).await;
    engine.complete(assignment.id, home.child.id).await.unwrap();
    engine.approve(assignment.id, home.parent.id).await.unwrap();
}

pub async fn reward(engine: &Engine, home: &Household, name: &str, cost: i64) -> Reward {
    engine
        .create_reward(NewRewardCmd::new(home.parent.id, name, cost))
        .await
        .unwrap()
}
