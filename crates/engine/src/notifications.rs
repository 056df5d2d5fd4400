//! Notifications.
//!
//! The engine never delivers anything itself. After a DB transaction commits
//! it hands each [`Notification`] to a [`NotificationSink`]; a sink failure is
//! logged and otherwise ignored, so delivery can never undo an economy
//! change.
//!
//! The `notifications` table is the stored inbox a sink may feed (see
//! [`Engine::store_notification`](crate::Engine::store_notification)).

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{EngineError, Reference};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskCompleted,
    TaskApproved,
    TaskRejected,
    TaskRemoved,
    RedemptionRequested,
    RedemptionApproved,
    RedemptionRejected,
    LevelUp,
    BadgeUnlocked,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskAssigned => "task_assigned",
            Self::TaskCompleted => "task_completed",
            Self::TaskApproved => "task_approved",
            Self::TaskRejected => "task_rejected",
            Self::TaskRemoved => "task_removed",
            Self::RedemptionRequested => "redemption_requested",
            Self::RedemptionApproved => "redemption_approved",
            Self::RedemptionRejected => "redemption_rejected",
            Self::LevelUp => "level_up",
            Self::BadgeUnlocked => "badge_unlocked",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "task_assigned" => Ok(Self::TaskAssigned),
            "task_completed" => Ok(Self::TaskCompleted),
            "task_approved" => Ok(Self::TaskApproved),
            "task_rejected" => Ok(Self::TaskRejected),
            "task_removed" => Ok(Self::TaskRemoved),
            "redemption_requested" => Ok(Self::RedemptionRequested),
            "redemption_approved" => Ok(Self::RedemptionApproved),
            "redemption_rejected" => Ok(Self::RedemptionRejected),
            "level_up" => Ok(Self::LevelUp),
            "badge_unlocked" => Ok(Self::BadgeUnlocked),
            other => Err(EngineError::Validation(format!(
                "invalid notification kind: {other}"
            ))),
        }
    }
}

/// An outbound message for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub reference: Option<Reference>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            reference: None,
        }
    }

    #[must_use]
    pub fn reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("notification not delivered: {0}")]
pub struct NotifyError(pub String);

/// Outbound seam for notifications.
///
/// Implementations must not block: the engine calls `create` inline right
/// after a commit.
pub trait NotificationSink: Send + Sync + fmt::Debug {
    fn create(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Sink that only writes a log line. Used when nothing else is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn create(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            "{}",
            notification.title
        );
        Ok(())
    }
}

/// Sink that forwards notifications to an unbounded channel, leaving the
/// actual delivery to whoever drains the receiver.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn create(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sender
            .send(notification)
            .map_err(|_| NotifyError("notification channel closed".to_string()))
    }
}

/// A notification as stored in a user's inbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: Uuid,
    pub notification: Notification,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub reference_kind: Option<String>,
    pub reference_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Notification> for ActiveModel {
    fn from(value: &Notification) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(value.user_id),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            title: ActiveValue::Set(value.title.clone()),
            body: ActiveValue::Set(value.body.clone()),
            reference_kind: ActiveValue::Set(
                value.reference.map(|r| r.kind.as_str().to_string()),
            ),
            reference_id: ActiveValue::Set(value.reference.map(|r| r.id)),
            read: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl TryFrom<Model> for StoredNotification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            notification: Notification {
                user_id: model.user_id,
                kind: NotificationKind::try_from(model.kind.as_str())?,
                title: model.title,
                body: model.body,
                reference: Reference::from_parts(
                    model.reference_kind.as_deref(),
                    model.reference_id,
                )?,
            },
            read: model.read,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_until_receiver_is_dropped() {
        let (sink, mut receiver) = ChannelSink::new();
        let user_id = Uuid::new_v4();
        sink.create(Notification::new(
            user_id,
            NotificationKind::LevelUp,
            "Level up!",
            "You reached level 2",
        ))
        .unwrap();

        let received = receiver.try_recv().unwrap();
        assert_eq!(received.user_id, user_id);
        assert_eq!(received.kind, NotificationKind::LevelUp);

        drop(receiver);
        let err = sink
            .create(Notification::new(
                user_id,
                NotificationKind::LevelUp,
                "Level up!",
                "again",
            ))
            .unwrap_err();
        assert_eq!(err, NotifyError("notification channel closed".to_string()));
    }
}
