use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, Notification, ResultEngine, StoredNotification, notifications};

use super::{Engine, with_tx};

impl Engine {
    /// Put a notification in the recipient's inbox.
    pub async fn store_notification(
        &self,
        notification: &Notification,
    ) -> ResultEngine<StoredNotification> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, notification.user_id).await?;
            let model = notifications::ActiveModel::from(notification)
                .insert(&db_tx)
                .await?;
            StoredNotification::try_from(model)
        })
    }

    /// Inbox of a user, newest first.
    pub async fn notifications(&self, user_id: Uuid) -> ResultEngine<Vec<StoredNotification>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            notifications::Entity::find()
                .filter(notifications::Column::UserId.eq(user_id))
                .order_by_desc(notifications::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(StoredNotification::try_from)
                .collect()
        })
    }

    pub async fn unread_notifications(&self, user_id: Uuid) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            Ok(notifications::Entity::find()
                .filter(notifications::Column::UserId.eq(user_id))
                .filter(notifications::Column::Read.eq(false))
                .count(&db_tx)
                .await?)
        })
    }

    /// Mark one notification as read. Someone else's notification is
    /// reported as missing.
    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<StoredNotification> {
        with_tx!(self, |db_tx| {
            let model = notifications::Entity::find_by_id(notification_id)
                .filter(notifications::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("notification".to_string()))?;
            let mut active: notifications::ActiveModel = model.into();
            active.read = ActiveValue::Set(true);
            let model = active.update(&db_tx).await?;
            StoredNotification::try_from(model)
        })
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_notifications_read(&self, user_id: Uuid) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let result = notifications::Entity::update_many()
                .col_expr(notifications::Column::Read, Expr::value(true))
                .filter(notifications::Column::UserId.eq(user_id))
                .filter(notifications::Column::Read.eq(false))
                .exec(&db_tx)
                .await?;
            Ok(result.rows_affected)
        })
    }
}
