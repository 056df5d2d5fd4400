//! Authorization guards.
//!
//! Guards are pure functions over fully loaded [`User`]s; the `require_*`
//! helpers load the principal first and then apply them. Everything here
//! runs before an operation mutates anything.

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Role, User, users};

use super::Engine;

pub(super) fn ensure_parent_of(user: &User, family_id: Uuid) -> ResultEngine<()> {
    if !user.is_parent() {
        return Err(EngineError::Unauthorized(
            "only a parent can do this".to_string(),
        ));
    }
    if user.family_id != family_id {
        return Err(EngineError::Unauthorized(
            "parent belongs to another family".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn ensure_child_in(user: &User, family_id: Uuid) -> ResultEngine<()> {
    if !user.is_child() {
        return Err(EngineError::Unauthorized(format!(
            "{} is not a child",
            user.id
        )));
    }
    if user.family_id != family_id {
        return Err(EngineError::Unauthorized(format!(
            "child {} belongs to another family",
            user.id
        )));
    }
    Ok(())
}

/// The acting child must be the one the record belongs to.
pub(super) fn ensure_owner(user: &User, owner_id: Uuid) -> ResultEngine<()> {
    if !user.is_child() || user.id != owner_id {
        return Err(EngineError::Unauthorized(
            "record belongs to another child".to_string(),
        ));
    }
    Ok(())
}

/// A child sees only its own data; parents see every child of their family.
pub(super) fn ensure_can_view(viewer: &User, child: &User) -> ResultEngine<()> {
    if viewer.id == child.id {
        return Ok(());
    }
    ensure_parent_of(viewer, child.family_id)
}

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("user".to_string()))?;
        User::try_from(model)
    }

    pub(super) async fn require_parent(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<User> {
        let user = self.require_user(db, user_id).await?;
        if !user.is_parent() {
            return Err(EngineError::Unauthorized(
                "only a parent can do this".to_string(),
            ));
        }
        Ok(user)
    }

    pub(super) async fn require_child(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<User> {
        let user = self.require_user(db, user_id).await?;
        if !user.is_child() {
            return Err(EngineError::Unauthorized(
                "only a child can do this".to_string(),
            ));
        }
        Ok(user)
    }

    /// Load `child_id` and check `viewer_id` may read its data.
    pub(super) async fn require_viewer_of_child(
        &self,
        db: &DatabaseTransaction,
        child_id: Uuid,
        viewer_id: Uuid,
    ) -> ResultEngine<User> {
        let child = self.require_child(db, child_id).await?;
        let viewer = self.require_user(db, viewer_id).await?;
        ensure_can_view(&viewer, &child)?;
        Ok(child)
    }

    pub(super) async fn family_users(
        &self,
        db: &DatabaseTransaction,
        family_id: Uuid,
        role: Option<Role>,
    ) -> ResultEngine<Vec<User>> {
        let mut query = users::Entity::find().filter(users::Column::FamilyId.eq(family_id));
        if let Some(role) = role {
            query = query.filter(users::Column::Role.eq(role.as_str()));
        }
        query
            .order_by_asc(users::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}
