use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Family, ResultEngine, Role, User, UserXp, Wallet, families, user_xp, users,
    util::normalize_required_text, wallets,
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a new household.
    pub async fn create_family(&self, name: &str) -> ResultEngine<Family> {
        let name = normalize_required_text(name, "family name")?;
        with_tx!(self, |db_tx| {
            let family = Family::new(name);
            families::ActiveModel::from(&family).insert(&db_tx).await?;
            tracing::info!(family_id = %family.id, "family created");
            Ok(family)
        })
    }

    /// Add a parent to an existing family.
    pub async fn create_parent(&self, family_id: Uuid, display_name: &str) -> ResultEngine<User> {
        let display_name = normalize_required_text(display_name, "display name")?;
        with_tx!(self, |db_tx| {
            families::Entity::find_by_id(family_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("family".to_string()))?;

            let parent = User::new(family_id, Role::Parent, display_name);
            users::ActiveModel::from(&parent).insert(&db_tx).await?;
            tracing::info!(%family_id, user_id = %parent.id, "parent created");
            Ok(parent)
        })
    }

    /// Add a child to the parent's family.
    ///
    /// The child's wallet and XP record are created in the same transaction,
    /// so every child always has both.
    pub async fn create_child(&self, parent_id: Uuid, display_name: &str) -> ResultEngine<User> {
        let display_name = normalize_required_text(display_name, "display name")?;
        with_tx!(self, |db_tx| {
            let parent = self.require_parent(&db_tx, parent_id).await?;

            let child = User::new(parent.family_id, Role::Child, display_name);
            users::ActiveModel::from(&child).insert(&db_tx).await?;
            wallets::ActiveModel::from(&Wallet::new(child.id))
                .insert(&db_tx)
                .await?;
            user_xp::ActiveModel::from(&UserXp::new(child.id))
                .insert(&db_tx)
                .await?;

            tracing::info!(family_id = %child.family_id, user_id = %child.id, "child created");
            Ok(child)
        })
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |db_tx| self.require_user(&db_tx, user_id).await)
    }

    /// Members of a family, oldest first, optionally restricted to one role.
    pub async fn family_members(
        &self,
        family_id: Uuid,
        role: Option<Role>,
    ) -> ResultEngine<Vec<User>> {
        with_tx!(self, |db_tx| {
            families::Entity::find_by_id(family_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("family".to_string()))?;
            self.family_users(&db_tx, family_id, role).await
        })
    }
}
