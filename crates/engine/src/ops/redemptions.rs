use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, EntryKind, NewRewardCmd, Notification, NotificationKind, Redemption,
    RedemptionStatus, Reference, ResultEngine, Reward, Role, redemptions, rewards,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, access::ensure_parent_of, ledger::post_entry, with_tx};

async fn load_reward(db: &DatabaseTransaction, reward_id: Uuid) -> ResultEngine<Reward> {
    rewards::Entity::find_by_id(reward_id)
        .one(db)
        .await?
        .map(Reward::from)
        .ok_or_else(|| EngineError::NotFound("reward".to_string()))
}

async fn load_redemption(
    db: &DatabaseTransaction,
    redemption_id: Uuid,
) -> ResultEngine<(Redemption, Reward)> {
    let (redemption, reward) = redemptions::Entity::find_by_id(redemption_id)
        .find_also_related(rewards::Entity)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("redemption".to_string()))?;
    let reward = reward.ok_or_else(|| EngineError::NotFound("reward".to_string()))?;
    Ok((Redemption::try_from(redemption)?, Reward::from(reward)))
}

impl Engine {
    /// Add a reward to the parent's family catalog.
    pub async fn create_reward(&self, cmd: NewRewardCmd) -> ResultEngine<Reward> {
        let name = normalize_required_text(&cmd.name, "reward name")?;
        let description = normalize_optional_text(cmd.description.as_deref());
        with_tx!(self, |db_tx| {
            let parent = self.require_parent(&db_tx, cmd.parent_id).await?;
            let reward = Reward::new(parent.family_id, parent.id, name, description, cmd.coin_cost)?;
            rewards::ActiveModel::from(&reward).insert(&db_tx).await?;
            tracing::info!(reward_id = %reward.id, family_id = %reward.family_id, "reward created");
            Ok(reward)
        })
    }

    /// Show or hide a reward. Pending redemptions are not affected.
    pub async fn set_reward_active(
        &self,
        reward_id: Uuid,
        parent_id: Uuid,
        active: bool,
    ) -> ResultEngine<Reward> {
        with_tx!(self, |db_tx| {
            let mut reward = load_reward(&db_tx, reward_id).await?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, reward.family_id)?;

            reward.active = active;
            rewards::ActiveModel::from(&reward).update(&db_tx).await?;
            Ok(reward)
        })
    }

    /// Reward catalog of the user's family, cheapest first. Children only
    /// see active rewards.
    pub async fn rewards(&self, user_id: Uuid) -> ResultEngine<Vec<Reward>> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut query = rewards::Entity::find()
                .filter(rewards::Column::FamilyId.eq(user.family_id));
            if user.is_child() {
                query = query.filter(rewards::Column::Active.eq(true));
            }
            Ok(query
                .order_by_asc(rewards::Column::CoinCost)
                .order_by_asc(rewards::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Reward::from)
                .collect())
        })
    }

    /// A child asks for a reward. The cost is debited right away and frozen
    /// on the redemption.
    pub async fn request_redemption(
        &self,
        reward_id: Uuid,
        child_id: Uuid,
    ) -> ResultEngine<Redemption> {
        let guard = self.locks.acquire(child_id).await?;
        let mut outbox = Vec::new();
        let redemption = with_tx!(self, |db_tx| {
            let child = self.require_child(&db_tx, child_id).await?;
            let reward = load_reward(&db_tx, reward_id).await?;
            if reward.family_id != child.family_id {
                return Err(EngineError::Unauthorized(
                    "reward belongs to another family".to_string(),
                ));
            }
            if !reward.active {
                return Err(EngineError::InvalidState(
                    "reward is not active".to_string(),
                ));
            }

            let redemption = Redemption::new(reward.id, child.id, reward.coin_cost);
            post_entry(
                &db_tx,
                &guard,
                EntryKind::Debit,
                reward.coin_cost,
                &format!("Redeemed: {}", reward.name),
                Some(Reference::redemption(redemption.id)),
                redemption.created_at,
            )
            .await?;
            redemptions::ActiveModel::from(&redemption)
                .insert(&db_tx)
                .await?;

            for parent in self
                .family_users(&db_tx, child.family_id, Some(Role::Parent))
                .await?
            {
                outbox.push(
                    Notification::new(
                        parent.id,
                        NotificationKind::RedemptionRequested,
                        "Reward requested",
                        format!("{} wants {}", child.display_name, reward.name),
                    )
                    .reference(Reference::redemption(redemption.id)),
                );
            }
            tracing::info!(redemption_id = %redemption.id, %child_id, coins = reward.coin_cost, "redemption requested");
            Ok(redemption)
        })?;
        self.dispatch(outbox);
        Ok(redemption)
    }

    /// Grant a pending redemption. Coins were already taken at request time.
    pub async fn approve_redemption(
        &self,
        redemption_id: Uuid,
        parent_id: Uuid,
    ) -> ResultEngine<Redemption> {
        let child_id = self.redemption_child(redemption_id).await?;
        let _guard = self.locks.acquire(child_id).await?;
        let mut outbox = Vec::new();
        let redemption = with_tx!(self, |db_tx| {
            let (mut redemption, reward) = load_redemption(&db_tx, redemption_id).await?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, reward.family_id)?;

            redemption.approve(parent.id, Utc::now())?;
            redemptions::ActiveModel::from(&redemption)
                .update(&db_tx)
                .await?;

            outbox.push(
                Notification::new(
                    redemption.child_id,
                    NotificationKind::RedemptionApproved,
                    "Reward approved!",
                    format!("Enjoy your {}", reward.name),
                )
                .reference(Reference::redemption(redemption.id)),
            );
            Ok(redemption)
        })?;
        self.dispatch(outbox);
        Ok(redemption)
    }

    /// Refuse a pending redemption and give the frozen amount back.
    pub async fn reject_redemption(
        &self,
        redemption_id: Uuid,
        parent_id: Uuid,
        reason: &str,
    ) -> ResultEngine<Redemption> {
        let reason = normalize_required_text(reason, "rejection reason")?;
        let child_id = self.redemption_child(redemption_id).await?;
        let guard = self.locks.acquire(child_id).await?;
        let now = Utc::now();
        let mut outbox = Vec::new();
        let redemption = with_tx!(self, |db_tx| {
            let (mut redemption, reward) = load_redemption(&db_tx, redemption_id).await?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, reward.family_id)?;

            redemption.reject(parent.id, reason, now)?;
            redemptions::ActiveModel::from(&redemption)
                .update(&db_tx)
                .await?;
            post_entry(
                &db_tx,
                &guard,
                EntryKind::Credit,
                redemption.coin_amount,
                &format!("Refund: {}", reward.name),
                Some(Reference::redemption(redemption.id)),
                now,
            )
            .await?;

            outbox.push(
                Notification::new(
                    redemption.child_id,
                    NotificationKind::RedemptionRejected,
                    "Reward not approved",
                    format!(
                        "{}: {}. {} coins are back in your wallet",
                        reward.name,
                        redemption.rejection_reason.as_deref().unwrap_or_default(),
                        redemption.coin_amount
                    ),
                )
                .reference(Reference::redemption(redemption.id)),
            );
            tracing::info!(%redemption_id, %child_id, coins = redemption.coin_amount, "redemption refunded");
            Ok(redemption)
        })?;
        self.dispatch(outbox);
        Ok(redemption)
    }

    /// Redemptions visible to `user_id`, newest first.
    ///
    /// Parents see the whole family; children see their own.
    pub async fn redemptions(
        &self,
        user_id: Uuid,
        status: Option<RedemptionStatus>,
    ) -> ResultEngine<Vec<Redemption>> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut query = redemptions::Entity::find();
            query = match user.role {
                Role::Parent => query
                    .inner_join(rewards::Entity)
                    .filter(rewards::Column::FamilyId.eq(user.family_id)),
                Role::Child => query.filter(redemptions::Column::ChildId.eq(user.id)),
            };
            if let Some(status) = status {
                query = query.filter(redemptions::Column::Status.eq(status.as_str()));
            }
            query
                .order_by_desc(redemptions::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Redemption::try_from)
                .collect()
        })
    }

    async fn redemption_child(&self, redemption_id: Uuid) -> ResultEngine<Uuid> {
        redemptions::Entity::find_by_id(redemption_id)
            .one(&self.database)
            .await?
            .map(|model| model.child_id)
            .ok_or_else(|| EngineError::NotFound("redemption".to_string()))
    }
}
