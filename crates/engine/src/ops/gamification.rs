use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AssignmentStatus, Badge, EngineError, Notification, NotificationKind, Progress, ResultEngine,
    UnlockedBadge, UserXp, assignments, badges, user_badges, user_xp,
    util::normalize_required_text, wallets,
};

use super::{Engine, with_tx};

/// XP, level and badges of one child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GamificationSummary {
    pub xp: UserXp,
    /// `None` once the top level is reached.
    pub xp_to_next_level: Option<i64>,
    pub badges: Vec<UnlockedBadge>,
}

/// Consecutive days with at least one approval, counting back from `today`
/// or, when today has none yet, from the day before.
pub(super) fn streak_days(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> i64 {
    let mut day = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

impl Engine {
    /// Grant XP outside of a task approval.
    pub async fn add_xp(&self, child_id: Uuid, amount: i64, reason: &str) -> ResultEngine<UserXp> {
        let reason = normalize_required_text(reason, "reason")?;
        let _guard = self.locks.acquire(child_id).await?;
        let mut outbox = Vec::new();
        let xp = with_tx!(self, |db_tx| {
            self.require_child(&db_tx, child_id).await?;
            self.apply_xp(&db_tx, child_id, amount, &reason, Utc::now(), &mut outbox)
                .await
        })?;
        self.dispatch(outbox);
        Ok(xp)
    }

    /// Add XP, recompute the level and unlock every badge the child now
    /// qualifies for. Runs inside the caller's transaction; notifications
    /// are queued on `outbox` for after the commit.
    pub(super) async fn apply_xp(
        &self,
        db: &DatabaseTransaction,
        child_id: Uuid,
        amount: i64,
        reason: &str,
        now: DateTime<Utc>,
        outbox: &mut Vec<Notification>,
    ) -> ResultEngine<UserXp> {
        let model = user_xp::Entity::find_by_id(child_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("xp record".to_string()))?;
        let mut xp = UserXp::from(model);
        let gained = xp.add(amount, now)?;
        user_xp::ActiveModel::from(&xp).update(db).await?;

        tracing::info!(
            %child_id,
            amount,
            level = xp.current_level,
            total_xp = xp.total_xp,
            "xp granted: {reason}"
        );
        if gained > 0 {
            outbox.push(Notification::new(
                child_id,
                NotificationKind::LevelUp,
                "Level up!",
                format!("You reached level {}", xp.current_level),
            ));
        }

        for badge in self.unlock_badges(db, child_id, &xp, now).await? {
            outbox.push(Notification::new(
                child_id,
                NotificationKind::BadgeUnlocked,
                "Badge unlocked!",
                format!("You earned the {} badge", badge.name),
            ));
        }
        Ok(xp)
    }

    async fn progress(
        &self,
        db: &DatabaseTransaction,
        child_id: Uuid,
        xp: &UserXp,
        today: NaiveDate,
    ) -> ResultEngine<Progress> {
        let approved = assignments::Entity::find()
            .filter(assignments::Column::ChildId.eq(child_id))
            .filter(assignments::Column::Status.eq(AssignmentStatus::Approved.as_str()))
            .all(db)
            .await?;
        let days: BTreeSet<NaiveDate> = approved
            .iter()
            .filter_map(|a| a.approved_at)
            .map(|at| at.date_naive())
            .collect();
        let coins_earned = wallets::Entity::find_by_id(child_id)
            .one(db)
            .await?
            .map_or(0, |w| w.total_earned);

        Ok(Progress {
            tasks_approved: i64::try_from(approved.len()).unwrap_or(i64::MAX),
            level: xp.current_level,
            total_xp: xp.total_xp,
            streak_days: streak_days(&days, today),
            coins_earned,
        })
    }

    /// Insert a `user_badges` row for each newly satisfied badge. The insert
    /// ignores conflicts on (user, badge); only rows actually written are
    /// returned as unlocks.
    async fn unlock_badges(
        &self,
        db: &DatabaseTransaction,
        child_id: Uuid,
        xp: &UserXp,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Badge>> {
        let progress = self.progress(db, child_id, xp, now.date_naive()).await?;
        let owned: HashSet<Uuid> = user_badges::Entity::find()
            .filter(user_badges::Column::UserId.eq(child_id))
            .all(db)
            .await?
            .into_iter()
            .map(|row| row.badge_id)
            .collect();

        let mut unlocked = Vec::new();
        for model in badges::Entity::find().all(db).await? {
            if owned.contains(&model.id) {
                continue;
            }
            let badge = Badge::try_from(model)?;
            if !badge.condition.is_satisfied_by(&progress) {
                continue;
            }
            let row = user_badges::ActiveModel {
                user_id: ActiveValue::Set(child_id),
                badge_id: ActiveValue::Set(badge.id),
                unlocked_at: ActiveValue::Set(now),
            };
            let inserted = user_badges::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([user_badges::Column::UserId, user_badges::Column::BadgeId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
            if inserted > 0 {
                tracing::info!(%child_id, badge = %badge.name, "badge unlocked");
                unlocked.push(badge);
            }
        }
        Ok(unlocked)
    }

    /// Level, XP and unlocked badges of a child.
    ///
    /// Authorization: the child itself or a parent of its family.
    pub async fn gamification(
        &self,
        child_id: Uuid,
        viewer_id: Uuid,
    ) -> ResultEngine<GamificationSummary> {
        with_tx!(self, |db_tx| {
            self.require_viewer_of_child(&db_tx, child_id, viewer_id)
                .await?;
            let xp = user_xp::Entity::find_by_id(child_id)
                .one(&db_tx)
                .await?
                .map(UserXp::from)
                .ok_or_else(|| EngineError::NotFound("xp record".to_string()))?;

            let rows = user_badges::Entity::find()
                .filter(user_badges::Column::UserId.eq(child_id))
                .order_by_asc(user_badges::Column::UnlockedAt)
                .find_also_related(badges::Entity)
                .all(&db_tx)
                .await?;
            let mut unlocked = Vec::with_capacity(rows.len());
            for (row, badge) in rows {
                let badge = badge.ok_or_else(|| EngineError::NotFound("badge".to_string()))?;
                unlocked.push(UnlockedBadge {
                    badge: Badge::try_from(badge)?,
                    unlocked_at: row.unlocked_at,
                });
            }

            Ok(GamificationSummary {
                xp_to_next_level: xp.xp_to_next_level(),
                xp,
                badges: unlocked,
            })
        })
    }

    /// The badge catalog.
    pub async fn badges(&self) -> ResultEngine<Vec<Badge>> {
        with_tx!(self, |db_tx| {
            badges::Entity::find()
                .order_by_asc(badges::Column::ConditionKind)
                .order_by_asc(badges::Column::ConditionThreshold)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Badge::try_from)
                .collect()
        })
    }
}
