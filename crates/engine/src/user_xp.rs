//! Experience points and levels.
//!
//! Levels go from 1 to [`MAX_LEVEL`]. Leaving level `L` costs
//! `LEVEL_THRESHOLDS[L - 1]` XP; the surplus is carried into the next level.
//! At the top level XP keeps accumulating in `current_xp`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

pub const MAX_LEVEL: i32 = 10;

/// XP needed to leave levels 1 through 9.
pub const LEVEL_THRESHOLDS: [i64; 9] = [100, 200, 350, 500, 750, 1000, 1500, 2000, 3000];

/// XP needed to leave `level`, `None` at the top level.
pub fn threshold_for(level: i32) -> Option<i64> {
    if !(1..MAX_LEVEL).contains(&level) {
        return None;
    }
    usize::try_from(level - 1)
        .ok()
        .and_then(|idx| LEVEL_THRESHOLDS.get(idx).copied())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserXp {
    pub user_id: Uuid,
    pub current_level: i32,
    pub current_xp: i64,
    pub total_xp: i64,
    pub last_level_up_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UserXp {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            current_level: 1,
            current_xp: 0,
            total_xp: 0,
            last_level_up_at: None,
            updated_at: Utc::now(),
        }
    }

    /// XP still missing to reach the next level.
    pub fn xp_to_next_level(&self) -> Option<i64> {
        threshold_for(self.current_level).map(|t| (t - self.current_xp).max(0))
    }

    /// Add XP and recompute the level. Returns the number of levels gained.
    pub fn add(&mut self, amount: i64, now: DateTime<Utc>) -> ResultEngine<i32> {
        if amount <= 0 {
            return Err(EngineError::Validation("xp amount must be > 0".to_string()));
        }
        let overflow = || EngineError::Validation("xp amount overflows totals".to_string());
        let total_xp = self.total_xp.checked_add(amount).ok_or_else(overflow)?;
        let mut current_xp = self.current_xp.checked_add(amount).ok_or_else(overflow)?;

        let start_level = self.current_level;
        let mut level = start_level;
        while let Some(threshold) = threshold_for(level) {
            if current_xp < threshold {
                break;
            }
            current_xp -= threshold;
            level += 1;
        }

        self.total_xp = total_xp;
        self.current_xp = current_xp;
        self.current_level = level;
        self.updated_at = now;
        if level != start_level {
            self.last_level_up_at = Some(now);
        }
        Ok(level - start_level)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_xp")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub current_level: i32,
    pub current_xp: i64,
    pub total_xp: i64,
    pub last_level_up_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&UserXp> for ActiveModel {
    fn from(value: &UserXp) -> Self {
        Self {
            user_id: ActiveValue::Set(value.user_id),
            current_level: ActiveValue::Set(value.current_level),
            current_xp: ActiveValue::Set(value.current_xp),
            total_xp: ActiveValue::Set(value.total_xp),
            last_level_up_at: ActiveValue::Set(value.last_level_up_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl From<Model> for UserXp {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            current_level: model.current_level,
            current_xp: model.current_xp,
            total_xp: model.total_xp,
            last_level_up_at: model.last_level_up_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xp() -> UserXp {
        UserXp::new(Uuid::new_v4())
    }

    #[test]
    fn below_threshold_stays_on_level() {
        let mut xp = xp();
        assert_eq!(xp.add(99, Utc::now()).unwrap(), 0);
        assert_eq!(xp.current_level, 1);
        assert_eq!(xp.current_xp, 99);
        assert!(xp.last_level_up_at.is_none());
        assert_eq!(xp.xp_to_next_level(), Some(1));
    }

    #[test]
    fn reaching_the_threshold_exactly_levels_up() {
        let mut xp = xp();
        assert_eq!(xp.add(100, Utc::now()).unwrap(), 1);
        assert_eq!(xp.current_level, 2);
        assert_eq!(xp.current_xp, 0);
        assert_eq!(xp.xp_to_next_level(), Some(200));
    }

    #[test]
    fn remainder_carries_over() {
        let mut xp = xp();
        assert_eq!(xp.add(130, Utc::now()).unwrap(), 1);
        assert_eq!(xp.current_level, 2);
        assert_eq!(xp.current_xp, 30);
        assert_eq!(xp.total_xp, 130);
        assert!(xp.last_level_up_at.is_some());
    }

    #[test]
    fn one_big_grant_can_skip_several_levels() {
        let mut xp = xp();
        // 100 + 200 + 350 = 650 -> level 4 with 10 left over.
        assert_eq!(xp.add(660, Utc::now()).unwrap(), 3);
        assert_eq!(xp.current_level, 4);
        assert_eq!(xp.current_xp, 10);
    }

    #[test]
    fn level_is_capped() {
        let mut xp = xp();
        let all: i64 = LEVEL_THRESHOLDS.iter().sum();
        xp.add(all + 5000, Utc::now()).unwrap();
        assert_eq!(xp.current_level, MAX_LEVEL);
        assert_eq!(xp.current_xp, 5000);
        assert_eq!(xp.xp_to_next_level(), None);
        assert_eq!(xp.total_xp, all + 5000);
    }

    #[test]
    fn thresholds_grow() {
        assert!(LEVEL_THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(threshold_for(0), None);
        assert_eq!(threshold_for(1), Some(100));
        assert_eq!(threshold_for(MAX_LEVEL), None);
    }
}
