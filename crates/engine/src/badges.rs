//! Badge catalog.
//!
//! Each badge carries a single unlock condition evaluated against a
//! [`Progress`] snapshot of the child. The catalog itself is seeded by the
//! migrations; the engine only reads it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// What a badge asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum BadgeCondition {
    TasksApproved(i64),
    Level(i64),
    TotalXp(i64),
    StreakDays(i64),
    CoinsEarned(i64),
}

impl BadgeCondition {
    pub fn kind_str(self) -> &'static str {
        match self {
            Self::TasksApproved(_) => "tasks_approved",
            Self::Level(_) => "level",
            Self::TotalXp(_) => "total_xp",
            Self::StreakDays(_) => "streak_days",
            Self::CoinsEarned(_) => "coins_earned",
        }
    }

    pub fn threshold(self) -> i64 {
        match self {
            Self::TasksApproved(n)
            | Self::Level(n)
            | Self::TotalXp(n)
            | Self::StreakDays(n)
            | Self::CoinsEarned(n) => n,
        }
    }

    pub fn from_parts(kind: &str, threshold: i64) -> Result<Self, EngineError> {
        match kind {
            "tasks_approved" => Ok(Self::TasksApproved(threshold)),
            "level" => Ok(Self::Level(threshold)),
            "total_xp" => Ok(Self::TotalXp(threshold)),
            "streak_days" => Ok(Self::StreakDays(threshold)),
            "coins_earned" => Ok(Self::CoinsEarned(threshold)),
            other => Err(EngineError::Validation(format!(
                "invalid badge condition: {other}"
            ))),
        }
    }

    pub fn is_satisfied_by(self, progress: &Progress) -> bool {
        match self {
            Self::TasksApproved(n) => progress.tasks_approved >= n,
            Self::Level(n) => i64::from(progress.level) >= n,
            Self::TotalXp(n) => progress.total_xp >= n,
            Self::StreakDays(n) => progress.streak_days >= n,
            Self::CoinsEarned(n) => progress.coins_earned >= n,
        }
    }
}

/// Aggregate state of a child, as seen by badge conditions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub tasks_approved: i64,
    pub level: i32,
    pub total_xp: i64,
    pub streak_days: i64,
    pub coins_earned: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub condition: BadgeCondition,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "badges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub condition_kind: String,
    pub condition_threshold: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_badges::Entity")]
    UserBadges,
}

impl Related<super::user_badges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserBadges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Badge {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            description: model.description,
            icon: model.icon,
            condition: BadgeCondition::from_parts(
                model.condition_kind.as_str(),
                model.condition_threshold,
            )?,
        })
    }
}
