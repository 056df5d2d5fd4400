//! Reward redemptions.
//!
//! Coins leave the wallet when the child asks, not when the parent says yes.
//! The debited amount is frozen on the redemption so a later price change on
//! the reward never alters what a rejection gives back.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
}

impl RedemptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for RedemptionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid redemption status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: Uuid,
    pub reward_id: Uuid,
    pub child_id: Uuid,
    pub status: RedemptionStatus,
    pub coin_amount: i64,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
}

impl Redemption {
    pub fn new(reward_id: Uuid, child_id: Uuid, coin_amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reward_id,
            child_id,
            status: RedemptionStatus::Pending,
            coin_amount,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        }
    }

    fn ensure_pending(&self) -> ResultEngine<()> {
        if self.status != RedemptionStatus::Pending {
            return Err(EngineError::InvalidState(format!(
                "redemption is already {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn approve(&mut self, parent_id: Uuid, at: DateTime<Utc>) -> ResultEngine<()> {
        self.ensure_pending()?;
        self.status = RedemptionStatus::Approved;
        self.reviewed_at = Some(at);
        self.reviewed_by = Some(parent_id);
        Ok(())
    }

    pub fn reject(&mut self, parent_id: Uuid, reason: String, at: DateTime<Utc>) -> ResultEngine<()> {
        self.ensure_pending()?;
        self.status = RedemptionStatus::Rejected;
        self.reviewed_at = Some(at);
        self.reviewed_by = Some(parent_id);
        self.rejection_reason = Some(reason);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "redemptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reward_id: Uuid,
    pub child_id: Uuid,
    pub status: String,
    pub coin_amount: i64,
    pub created_at: DateTimeUtc,
    pub reviewed_at: Option<DateTimeUtc>,
    pub reviewed_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rewards::Entity",
        from = "Column::RewardId",
        to = "super::rewards::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Rewards,
}

impl Related<super::rewards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rewards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Redemption> for ActiveModel {
    fn from(value: &Redemption) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            reward_id: ActiveValue::Set(value.reward_id),
            child_id: ActiveValue::Set(value.child_id),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            coin_amount: ActiveValue::Set(value.coin_amount),
            created_at: ActiveValue::Set(value.created_at),
            reviewed_at: ActiveValue::Set(value.reviewed_at),
            reviewed_by: ActiveValue::Set(value.reviewed_by),
            rejection_reason: ActiveValue::Set(value.rejection_reason.clone()),
        }
    }
}

impl TryFrom<Model> for Redemption {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            reward_id: model.reward_id,
            child_id: model.child_id,
            status: RedemptionStatus::try_from(model.status.as_str())?,
            coin_amount: model.coin_amount,
            created_at: model.created_at,
            reviewed_at: model.reviewed_at,
            reviewed_by: model.reviewed_by,
            rejection_reason: model.rejection_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_cannot_be_reviewed_again() {
        let mut redemption = Redemption::new(Uuid::new_v4(), Uuid::new_v4(), 100);
        redemption.approve(Uuid::new_v4(), Utc::now()).unwrap();

        let err = redemption
            .reject(Uuid::new_v4(), "changed my mind".to_string(), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState("redemption is already approved".to_string())
        );
        assert_eq!(redemption.status, RedemptionStatus::Approved);
    }
}
