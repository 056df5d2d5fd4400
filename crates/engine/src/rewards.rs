//! Family reward catalog.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub coin_cost: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Reward {
    pub fn new(
        family_id: Uuid,
        created_by: Uuid,
        name: String,
        description: Option<String>,
        coin_cost: i64,
    ) -> ResultEngine<Self> {
        if coin_cost <= 0 {
            return Err(EngineError::Validation("coin_cost must be > 0".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            family_id,
            created_by,
            name,
            description,
            coin_cost,
            active: true,
            created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub coin_cost: i64,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::redemptions::Entity")]
    Redemptions,
}

impl Related<super::redemptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Reward> for ActiveModel {
    fn from(value: &Reward) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            family_id: ActiveValue::Set(value.family_id),
            created_by: ActiveValue::Set(value.created_by),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            coin_cost: ActiveValue::Set(value.coin_cost),
            active: ActiveValue::Set(value.active),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl From<Model> for Reward {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            family_id: model.family_id,
            created_by: model.created_by,
            name: model.name,
            description: model.description,
            coin_cost: model.coin_cost,
            active: model.active,
            created_at: model.created_at,
        }
    }
}
