//! Users of a family.
//!
//! A user is either a parent, who manages tasks and rewards, or a child, who
//! owns a wallet and an XP record.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Parent,
    Child,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "parent" => Ok(Self::Parent),
            "child" => Ok(Self::Child),
            other => Err(EngineError::Validation(format!("invalid role: {other}"))),
        }
    }
}

/// A fully loaded user: role and family are always present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub family_id: Uuid,
    pub role: Role,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(family_id: Uuid, role: Role, display_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            family_id,
            role,
            display_name,
            created_at: Utc::now(),
        }
    }

    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }

    pub fn is_child(&self) -> bool {
        self.role == Role::Child
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub role: String,
    pub display_name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::families::Entity",
        from = "Column::FamilyId",
        to = "super::families::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Families,
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Families.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(value: &User) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            family_id: ActiveValue::Set(value.family_id),
            role: ActiveValue::Set(value.role.as_str().to_string()),
            display_name: ActiveValue::Set(value.display_name.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            family_id: model.family_id,
            role: Role::try_from(model.role.as_str())?,
            display_name: model.display_name,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_storage_string() {
        assert_eq!(Role::try_from("parent").unwrap(), Role::Parent);
        assert_eq!(Role::try_from(Role::Child.as_str()).unwrap(), Role::Child);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(
            Role::try_from("admin").unwrap_err(),
            EngineError::Validation("invalid role: admin".to_string())
        );
    }
}
