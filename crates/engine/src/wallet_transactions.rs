//! Ledger entries.
//!
//! Every change to a wallet balance is recorded as one immutable
//! [`LedgerEntry`]. Entries are never updated or deleted; a refund is a new
//! credit, not the removal of the original debit.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(EngineError::Validation(format!(
                "invalid ledger entry kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Assignment,
    Redemption,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Redemption => "redemption",
        }
    }
}

impl TryFrom<&str> for ReferenceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "assignment" => Ok(Self::Assignment),
            "redemption" => Ok(Self::Redemption),
            other => Err(EngineError::Validation(format!(
                "invalid reference kind: {other}"
            ))),
        }
    }
}

/// Pointer to the entity a ledger entry or notification originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: Uuid,
}

impl Reference {
    pub fn assignment(id: Uuid) -> Self {
        Self {
            kind: ReferenceKind::Assignment,
            id,
        }
    }

    pub fn redemption(id: Uuid) -> Self {
        Self {
            kind: ReferenceKind::Redemption,
            id,
        }
    }

    pub(crate) fn from_parts(
        kind: Option<&str>,
        id: Option<Uuid>,
    ) -> Result<Option<Self>, EngineError> {
        match (kind, id) {
            (Some(kind), Some(id)) => Ok(Some(Self {
                kind: ReferenceKind::try_from(kind)?,
                id,
            })),
            _ => Ok(None),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub child_id: Uuid,
    pub kind: EntryKind,
    pub amount: i64,
    pub balance_after: i64,
    pub reason: String,
    pub reference: Option<Reference>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub child_id: Uuid,
    pub kind: String,
    pub amount: i64,
    pub balance_after: i64,
    pub reason: String,
    pub reference_kind: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::ChildId",
        to = "super::wallets::Column::ChildId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id),
            child_id: ActiveValue::Set(entry.child_id),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            amount: ActiveValue::Set(entry.amount),
            balance_after: ActiveValue::Set(entry.balance_after),
            reason: ActiveValue::Set(entry.reason.clone()),
            reference_kind: ActiveValue::Set(
                entry.reference.map(|r| r.kind.as_str().to_string()),
            ),
            reference_id: ActiveValue::Set(entry.reference.map(|r| r.id)),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            child_id: model.child_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            amount: model.amount,
            balance_after: model.balance_after,
            reason: model.reason,
            reference: Reference::from_parts(model.reference_kind.as_deref(), model.reference_id)?,
            created_at: model.created_at,
        })
    }
}
