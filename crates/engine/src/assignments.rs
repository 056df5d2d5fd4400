//! Task assignments: one occurrence of a task for one child.
//!
//! Lifecycle:
//!
//! ```text
//! pending --complete--> completed --approve--> approved
//!    ^                      |
//!    |                      +------reject----> rejected
//!    +----------------retry--------------------+
//! ```
//!
//! `approved` is final. Deletion is only possible from `pending` or
//! `rejected`, so an approved payout always keeps its provenance.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Approved,
    Rejected,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_deletable(self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }
}

impl TryFrom<&str> for AssignmentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid assignment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub child_id: Uuid,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Review timestamp: set on approval and on rejection.
    pub approved_at: Option<DateTime<Utc>>,
    /// Reviewing parent: set on approval and on rejection.
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
}

impl TaskAssignment {
    pub fn new(task_id: Uuid, child_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            child_id,
            status: AssignmentStatus::Pending,
            created_at,
            completed_at: None,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
        }
    }

    fn expect_status(&self, expected: AssignmentStatus, action: &str) -> ResultEngine<()> {
        if self.status != expected {
            return Err(EngineError::InvalidState(format!(
                "cannot {action} an assignment that is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> ResultEngine<()> {
        self.expect_status(AssignmentStatus::Pending, "complete")?;
        self.status = AssignmentStatus::Completed;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn approve(&mut self, parent_id: Uuid, at: DateTime<Utc>) -> ResultEngine<()> {
        self.expect_status(AssignmentStatus::Completed, "approve")?;
        self.status = AssignmentStatus::Approved;
        self.approved_at = Some(at);
        self.approved_by = Some(parent_id);
        Ok(())
    }

    pub fn reject(&mut self, parent_id: Uuid, reason: String, at: DateTime<Utc>) -> ResultEngine<()> {
        self.expect_status(AssignmentStatus::Completed, "reject")?;
        self.status = AssignmentStatus::Rejected;
        self.approved_at = Some(at);
        self.approved_by = Some(parent_id);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    pub fn retry(&mut self) -> ResultEngine<()> {
        self.expect_status(AssignmentStatus::Rejected, "retry")?;
        self.status = AssignmentStatus::Pending;
        self.completed_at = None;
        self.approved_at = None;
        self.approved_by = None;
        self.rejection_reason = None;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> ResultEngine<()> {
        if !self.status.is_deletable() {
            return Err(EngineError::InvalidState(format!(
                "cannot delete an assignment that is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "task_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub task_id: Uuid,
    pub child_id: Uuid,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub approved_at: Option<DateTimeUtc>,
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tasks::Entity",
        from = "Column::TaskId",
        to = "super::tasks::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Tasks,
}

impl Related<super::tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TaskAssignment> for ActiveModel {
    fn from(value: &TaskAssignment) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            task_id: ActiveValue::Set(value.task_id),
            child_id: ActiveValue::Set(value.child_id),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            created_at: ActiveValue::Set(value.created_at),
            completed_at: ActiveValue::Set(value.completed_at),
            approved_at: ActiveValue::Set(value.approved_at),
            approved_by: ActiveValue::Set(value.approved_by),
            rejection_reason: ActiveValue::Set(value.rejection_reason.clone()),
        }
    }
}

impl TryFrom<Model> for TaskAssignment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            task_id: model.task_id,
            child_id: model.child_id,
            status: AssignmentStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            completed_at: model.completed_at,
            approved_at: model.approved_at,
            approved_by: model.approved_by,
            rejection_reason: model.rejection_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> TaskAssignment {
        TaskAssignment::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn happy_path_to_approved() {
        let mut a = assignment();
        let parent = Uuid::new_v4();
        a.complete(Utc::now()).unwrap();
        a.approve(parent, Utc::now()).unwrap();
        assert_eq!(a.status, AssignmentStatus::Approved);
        assert_eq!(a.approved_by, Some(parent));
        assert!(a.ensure_deletable().is_err());
    }

    #[test]
    fn approve_requires_completed() {
        let mut a = assignment();
        let err = a.approve(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState("cannot approve an assignment that is pending".to_string())
        );
    }

    #[test]
    fn retry_clears_review_fields() {
        let mut a = assignment();
        a.complete(Utc::now()).unwrap();
        a.reject(Uuid::new_v4(), "still messy".to_string(), Utc::now())
            .unwrap();
        a.retry().unwrap();

        assert_eq!(a.status, AssignmentStatus::Pending);
        assert!(a.completed_at.is_none());
        assert!(a.approved_at.is_none());
        assert!(a.approved_by.is_none());
        assert!(a.rejection_reason.is_none());
    }

    #[test]
    fn only_rejected_can_retry() {
        let mut a = assignment();
        assert!(matches!(a.retry(), Err(EngineError::InvalidState(_))));
        a.complete(Utc::now()).unwrap();
        assert!(matches!(a.retry(), Err(EngineError::InvalidState(_))));
        assert!(matches!(a.complete(Utc::now()), Err(EngineError::InvalidState(_))));
    }

    #[test]
    fn completed_is_not_deletable() {
        let mut a = assignment();
        assert!(a.ensure_deletable().is_ok());
        a.complete(Utc::now()).unwrap();
        assert!(matches!(a.ensure_deletable(), Err(EngineError::InvalidState(_))));
    }
}
