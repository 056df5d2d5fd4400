use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AssignmentStatus, EngineError, EntryKind, NewTaskCmd, Notification, NotificationKind,
    Reference, ResultEngine, Role, Task, TaskAssignment, TaskStatus, assignments, tasks,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{
    Engine,
    access::{ensure_child_in, ensure_owner, ensure_parent_of},
    ledger::post_entry,
    with_tx,
};

async fn load_assignment(
    db: &DatabaseTransaction,
    assignment_id: Uuid,
) -> ResultEngine<(TaskAssignment, Task)> {
    let (assignment, task) = assignments::Entity::find_by_id(assignment_id)
        .find_also_related(tasks::Entity)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("assignment".to_string()))?;
    let task = task.ok_or_else(|| EngineError::NotFound("task".to_string()))?;
    Ok((TaskAssignment::try_from(assignment)?, Task::try_from(task)?))
}

async fn save_assignment(db: &DatabaseTransaction, assignment: &TaskAssignment) -> ResultEngine<()> {
    assignments::ActiveModel::from(assignment).update(db).await?;
    Ok(())
}

impl Engine {
    /// Create a task template and one pending assignment per listed child.
    ///
    /// Authorization: the caller must be a parent and every child must
    /// belong to the same family.
    pub async fn create_task(
        &self,
        cmd: NewTaskCmd,
    ) -> ResultEngine<(Task, Vec<TaskAssignment>)> {
        let title = normalize_required_text(&cmd.title, "title")?;
        let description = normalize_optional_text(cmd.description.as_deref());
        let now = Utc::now();
        let mut outbox = Vec::new();

        let created = with_tx!(self, |db_tx| {
            let parent = self.require_parent(&db_tx, cmd.parent_id).await?;
            let task = Task::new(
                parent.family_id,
                parent.id,
                title,
                description,
                cmd.coin_value,
                cmd.xp_value,
                cmd.category,
                cmd.recurrence,
            )?;

            let mut seen = HashSet::new();
            let mut children = Vec::new();
            for child_id in cmd.child_ids {
                if !seen.insert(child_id) {
                    continue;
                }
                let child = self.require_user(&db_tx, child_id).await?;
                ensure_child_in(&child, parent.family_id)?;
                children.push(child);
            }

            tasks::ActiveModel::from(&task).insert(&db_tx).await?;
            let mut created = Vec::with_capacity(children.len());
            for child in children {
                let assignment = TaskAssignment::new(task.id, child.id, now);
                assignments::ActiveModel::from(&assignment)
                    .insert(&db_tx)
                    .await?;
                outbox.push(
                    Notification::new(
                        child.id,
                        NotificationKind::TaskAssigned,
                        "New task",
                        format!("{} ({} coins)", task.title, task.coin_value),
                    )
                    .reference(Reference::assignment(assignment.id)),
                );
                created.push(assignment);
            }

            tracing::info!(
                task_id = %task.id,
                family_id = %task.family_id,
                assignments = created.len(),
                "task created"
            );
            Ok((task, created))
        })?;

        self.dispatch(outbox);
        Ok(created)
    }

    /// Archive a task. Archived tasks are skipped by the scheduler.
    pub async fn archive_task(&self, task_id: Uuid, parent_id: Uuid) -> ResultEngine<Task> {
        with_tx!(self, |db_tx| {
            let model = tasks::Entity::find_by_id(task_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("task".to_string()))?;
            let mut task = Task::try_from(model)?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, task.family_id)?;

            if task.status == TaskStatus::Archived {
                return Err(EngineError::InvalidState(
                    "task is already archived".to_string(),
                ));
            }
            task.status = TaskStatus::Archived;
            tasks::ActiveModel::from(&task).update(&db_tx).await?;
            tracing::info!(%task_id, "task archived");
            Ok(task)
        })
    }

    /// Assignments visible to `user_id`, newest first.
    ///
    /// Parents see every assignment of their family; children see their own.
    pub async fn assignments(
        &self,
        user_id: Uuid,
        status: Option<AssignmentStatus>,
    ) -> ResultEngine<Vec<TaskAssignment>> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut query = assignments::Entity::find();
            query = match user.role {
                Role::Parent => query
                    .inner_join(tasks::Entity)
                    .filter(tasks::Column::FamilyId.eq(user.family_id)),
                Role::Child => query.filter(assignments::Column::ChildId.eq(user.id)),
            };
            if let Some(status) = status {
                query = query.filter(assignments::Column::Status.eq(status.as_str()));
            }
            query
                .order_by_desc(assignments::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(TaskAssignment::try_from)
                .collect()
        })
    }

    /// The assigned child marks the work as done.
    pub async fn complete(
        &self,
        assignment_id: Uuid,
        child_id: Uuid,
    ) -> ResultEngine<TaskAssignment> {
        let mut outbox = Vec::new();
        let assignment = with_tx!(self, |db_tx| {
            let child = self.require_user(&db_tx, child_id).await?;
            let (mut assignment, task) = load_assignment(&db_tx, assignment_id).await?;
            ensure_owner(&child, assignment.child_id)?;

            assignment.complete(Utc::now())?;
            save_assignment(&db_tx, &assignment).await?;

            for parent in self
                .family_users(&db_tx, task.family_id, Some(Role::Parent))
                .await?
            {
                outbox.push(
                    Notification::new(
                        parent.id,
                        NotificationKind::TaskCompleted,
                        "Task completed",
                        format!("{} finished: {}", child.display_name, task.title),
                    )
                    .reference(Reference::assignment(assignment.id)),
                );
            }
            Ok(assignment)
        })?;
        self.dispatch(outbox);
        Ok(assignment)
    }

    /// Approve a completed assignment: pays the coins, grants the XP and
    /// evaluates badges, all in one transaction.
    pub async fn approve(
        &self,
        assignment_id: Uuid,
        parent_id: Uuid,
    ) -> ResultEngine<TaskAssignment> {
        let child_id = self.assignment_child(assignment_id).await?;
        let guard = self.locks.acquire(child_id).await?;
        let now = Utc::now();
        let mut outbox = Vec::new();

        let assignment = with_tx!(self, |db_tx| {
            let (mut assignment, task) = load_assignment(&db_tx, assignment_id).await?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, task.family_id)?;

            assignment.approve(parent.id, now)?;
            save_assignment(&db_tx, &assignment).await?;

            post_entry(
                &db_tx,
                &guard,
                EntryKind::Credit,
                task.coin_value,
                &format!("Task approved: {}", task.title),
                Some(Reference::assignment(assignment.id)),
                now,
            )
            .await?;
            self.apply_xp(
                &db_tx,
                assignment.child_id,
                task.xp_value,
                &format!("Task approved: {}", task.title),
                now,
                &mut outbox,
            )
            .await?;

            outbox.insert(
                0,
                Notification::new(
                    assignment.child_id,
                    NotificationKind::TaskApproved,
                    "Task approved!",
                    format!(
                        "{}: +{} coins, +{} XP",
                        task.title, task.coin_value, task.xp_value
                    ),
                )
                .reference(Reference::assignment(assignment.id)),
            );
            tracing::info!(%assignment_id, %child_id, coins = task.coin_value, "assignment approved");
            Ok(assignment)
        })?;

        self.dispatch(outbox);
        Ok(assignment)
    }

    /// Send a completed assignment back with a reason. No coins, no XP.
    pub async fn reject(
        &self,
        assignment_id: Uuid,
        parent_id: Uuid,
        reason: &str,
    ) -> ResultEngine<TaskAssignment> {
        let reason = normalize_required_text(reason, "rejection reason")?;
        let mut outbox = Vec::new();
        let assignment = with_tx!(self, |db_tx| {
            let (mut assignment, task) = load_assignment(&db_tx, assignment_id).await?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, task.family_id)?;

            assignment.reject(parent.id, reason, Utc::now())?;
            save_assignment(&db_tx, &assignment).await?;

            outbox.push(
                Notification::new(
                    assignment.child_id,
                    NotificationKind::TaskRejected,
                    "Task needs another look",
                    format!(
                        "{}: {}",
                        task.title,
                        assignment.rejection_reason.as_deref().unwrap_or_default()
                    ),
                )
                .reference(Reference::assignment(assignment.id)),
            );
            Ok(assignment)
        })?;
        self.dispatch(outbox);
        Ok(assignment)
    }

    /// Put a rejected assignment back to pending so the child can try again.
    pub async fn retry(
        &self,
        assignment_id: Uuid,
        child_id: Uuid,
    ) -> ResultEngine<TaskAssignment> {
        with_tx!(self, |db_tx| {
            let child = self.require_user(&db_tx, child_id).await?;
            let (mut assignment, _task) = load_assignment(&db_tx, assignment_id).await?;
            ensure_owner(&child, assignment.child_id)?;

            assignment.retry()?;
            save_assignment(&db_tx, &assignment).await?;
            Ok(assignment)
        })
    }

    /// Remove a pending or rejected assignment.
    pub async fn delete(&self, assignment_id: Uuid, parent_id: Uuid) -> ResultEngine<()> {
        let mut outbox = Vec::new();
        with_tx!(self, |db_tx| {
            let (assignment, task) = load_assignment(&db_tx, assignment_id).await?;
            let parent = self.require_user(&db_tx, parent_id).await?;
            ensure_parent_of(&parent, task.family_id)?;
            assignment.ensure_deletable()?;

            assignments::Entity::delete_by_id(assignment.id)
                .exec(&db_tx)
                .await?;
            outbox.push(Notification::new(
                assignment.child_id,
                NotificationKind::TaskRemoved,
                "Task removed",
                task.title.clone(),
            ));
            tracing::info!(%assignment_id, "assignment deleted");
            Ok(())
        })?;
        self.dispatch(outbox);
        Ok(())
    }

    /// Owner of an assignment, read before taking the child's wallet lock.
    async fn assignment_child(&self, assignment_id: Uuid) -> ResultEngine<Uuid> {
        assignments::Entity::find_by_id(assignment_id)
            .one(&self.database)
            .await?
            .map(|model| model.child_id)
            .ok_or_else(|| EngineError::NotFound("assignment".to_string()))
    }
}
