//! Recurring task generation.
//!
//! Once per local day, every active recurring task that is due gets a fresh
//! pending assignment for each child that has been assigned it before. The
//! check "does (task, child) already have a pending or completed assignment
//! created today" makes repeated runs on the same day harmless.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AssignmentStatus, DayWindow, Notification, NotificationKind, Reference, ResultEngine, Task,
    TaskAssignment, TaskStatus, User, assignments, tasks, users,
};

use super::{Engine, with_tx};

/// Outcome of one scheduler run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecurringRun {
    /// Local calendar day the run was computed for.
    pub date: NaiveDate,
    /// Active recurring tasks due on `date`.
    pub tasks_considered: usize,
    pub assignments_created: usize,
}

impl Engine {
    /// Spawn today's assignments for every due recurring task.
    ///
    /// `now` carries the time zone the family lives in: "today" is the local
    /// calendar day of `now`. A task that fails is logged and skipped; the
    /// others still run.
    pub async fn run_recurring_tasks<Tz: TimeZone>(
        &self,
        now: DateTime<Tz>,
    ) -> ResultEngine<RecurringRun> {
        let window = DayWindow::containing(&now)?;
        let now = now.with_timezone(&Utc);
        let _running = self.scheduler_lock.lock().await;

        let candidates = tasks::Entity::find()
            .filter(tasks::Column::Status.eq(TaskStatus::Active.as_str()))
            .filter(tasks::Column::RecurrenceKind.is_not_null())
            .filter(
                Condition::any()
                    .add(tasks::Column::RecurrenceEndDate.is_null())
                    .add(tasks::Column::RecurrenceEndDate.gte(window.date)),
            )
            .order_by_asc(tasks::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut run = RecurringRun {
            date: window.date,
            tasks_considered: 0,
            assignments_created: 0,
        };
        for model in candidates {
            let task_id = model.id;
            let task = match Task::try_from(model) {
                Ok(task) => task,
                Err(err) => {
                    tracing::warn!(%task_id, "skipping unreadable task: {err}");
                    continue;
                }
            };
            let due = task
                .recurrence
                .as_ref()
                .is_some_and(|rule| rule.is_due_on(window.date));
            if !due {
                continue;
            }
            run.tasks_considered += 1;

            match self.spawn_occurrences(&task, &window, now).await {
                Ok(outbox) => {
                    run.assignments_created += outbox.len();
                    self.dispatch(outbox);
                }
                Err(err) => {
                    tracing::error!(%task_id, "recurring task not processed: {err}");
                }
            }
        }

        tracing::info!(
            date = %window.date,
            tasks = run.tasks_considered,
            created = run.assignments_created,
            "recurring tasks processed"
        );
        Ok(run)
    }

    /// Create today's assignments of one task. Returns one notification per
    /// assignment created.
    async fn spawn_occurrences(
        &self,
        task: &Task,
        window: &DayWindow,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Notification>> {
        with_tx!(self, |db_tx| {
            // Recipients are whoever has been assigned this task before.
            let recipients: BTreeSet<Uuid> = assignments::Entity::find()
                .filter(assignments::Column::TaskId.eq(task.id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|a| a.child_id)
                .collect();

            let mut outbox = Vec::new();
            for child_id in recipients {
                let child = match users::Entity::find_by_id(child_id).one(&db_tx).await? {
                    Some(model) => User::try_from(model)?,
                    None => {
                        tracing::warn!(task_id = %task.id, %child_id, "recipient no longer exists");
                        continue;
                    }
                };
                if !child.is_child() || child.family_id != task.family_id {
                    tracing::warn!(task_id = %task.id, %child_id, "recipient is not a child of the family");
                    continue;
                }

                let already = assignments::Entity::find()
                    .filter(assignments::Column::TaskId.eq(task.id))
                    .filter(assignments::Column::ChildId.eq(child_id))
                    .filter(assignments::Column::Status.is_in([
                        AssignmentStatus::Pending.as_str(),
                        AssignmentStatus::Completed.as_str(),
                    ]))
                    .filter(assignments::Column::CreatedAt.gte(window.start))
                    .filter(assignments::Column::CreatedAt.lt(window.end))
                    .count(&db_tx)
                    .await?;
                if already > 0 {
                    continue;
                }

                let assignment = TaskAssignment::new(task.id, child_id, now);
                assignments::ActiveModel::from(&assignment)
                    .insert(&db_tx)
                    .await?;
                outbox.push(
                    Notification::new(
                        child_id,
                        NotificationKind::TaskAssigned,
                        "New task for today",
                        format!("{} ({} coins)", task.title, task.coin_value),
                    )
                    .reference(Reference::assignment(assignment.id)),
                );
            }
            Ok(outbox)
        })
    }
}
