//! Command structs for engine operations.
//!
//! These types group parameters for write operations with many optional
//! fields, keeping call sites readable and avoiding long argument lists.

use uuid::Uuid;

use crate::{Recurrence, TaskCategory};

/// Create a task template and assign it to children.
#[derive(Clone, Debug)]
pub struct NewTaskCmd {
    pub parent_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub coin_value: i64,
    pub xp_value: i64,
    pub category: TaskCategory,
    pub recurrence: Option<Recurrence>,
    pub child_ids: Vec<Uuid>,
}

impl NewTaskCmd {
    #[must_use]
    pub fn new(parent_id: Uuid, title: impl Into<String>, coin_value: i64, xp_value: i64) -> Self {
        Self {
            parent_id,
            title: title.into(),
            description: None,
            coin_value,
            xp_value,
            category: TaskCategory::Other,
            recurrence: None,
            child_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: TaskCategory) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    #[must_use]
    pub fn assign_to(mut self, child_id: Uuid) -> Self {
        self.child_ids.push(child_id);
        self
    }
}

/// Add an item to the family reward catalog.
#[derive(Clone, Debug)]
pub struct NewRewardCmd {
    pub parent_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub coin_cost: i64,
}

impl NewRewardCmd {
    #[must_use]
    pub fn new(parent_id: Uuid, name: impl Into<String>, coin_cost: i64) -> Self {
        Self {
            parent_id,
            name: name.into(),
            description: None,
            coin_cost,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
