//! Task templates.
//!
//! A [`Task`] is what a parent defines once ("tidy the bedroom", 50 coins,
//! 20 XP). Children never act on a task directly: they act on
//! [`TaskAssignment`](crate::TaskAssignment)s, one per child and occurrence.
//!
//! A task may carry a [`Recurrence`]; the scheduler uses it to spawn fresh
//! assignments day after day.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Cleaning,
    Homework,
    Hygiene,
    Organization,
    Pets,
    Other,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cleaning => "cleaning",
            Self::Homework => "homework",
            Self::Hygiene => "hygiene",
            Self::Organization => "organization",
            Self::Pets => "pets",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for TaskCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cleaning" => Ok(Self::Cleaning),
            "homework" => Ok(Self::Homework),
            "hygiene" => Ok(Self::Hygiene),
            "organization" => Ok(Self::Organization),
            "pets" => Ok(Self::Pets),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid task category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Archived,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(EngineError::Validation(format!(
                "invalid task status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
}

impl RecurrenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl TryFrom<&str> for RecurrenceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(EngineError::Validation(format!(
                "invalid recurrence kind: {other}"
            ))),
        }
    }
}

/// How a task repeats.
///
/// `weekdays` is only meaningful for [`RecurrenceKind::Weekly`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub kind: RecurrenceKind,
    pub weekdays: Vec<Weekday>,
    pub end_date: Option<NaiveDate>,
}

impl Recurrence {
    pub fn daily() -> Self {
        Self {
            kind: RecurrenceKind::Daily,
            weekdays: Vec::new(),
            end_date: None,
        }
    }

    pub fn weekly(weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = weekdays.into_iter().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        Self {
            kind: RecurrenceKind::Weekly,
            weekdays: days,
            end_date: None,
        }
    }

    #[must_use]
    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.kind == RecurrenceKind::Weekly && self.weekdays.is_empty() {
            return Err(EngineError::Validation(
                "weekly recurrence needs at least one weekday".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the rule has not run past its end date on `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.end_date.is_none_or(|end| end >= date)
    }

    /// Whether an occurrence falls on `date`.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        if !self.is_active_on(date) {
            return false;
        }
        match self.kind {
            RecurrenceKind::Daily => true,
            RecurrenceKind::Weekly => self.weekdays.contains(&date.weekday()),
        }
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

pub(crate) fn format_weekdays(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| weekday_code(*d))
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn parse_weekdays(raw: &str) -> ResultEngine<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|code| match code.to_ascii_uppercase().as_str() {
            "MON" => Ok(Weekday::Mon),
            "TUE" => Ok(Weekday::Tue),
            "WED" => Ok(Weekday::Wed),
            "THU" => Ok(Weekday::Thu),
            "FRI" => Ok(Weekday::Fri),
            "SAT" => Ok(Weekday::Sat),
            "SUN" => Ok(Weekday::Sun),
            other => Err(EngineError::Validation(format!("invalid weekday: {other}"))),
        })
        .collect()
}

/// A chore template owned by a parent and scoped to a family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub coin_value: i64,
    pub xp_value: i64,
    pub category: TaskCategory,
    pub status: TaskStatus,
    pub recurrence: Option<Recurrence>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        family_id: Uuid,
        created_by: Uuid,
        title: String,
        description: Option<String>,
        coin_value: i64,
        xp_value: i64,
        category: TaskCategory,
        recurrence: Option<Recurrence>,
    ) -> ResultEngine<Self> {
        if coin_value <= 0 {
            return Err(EngineError::Validation(
                "coin_value must be > 0".to_string(),
            ));
        }
        if xp_value <= 0 {
            return Err(EngineError::Validation("xp_value must be > 0".to_string()));
        }
        if let Some(rule) = &recurrence {
            rule.validate()?;
        }
        Ok(Self {
            id: Uuid::new_v4(),
            family_id,
            created_by,
            title,
            description,
            coin_value,
            xp_value,
            category,
            status: TaskStatus::Active,
            recurrence,
            created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub coin_value: i64,
    pub xp_value: i64,
    pub category: String,
    pub status: String,
    pub recurrence_kind: Option<String>,
    pub recurrence_days: Option<String>,
    pub recurrence_end_date: Option<Date>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assignments::Entity")]
    Assignments,
    #[sea_orm(
        belongs_to = "super::families::Entity",
        from = "Column::FamilyId",
        to = "super::families::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Families,
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Families.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Task> for ActiveModel {
    fn from(value: &Task) -> Self {
        let recurrence = value.recurrence.as_ref();
        Self {
            id: ActiveValue::Set(value.id),
            family_id: ActiveValue::Set(value.family_id),
            created_by: ActiveValue::Set(value.created_by),
            title: ActiveValue::Set(value.title.clone()),
            description: ActiveValue::Set(value.description.clone()),
            coin_value: ActiveValue::Set(value.coin_value),
            xp_value: ActiveValue::Set(value.xp_value),
            category: ActiveValue::Set(value.category.as_str().to_string()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            recurrence_kind: ActiveValue::Set(recurrence.map(|r| r.kind.as_str().to_string())),
            recurrence_days: ActiveValue::Set(
                recurrence
                    .filter(|r| !r.weekdays.is_empty())
                    .map(|r| format_weekdays(&r.weekdays)),
            ),
            recurrence_end_date: ActiveValue::Set(recurrence.and_then(|r| r.end_date)),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Task {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let recurrence = match model.recurrence_kind.as_deref() {
            Some(kind) => Some(Recurrence {
                kind: RecurrenceKind::try_from(kind)?,
                weekdays: model
                    .recurrence_days
                    .as_deref()
                    .map(parse_weekdays)
                    .transpose()?
                    .unwrap_or_default(),
                end_date: model.recurrence_end_date,
            }),
            None => None,
        };
        Ok(Self {
            id: model.id,
            family_id: model.family_id,
            created_by: model.created_by,
            title: model.title,
            description: model.description,
            coin_value: model.coin_value,
            xp_value: model.xp_value,
            category: TaskCategory::try_from(model.category.as_str())?,
            status: TaskStatus::try_from(model.status.as_str())?,
            recurrence,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_is_due_every_day_until_end_date() {
        let rule = Recurrence::daily().until(date(2026, 10, 20));
        assert!(rule.is_due_on(date(2026, 10, 18)));
        assert!(rule.is_due_on(date(2026, 10, 20)));
        assert!(!rule.is_due_on(date(2026, 10, 21)));
    }

    #[test]
    fn weekly_is_due_only_on_configured_days() {
        // 2026-10-19 is a Monday.
        let rule = Recurrence::weekly([Weekday::Mon, Weekday::Fri]);
        assert!(rule.is_due_on(date(2026, 10, 19)));
        assert!(!rule.is_due_on(date(2026, 10, 20)));
        assert!(rule.is_due_on(date(2026, 10, 23)));
    }

    #[test]
    fn weekly_without_days_is_invalid() {
        let rule = Recurrence::weekly([]);
        assert!(matches!(rule.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn weekdays_storage_format() {
        let days = parse_weekdays("mon, WED,FRI").unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert_eq!(format_weekdays(&days), "MON,WED,FRI");
        assert!(parse_weekdays("MON,XYZ").is_err());
    }

    #[test]
    fn task_values_must_be_positive() {
        let err = Task::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Dishes".to_string(),
            None,
            0,
            10,
            TaskCategory::Cleaning,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("coin_value must be > 0".to_string())
        );
    }
}
