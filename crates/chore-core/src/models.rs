use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    /// IANA timezone name (e.g., "Europe/Zurich")
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl Household {
    /// Parses the household's zone. All calendar comparisons for its
    /// members and tasks go through this.
    pub fn tz(&self) -> Result<Tz, CoreError> {
        crate::timezone::parse_timezone(&self.timezone)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    /// Idempotency marker of the morning sweep
    pub last_daily_push_date: Option<NaiveDate>,
    /// Idempotency marker of the evening sweep
    pub last_evening_push_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Returns the marker the given sweep keeps on this member. Penalty
    /// reminders are tracked per task, so members carry no penalty marker.
    pub fn marker(&self, kind: ReminderKind) -> Option<NaiveDate> {
        match kind {
            ReminderKind::Morning => self.last_daily_push_date,
            ReminderKind::Evening => self.last_evening_push_date,
            ReminderKind::Penalty => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceClass {
    Once,
    Daily,
    Weekly,
    Monthly,
    /// Every three months
    Seasonal,
    /// Every six months
    HalfYear,
    Yearly,
}

impl RecurrenceClass {
    /// Length of one step in calendar months, for the month-based classes.
    pub fn month_interval(&self) -> Option<u32> {
        match self {
            RecurrenceClass::Monthly => Some(1),
            RecurrenceClass::Seasonal => Some(3),
            RecurrenceClass::HalfYear => Some(6),
            RecurrenceClass::Yearly => Some(12),
            RecurrenceClass::Once | RecurrenceClass::Daily | RecurrenceClass::Weekly => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, RecurrenceClass::Once)
    }
}

impl std::fmt::Display for RecurrenceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceClass::Once => write!(f, "once"),
            RecurrenceClass::Daily => write!(f, "daily"),
            RecurrenceClass::Weekly => write!(f, "weekly"),
            RecurrenceClass::Monthly => write!(f, "monthly"),
            RecurrenceClass::Seasonal => write!(f, "seasonal"),
            RecurrenceClass::HalfYear => write!(f, "half_year"),
            RecurrenceClass::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence class: {0}")]
pub struct ParseRecurrenceClassError(String);

impl FromStr for RecurrenceClass {
    type Err = ParseRecurrenceClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "once" => Ok(RecurrenceClass::Once),
            "daily" => Ok(RecurrenceClass::Daily),
            "weekly" => Ok(RecurrenceClass::Weekly),
            "monthly" => Ok(RecurrenceClass::Monthly),
            "seasonal" | "quarterly" => Ok(RecurrenceClass::Seasonal),
            "half_year" | "half-year" | "halfyear" => Ok(RecurrenceClass::HalfYear),
            "yearly" => Ok(RecurrenceClass::Yearly),
            _ => Err(ParseRecurrenceClassError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub household_id: Uuid,
    pub title: String,
    pub recurrence_class: RecurrenceClass,
    /// Stored rule JSON. Decode through [`Task::recurrence_rule`].
    pub rule: Option<String>,
    /// Calendar date in the household's zone
    pub due_date: NaiveDate,
    pub primary_assignee_id: Option<Uuid>,
    pub secondary_assignee_id: Option<Uuid>,
    pub active: bool,
    /// Idempotency marker of the penalty sweep
    pub last_penalty_date: Option<NaiveDate>,
    /// Who handed the task over; cleared on every recurrence rollover
    pub transferred_from_id: Option<Uuid>,
    pub transferred_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Decodes the stored rule, if any.
    pub fn recurrence_rule(&self) -> Result<Option<RecurrenceRule>, CoreError> {
        RecurrenceRule::from_stored(self.rule.as_deref())
    }

    pub fn is_assigned_to(&self, member_id: Uuid) -> bool {
        self.primary_assignee_id == Some(member_id) || self.secondary_assignee_id == Some(member_id)
    }

    /// Assignees in notification order, without duplicates.
    pub fn assignees(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(2);
        for id in [self.primary_assignee_id, self.secondary_assignee_id].into_iter().flatten() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PushSubscription {
    pub id: Uuid,
    pub member_id: Uuid,
    /// Delivery endpoint URL handed out by the browser's push service
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}

/// The three daily reminder sweeps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Morning,
    Evening,
    Penalty,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 3] = [ReminderKind::Morning, ReminderKind::Evening, ReminderKind::Penalty];
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderKind::Morning => write!(f, "morning"),
            ReminderKind::Evening => write!(f, "evening"),
            ReminderKind::Penalty => write!(f, "penalty"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid reminder kind: {0}")]
pub struct ParseReminderKindError(String);

impl FromStr for ReminderKind {
    type Err = ParseReminderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morning" => Ok(ReminderKind::Morning),
            "evening" => Ok(ReminderKind::Evening),
            "penalty" => Ok(ReminderKind::Penalty),
            _ => Err(ParseReminderKindError(s.to_string())),
        }
    }
}

/// Which assignee slots a due-task lookup matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeScope {
    PrimaryOrSecondary,
    PrimaryOnly,
}

#[derive(Debug, Clone)]
pub struct NewTaskData {
    pub household_id: Uuid,
    pub title: String,
    pub recurrence_class: RecurrenceClass,
    /// Raw rule JSON; validated and normalized before it is stored
    pub rule: Option<String>,
    pub due_date: NaiveDate,
    pub primary_assignee_id: Option<Uuid>,
    pub secondary_assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewSubscriptionData {
    pub member_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug)]
pub enum CompletionResult {
    /// A one-off task was completed and deactivated.
    Finished(Task),
    /// A recurring task rolled over to its next due date.
    Rescheduled {
        task: Task,
        previous_due: NaiveDate,
        next_due: NaiveDate,
        /// The skip-forward loop ran out of iterations before passing the
        /// completion date.
        bound_hit: bool,
    },
}
