use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    AssigneeScope, CompletionResult, Household, Member, NewSubscriptionData, NewTaskData,
    PushSubscription, ReminderKind, Task,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub mod households;
pub mod members;
pub mod subscriptions;
pub mod tasks;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for household operations
#[async_trait]
pub trait HouseholdRepository: Send + Sync {
    async fn add_household(&self, name: String, timezone: String) -> Result<Household, CoreError>;
    async fn find_household_by_id(&self, id: Uuid) -> Result<Option<Household>, CoreError>;
    async fn find_households_by_id_prefix(&self, short_id: &str) -> Result<Vec<Household>, CoreError>;
    async fn find_households(&self) -> Result<Vec<Household>, CoreError>;
}

/// Domain-specific trait for member operations
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn add_member(&self, household_id: Uuid, name: String) -> Result<Member, CoreError>;
    async fn find_member_by_id(&self, id: Uuid) -> Result<Option<Member>, CoreError>;
    async fn find_members_by_id_prefix(&self, short_id: &str) -> Result<Vec<Member>, CoreError>;
    async fn find_members_by_household(&self, household_id: Uuid) -> Result<Vec<Member>, CoreError>;
    /// Records that the `kind` sweep fired for the member on `date`.
    async fn set_member_marker(&self, id: Uuid, kind: ReminderKind, date: NaiveDate) -> Result<(), CoreError>;
}

/// Domain-specific trait for task operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError>;
    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;
    async fn find_tasks_by_id_prefix(&self, short_id: &str) -> Result<Vec<Task>, CoreError>;
    async fn find_tasks_by_household(&self, household_id: Uuid) -> Result<Vec<Task>, CoreError>;
    /// Active tasks of the household due on or before `today`.
    async fn find_due_tasks(&self, household_id: Uuid, today: NaiveDate) -> Result<Vec<Task>, CoreError>;
    async fn find_due_tasks_for_member(
        &self,
        household_id: Uuid,
        member_id: Uuid,
        today: NaiveDate,
        scope: AssigneeScope,
    ) -> Result<Vec<Task>, CoreError>;
    async fn set_penalty_marker(&self, id: Uuid, date: NaiveDate) -> Result<(), CoreError>;
    /// Completes a task on `completed_on`, or on the household's current
    /// date when `None`.
    async fn complete_task(&self, id: Uuid, completed_on: Option<NaiveDate>) -> Result<CompletionResult, CoreError>;
    /// Hands the task's primary slot to `to`, recording `by` as the origin.
    async fn transfer_task(&self, id: Uuid, to: Uuid, by: Uuid, at: DateTime<Utc>) -> Result<Task, CoreError>;
}

/// Domain-specific trait for push subscription operations
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Registers a device; re-registering the same endpoint refreshes its keys.
    async fn add_subscription(&self, data: NewSubscriptionData) -> Result<PushSubscription, CoreError>;
    async fn find_subscriptions_for_member(&self, member_id: Uuid) -> Result<Vec<PushSubscription>, CoreError>;
    /// Returns whether a row was removed. Deleting twice is not an error.
    async fn delete_subscription(&self, id: Uuid) -> Result<bool, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository:
    HouseholdRepository + MemberRepository + TaskRepository + SubscriptionRepository
{
}

/// SQLite implementation of the repository pattern
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}

/// LIKE pattern matching ids by the hex prefix a user typed, with or
/// without dashes.
pub(crate) fn id_prefix_pattern(short_id: &str) -> Result<String, CoreError> {
    let mut pattern: String = short_id
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if pattern.is_empty() || !pattern.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidInput(format!("'{}' is not an id prefix", short_id)));
    }
    pattern.push('%');
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_prefix_pattern() {
        assert_eq!(id_prefix_pattern("0190ABcd").unwrap(), "0190abcd%");
        assert_eq!(id_prefix_pattern("0190abcd-12").unwrap(), "0190abcd12%");
        assert!(id_prefix_pattern("").is_err());
        assert!(id_prefix_pattern("xyz").is_err());
        assert!(id_prefix_pattern("%").is_err());
    }
}
