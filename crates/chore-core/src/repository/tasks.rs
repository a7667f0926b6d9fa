use crate::error::CoreError;
use crate::models::{AssigneeScope, CompletionResult, Household, NewTaskData, RecurrenceClass, Task};
use crate::recurrence::{RecurrenceEngine, RecurrenceRule};
use crate::repository::{id_prefix_pattern, SqliteRepository};
use crate::timezone::local_date;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        let title = data.title.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::InvalidInput("task title cannot be empty".to_string()));
        }

        let rule = RecurrenceRule::from_stored(data.rule.as_deref())?;
        if rule.is_some() && data.recurrence_class.month_interval().is_none() {
            return Err(CoreError::InvalidInput(format!(
                "a rule only applies to month-based classes, not '{}'",
                data.recurrence_class
            )));
        }

        let mut tx = self.pool().begin().await?;

        Self::fetch_household(&mut tx, data.household_id).await?;
        for assignee in [data.primary_assignee_id, data.secondary_assignee_id].into_iter().flatten() {
            Self::ensure_member_of(&mut tx, assignee, data.household_id).await?;
        }

        let task = sqlx::query_as(
            r#"INSERT INTO tasks (id, household_id, title, recurrence_class, rule, due_date, primary_assignee_id, secondary_assignee_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(data.household_id)
        .bind(title)
        .bind(data.recurrence_class)
        .bind(rule.as_ref().map(RecurrenceRule::to_stored))
        .bind(data.due_date)
        .bind(data.primary_assignee_id)
        .bind(data.secondary_assignee_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn find_tasks_by_id_prefix(&self, short_id: &str) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as("SELECT * FROM tasks WHERE lower(hex(id)) LIKE $1")
            .bind(id_prefix_pattern(short_id)?)
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }

    async fn find_tasks_by_household(&self, household_id: Uuid) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            "SELECT * FROM tasks WHERE household_id = $1 ORDER BY active DESC, due_date, title",
        )
        .bind(household_id)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn find_due_tasks(&self, household_id: Uuid, today: NaiveDate) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE household_id = $1 AND active = 1 AND due_date <= $2
            ORDER BY due_date, title
            "#,
        )
        .bind(household_id)
        .bind(today)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn find_due_tasks_for_member(
        &self,
        household_id: Uuid,
        member_id: Uuid,
        today: NaiveDate,
        scope: AssigneeScope,
    ) -> Result<Vec<Task>, CoreError> {
        let assignee_filter = match scope {
            AssigneeScope::PrimaryOrSecondary => "(primary_assignee_id = $3 OR secondary_assignee_id = $3)",
            AssigneeScope::PrimaryOnly => "primary_assignee_id = $3",
        };
        let sql = format!(
            r#"SELECT * FROM tasks
            WHERE household_id = $1 AND active = 1 AND due_date <= $2 AND {}
            ORDER BY due_date, title
            "#,
            assignee_filter
        );

        let tasks = sqlx::query_as(&sql)
            .bind(household_id)
            .bind(today)
            .bind(member_id)
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }

    async fn set_penalty_marker(&self, id: Uuid, date: NaiveDate) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE tasks SET last_penalty_date = $1 WHERE id = $2")
            .bind(date)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("task {}", id)));
        }
        Ok(())
    }

    async fn complete_task(&self, id: Uuid, completed_on: Option<NaiveDate>) -> Result<CompletionResult, CoreError> {
        let mut tx = self.pool().begin().await?;

        let task = Self::fetch_task(&mut tx, id).await?;
        if !task.active {
            return Err(CoreError::InvalidInput(format!("task '{}' is no longer active", task.title)));
        }

        if task.recurrence_class == RecurrenceClass::Once {
            let finished: Task = sqlx::query_as(
                "UPDATE tasks SET active = 0, updated_at = $1 WHERE id = $2 RETURNING *",
            )
            .bind(Utc::now())
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            info!(task_id = %id, "one-off task finished");
            return Ok(CompletionResult::Finished(finished));
        }

        let completed_on = match completed_on {
            Some(date) => date,
            None => {
                let household = Self::fetch_household(&mut tx, task.household_id).await?;
                local_date(household.tz()?, Utc::now())
            }
        };

        let rule = match task.recurrence_rule() {
            Ok(rule) => rule,
            Err(e) => {
                warn!(task_id = %id, "ignoring stored rule: {e}");
                None
            }
        };

        let outcome = RecurrenceEngine::new().advance_detailed(
            task.due_date,
            task.recurrence_class,
            rule.as_ref(),
            Some(completed_on),
        )?;

        let rescheduled: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET due_date = $1, transferred_from_id = NULL, transferred_at = NULL, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(outcome.next_due)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            task_id = %id,
            previous_due = %task.due_date,
            next_due = %outcome.next_due,
            steps = outcome.steps,
            "task rescheduled"
        );

        Ok(CompletionResult::Rescheduled {
            task: rescheduled,
            previous_due: task.due_date,
            next_due: outcome.next_due,
            bound_hit: outcome.bound_hit,
        })
    }

    async fn transfer_task(&self, id: Uuid, to: Uuid, by: Uuid, at: DateTime<Utc>) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;

        let task = Self::fetch_task(&mut tx, id).await?;
        if !task.active {
            return Err(CoreError::InvalidInput(format!("task '{}' is no longer active", task.title)));
        }
        if task.primary_assignee_id == Some(to) {
            return Err(CoreError::InvalidInput(format!(
                "task '{}' is already assigned to that member",
                task.title
            )));
        }
        Self::ensure_member_of(&mut tx, to, task.household_id).await?;
        Self::ensure_member_of(&mut tx, by, task.household_id).await?;

        // The new primary must not also sit in the secondary slot
        let secondary = task.secondary_assignee_id.filter(|&secondary| secondary != to);

        let transferred: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET primary_assignee_id = $1, secondary_assignee_id = $2,
                transferred_from_id = $3, transferred_at = $4, updated_at = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(secondary)
        .bind(by)
        .bind(at)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(transferred)
    }
}

impl SqliteRepository {
    async fn fetch_task(tx: &mut Transaction<'_, Sqlite>, id: Uuid) -> Result<Task, CoreError> {
        sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {}", id)))
    }

    async fn fetch_household(tx: &mut Transaction<'_, Sqlite>, id: Uuid) -> Result<Household, CoreError> {
        sqlx::query_as("SELECT * FROM households WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("household {}", id)))
    }

    async fn ensure_member_of(
        tx: &mut Transaction<'_, Sqlite>,
        member_id: Uuid,
        household_id: Uuid,
    ) -> Result<(), CoreError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT household_id FROM members WHERE id = $1")
            .bind(member_id)
            .fetch_optional(&mut **tx)
            .await?;

        match found {
            Some((owner,)) if owner == household_id => Ok(()),
            Some(_) => Err(CoreError::InvalidInput(format!(
                "member {} belongs to another household",
                member_id
            ))),
            None => Err(CoreError::NotFound(format!("member {}", member_id))),
        }
    }
}
