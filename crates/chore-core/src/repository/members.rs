use crate::error::CoreError;
use crate::models::{Member, ReminderKind};
use crate::repository::{id_prefix_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

#[async_trait]
impl super::MemberRepository for SqliteRepository {
    async fn add_member(&self, household_id: Uuid, name: String) -> Result<Member, CoreError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("member name cannot be empty".to_string()));
        }
        let mut tx = self.pool().begin().await?;
        let household: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM households WHERE id = $1")
            .bind(household_id)
            .fetch_optional(&mut *tx)
            .await?;
        if household.is_none() {
            return Err(CoreError::NotFound(format!("household {}", household_id)));
        }

        let member = sqlx::query_as(
            r#"INSERT INTO members (id, household_id, name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(household_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(member)
    }

    async fn find_member_by_id(&self, id: Uuid) -> Result<Option<Member>, CoreError> {
        let member = sqlx::query_as("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(member)
    }

    async fn find_members_by_id_prefix(&self, short_id: &str) -> Result<Vec<Member>, CoreError> {
        let members = sqlx::query_as("SELECT * FROM members WHERE lower(hex(id)) LIKE $1")
            .bind(id_prefix_pattern(short_id)?)
            .fetch_all(self.pool())
            .await?;
        Ok(members)
    }

    async fn find_members_by_household(&self, household_id: Uuid) -> Result<Vec<Member>, CoreError> {
        let members = sqlx::query_as("SELECT * FROM members WHERE household_id = $1 ORDER BY created_at, id")
            .bind(household_id)
            .fetch_all(self.pool())
            .await?;
        Ok(members)
    }

    async fn set_member_marker(&self, id: Uuid, kind: ReminderKind, date: NaiveDate) -> Result<(), CoreError> {
        let sql = match kind {
            ReminderKind::Morning => "UPDATE members SET last_daily_push_date = $1 WHERE id = $2",
            ReminderKind::Evening => "UPDATE members SET last_evening_push_date = $1 WHERE id = $2",
            ReminderKind::Penalty => {
                return Err(CoreError::InvalidInput(
                    "penalty reminders are tracked per task".to_string(),
                ))
            }
        };

        let result = sqlx::query(sql).bind(date).bind(id).execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("member {}", id)));
        }
        Ok(())
    }
}
