use crate::error::CoreError;
use crate::models::Household;
use crate::repository::{id_prefix_pattern, SqliteRepository};
use crate::timezone::validate_timezone;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl super::HouseholdRepository for SqliteRepository {
    async fn add_household(&self, name: String, timezone: String) -> Result<Household, CoreError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("household name cannot be empty".to_string()));
        }
        validate_timezone(&timezone)?;

        // RETURNING on a bare pool connection can leave the insert uncommitted
        // when the call returns; commit explicitly.
        let mut tx = self.pool().begin().await?;
        let household = sqlx::query_as(
            r#"INSERT INTO households (id, name, timezone)
            VALUES ($1, $2, $3)
            RETURNING id, name, timezone, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(timezone)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(household)
    }

    async fn find_household_by_id(&self, id: Uuid) -> Result<Option<Household>, CoreError> {
        let household = sqlx::query_as("SELECT * FROM households WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(household)
    }

    async fn find_households_by_id_prefix(&self, short_id: &str) -> Result<Vec<Household>, CoreError> {
        let households = sqlx::query_as("SELECT * FROM households WHERE lower(hex(id)) LIKE $1")
            .bind(id_prefix_pattern(short_id)?)
            .fetch_all(self.pool())
            .await?;
        Ok(households)
    }

    async fn find_households(&self) -> Result<Vec<Household>, CoreError> {
        let households = sqlx::query_as("SELECT * FROM households ORDER BY created_at, id")
            .fetch_all(self.pool())
            .await?;
        Ok(households)
    }
}
