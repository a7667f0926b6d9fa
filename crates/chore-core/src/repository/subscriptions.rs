use crate::error::CoreError;
use crate::models::{NewSubscriptionData, PushSubscription};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl super::SubscriptionRepository for SqliteRepository {
    async fn add_subscription(&self, data: NewSubscriptionData) -> Result<PushSubscription, CoreError> {
        if data.endpoint.trim().is_empty() {
            return Err(CoreError::InvalidInput("subscription endpoint cannot be empty".to_string()));
        }
        let mut tx = self.pool().begin().await?;
        let member: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM members WHERE id = $1")
            .bind(data.member_id)
            .fetch_optional(&mut *tx)
            .await?;
        if member.is_none() {
            return Err(CoreError::NotFound(format!("member {}", data.member_id)));
        }

        let subscription = sqlx::query_as(
            r#"INSERT INTO push_subscriptions (id, member_id, endpoint, p256dh, auth)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (member_id, endpoint)
            DO UPDATE SET p256dh = excluded.p256dh, auth = excluded.auth
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(data.member_id)
        .bind(data.endpoint.trim())
        .bind(data.p256dh)
        .bind(data.auth)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(subscription)
    }

    async fn find_subscriptions_for_member(&self, member_id: Uuid) -> Result<Vec<PushSubscription>, CoreError> {
        let subscriptions = sqlx::query_as(
            "SELECT * FROM push_subscriptions WHERE member_id = $1 ORDER BY created_at, id",
        )
        .bind(member_id)
        .fetch_all(self.pool())
        .await?;
        Ok(subscriptions)
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
