use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::models::Subscription;

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `None` when `user_id` already follows `author_id`.
    #[instrument(name = "db.subscription.create", skip(self))]
    pub async fn create(
        &self,
        user_id: i32,
        author_id: i32,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id, user_id, author_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.subscription.delete", skip(self))]
    pub async fn delete(&self, user_id: i32, author_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.subscription.followed_among", skip(self, author_ids))]
    pub async fn followed_among(
        &self,
        user_id: i32,
        author_ids: &[i32],
    ) -> Result<Vec<i32>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT author_id
            FROM subscriptions
            WHERE user_id = $1 AND author_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get::<i32, _>("author_id")).collect())
    }

    #[instrument(name = "db.subscription.count_followed", skip(self))]
    pub async fn count_followed(&self, user_id: i32) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }
}
