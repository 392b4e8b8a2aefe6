use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::{database::unique_violation_as_none, models::User};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `None` when the email or username is already taken.
    #[instrument(name = "db.user.create", skip(self, password_hash))]
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        unique_violation_as_none(
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (email, username, first_name, last_name, password_hash)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, email, username, first_name, last_name, password_hash, created_at
                "#,
            )
            .bind(email)
            .bind(username)
            .bind(first_name)
            .bind(last_name)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await,
        )
    }

    #[instrument(name = "db.user.find_by_email", skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, first_name, last_name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.user.find_by_id", skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, first_name, last_name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.user.exists_by_email_or_username", skip(self))]
    pub async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2) as exists",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("exists"))
    }

    #[instrument(name = "db.user.list", skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, first_name, last_name, password_hash, created_at
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    #[instrument(name = "db.user.count", skip(self))]
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }

    /// Authors followed by `user_id`, ordered by author id.
    #[instrument(name = "db.user.list_followed", skip(self))]
    pub async fn list_followed(
        &self,
        user_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.created_at
            FROM users u
            JOIN subscriptions s ON s.author_id = u.id
            WHERE s.user_id = $1
            ORDER BY u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
