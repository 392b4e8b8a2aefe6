use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::models::Favorite;

#[derive(Clone)]
pub struct FavoriteRepository {
    pool: PgPool,
}

impl FavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `None` when the pair already exists.
    #[instrument(name = "db.favorite.create", skip(self))]
    pub async fn create(&self, user_id: i32, recipe_id: i32) -> Result<Option<Favorite>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, recipe_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, recipe_id) DO NOTHING
            RETURNING id, user_id, recipe_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.favorite.delete", skip(self))]
    pub async fn delete(&self, user_id: i32, recipe_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.favorite.favorited_among", skip(self, recipe_ids))]
    pub async fn favorited_among(
        &self,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<Vec<i32>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT recipe_id
            FROM favorites
            WHERE user_id = $1 AND recipe_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get::<i32, _>("recipe_id")).collect())
    }
}
