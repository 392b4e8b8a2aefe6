use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::models::{CartEntry, CartLine};

#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `None` when the recipe is already in the user's cart.
    #[instrument(name = "db.cart.create", skip(self))]
    pub async fn create(&self, user_id: i32, recipe_id: i32) -> Result<Option<CartEntry>, sqlx::Error> {
        sqlx::query_as::<_, CartEntry>(
            r#"
            INSERT INTO shopping_cart (user_id, recipe_id)
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

    #[instrument(name = "db.cart.delete", skip(self))]
    pub async fn delete(&self, user_id: i32, recipe_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.cart.in_cart_among", skip(self, recipe_ids))]
    pub async fn in_cart_among(
        &self,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<Vec<i32>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT recipe_id
            FROM shopping_cart
            WHERE user_id = $1 AND recipe_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get::<i32, _>("recipe_id")).collect())
    }

    /// Every ingredient line of every recipe in the user's cart, read in a
    /// single statement so the walk sees one snapshot of the cart.
    #[instrument(name = "db.cart.cart_lines", skip(self))]
    pub async fn cart_lines(&self, user_id: i32) -> Result<Vec<CartLine>, sqlx::Error> {
        sqlx::query_as::<_, CartLine>(
            r#"
            SELECT c.recipe_id, i.name, i.measurement_unit, ri.amount
            FROM shopping_cart c
            LEFT JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            LEFT JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
