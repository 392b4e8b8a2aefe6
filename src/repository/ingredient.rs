use sqlx::PgPool;
use tracing::instrument;

use crate::models::{Ingredient, NewIngredient};

#[derive(Clone)]
pub struct IngredientRepository {
    pool: PgPool,
}

impl IngredientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive name prefix search, ordered by name.
    #[instrument(name = "db.ingredient.search", skip(self))]
    pub async fn search(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, sqlx::Error> {
        match prefix {
            Some(prefix) => {
                sqlx::query_as::<_, Ingredient>(
                    r#"
                    SELECT id, name, measurement_unit
                    FROM ingredients
                    WHERE LOWER(name) LIKE LOWER($1) || '%'
                    ORDER BY name
                    "#,
                )
                .bind(escape_like(prefix))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Ingredient>(
                    "SELECT id, name, measurement_unit FROM ingredients ORDER BY name",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    #[instrument(name = "db.ingredient.find_by_id", skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Ingredient>, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts every entry whose name is not in the catalog yet, in one
    /// transaction. Returns how many rows were added.
    #[instrument(name = "db.ingredient.import", skip(self, items), fields(items = items.len()))]
    pub async fn import(&self, items: &[NewIngredient]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for item in items {
            let result = sqlx::query(
                r#"
                INSERT INTO ingredients (name, measurement_unit)
                VALUES ($1, $2)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(&item.name)
            .bind(&item.measurement_unit)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tracing::debug!(name = %item.name, "Ingredient already present");
            }
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
