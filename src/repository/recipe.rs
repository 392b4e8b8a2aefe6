use std::collections::HashSet;

use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;
use tracing::instrument;

use crate::models::{
    RecipeFilter, RecipeIngredientLine, RecipeSummary, RecipeTagRow, RecipeWithAuthor,
    RecipeWriteInput,
};

const RECIPE_WITH_AUTHOR: &str = r#"
    SELECT
        r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date,
        u.email as author_email, u.username as author_username,
        u.first_name as author_first_name, u.last_name as author_last_name
    FROM recipes r
    JOIN users u ON r.author_id = u.id
"#;

const LIST_FILTER: &str = r#"
    WHERE ($1::int4 IS NULL OR r.author_id = $1)
      AND (cardinality($2::text[]) = 0 OR EXISTS (
            SELECT 1 FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = r.id AND t.slug = ANY($2)
          ))
      AND ($3::int4 IS NULL OR EXISTS (
            SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $3
          ))
      AND ($4::int4 IS NULL OR EXISTS (
            SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = $4
          ))
"#;

#[derive(Error, Debug)]
pub enum RecipeWriteError {
    #[error("unknown tag ids: {0:?}")]
    UnknownTags(Vec<i32>),

    #[error("unknown ingredient ids: {0:?}")]
    UnknownIngredients(Vec<i32>),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct RecipeRepository {
    pool: PgPool,
}

impl RecipeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the recipe row, its tags and its ingredient lines atomically.
    #[instrument(name = "db.recipe.create", skip(self, input))]
    pub async fn create(
        &self,
        author_id: i32,
        input: &RecipeWriteInput,
    ) -> Result<i32, RecipeWriteError> {
        let mut tx = self.pool.begin().await?;

        ensure_references_exist(&mut tx, input).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(&input.name)
        .bind(&input.image)
        .bind(&input.text)
        .bind(input.cooking_time)
        .fetch_one(&mut *tx)
        .await?;
        let recipe_id: i32 = row.get("id");

        insert_relations(&mut tx, recipe_id, input).await?;

        tx.commit().await?;

        Ok(recipe_id)
    }

    /// Rewrites the recipe row and replaces tags and ingredient lines wholesale.
    /// `pub_date` and `author_id` are never touched.
    #[instrument(name = "db.recipe.update", skip(self, input))]
    pub async fn update(&self, id: i32, input: &RecipeWriteInput) -> Result<(), RecipeWriteError> {
        let mut tx = self.pool.begin().await?;

        ensure_references_exist(&mut tx, input).await?;

        sqlx::query(
            r#"
            UPDATE recipes
            SET name = $2, image = $3, text = $4, cooking_time = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.image)
        .bind(&input.text)
        .bind(input.cooking_time)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_relations(&mut tx, id, input).await?;

        tx.commit().await?;

        Ok(())
    }

    #[instrument(name = "db.recipe.delete", skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(name = "db.recipe.find_by_id", skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<RecipeWithAuthor>, sqlx::Error> {
        let sql = format!("{RECIPE_WITH_AUTHOR} WHERE r.id = $1");

        sqlx::query_as::<_, RecipeWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    #[instrument(name = "db.recipe.list", skip(self))]
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecipeWithAuthor>, sqlx::Error> {
        let sql = format!(
            "{RECIPE_WITH_AUTHOR} {LIST_FILTER} ORDER BY r.pub_date DESC, r.id DESC LIMIT $5 OFFSET $6"
        );

        sqlx::query_as::<_, RecipeWithAuthor>(&sql)
            .bind(filter.author_id)
            .bind(&filter.tag_slugs)
            .bind(filter.favorited_by)
            .bind(filter.in_cart_of)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    #[instrument(name = "db.recipe.count", skip(self))]
    pub async fn count(&self, filter: &RecipeFilter) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) as count FROM recipes r {LIST_FILTER}");

        let row = sqlx::query(&sql)
            .bind(filter.author_id)
            .bind(&filter.tag_slugs)
            .bind(filter.favorited_by)
            .bind(filter.in_cart_of)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }

    #[instrument(name = "db.recipe.tags_for", skip(self, recipe_ids))]
    pub async fn tags_for(&self, recipe_ids: &[i32]) -> Result<Vec<RecipeTagRow>, sqlx::Error> {
        sqlx::query_as::<_, RecipeTagRow>(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await
    }

    #[instrument(name = "db.recipe.ingredients_for", skip(self, recipe_ids))]
    pub async fn ingredients_for(
        &self,
        recipe_ids: &[i32],
    ) -> Result<Vec<RecipeIngredientLine>, sqlx::Error> {
        sqlx::query_as::<_, RecipeIngredientLine>(
            r#"
            SELECT ri.recipe_id, i.id as ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY ri.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Newest-first recipe cards of each author, at most `per_author` each.
    #[instrument(name = "db.recipe.summaries_by_authors", skip(self, author_ids))]
    pub async fn summaries_by_authors(
        &self,
        author_ids: &[i32],
        per_author: Option<i64>,
    ) -> Result<Vec<(i32, RecipeSummary)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT author_id, id, name, image, cooking_time
            FROM (
                SELECT
                    r.author_id, r.id, r.name, r.image, r.cooking_time, r.pub_date,
                    ROW_NUMBER() OVER (
                        PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC
                    ) AS position
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE $2::int8 IS NULL OR position <= $2
            ORDER BY author_id, pub_date DESC, id DESC
            "#,
        )
        .bind(author_ids)
        .bind(per_author)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                (
                    r.get::<i32, _>("author_id"),
                    RecipeSummary {
                        id: r.get("id"),
                        name: r.get("name"),
                        image: r.get("image"),
                        cooking_time: r.get("cooking_time"),
                    },
                )
            })
            .collect())
    }

    #[instrument(name = "db.recipe.count_by_authors", skip(self, author_ids))]
    pub async fn count_by_authors(&self, author_ids: &[i32]) -> Result<Vec<(i32, i64)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT author_id, COUNT(*) as count
            FROM recipes
            WHERE author_id = ANY($1)
            GROUP BY author_id
            "#,
        )
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get::<i32, _>("author_id"), r.get::<i64, _>("count")))
            .collect())
    }
}

async fn ensure_references_exist(
    tx: &mut Transaction<'_, Postgres>,
    input: &RecipeWriteInput,
) -> Result<(), RecipeWriteError> {
    let found: HashSet<i32> = sqlx::query("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&input.tags)
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(|r| r.get::<i32, _>("id"))
        .collect();
    let missing = missing_ids(input.tags.iter().copied(), &found);
    if !missing.is_empty() {
        return Err(RecipeWriteError::UnknownTags(missing));
    }

    let ingredient_ids: Vec<i32> = input.ingredients.iter().map(|i| i.id).collect();
    let found: HashSet<i32> = sqlx::query("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids)
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(|r| r.get::<i32, _>("id"))
        .collect();
    let missing = missing_ids(ingredient_ids.iter().copied(), &found);
    if !missing.is_empty() {
        return Err(RecipeWriteError::UnknownIngredients(missing));
    }

    Ok(())
}

async fn insert_relations(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i32,
    input: &RecipeWriteInput,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::int4[]) AS t(tag_id)
        "#,
    )
    .bind(recipe_id)
    .bind(&input.tags)
    .execute(&mut **tx)
    .await?;

    let (ingredient_ids, amounts): (Vec<i32>, Vec<i32>) = input
        .ingredients
        .iter()
        .map(|line| (line.id, line.amount))
        .unzip();

    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
        FROM UNNEST($2::int4[], $3::int4[]) AS t(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(&ingredient_ids)
    .bind(&amounts)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn missing_ids(requested: impl Iterator<Item = i32>, found: &HashSet<i32>) -> Vec<i32> {
    requested.filter(|id| !found.contains(id)).collect()
}
