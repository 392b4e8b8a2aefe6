use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::{Tag, UserProfile};

pub const MAX_RECIPE_NAME_LEN: usize = 200;
pub const MAX_SMALL_POSITIVE: i32 = 32767;

#[derive(Debug, Clone, FromRow)]
pub struct RecipeWithAuthor {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: OffsetDateTime,
    pub author_email: String,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
}

/// A recipe's ingredient line joined with the catalog entry.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeIngredientLine {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: i32,
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<RecipeTagRow> for Tag {
    fn from(row: RecipeTagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientAmountDto {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredientLine> for IngredientAmountDto {
    fn from(line: RecipeIngredientLine) -> Self {
        Self {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        }
    }
}

/// Full read shape of a recipe for one caller.
#[derive(Debug, Serialize)]
pub struct RecipeDto {
    pub id: i32,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientAmountDto>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Per-caller state attached to a recipe when it is read back.
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewerFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub author_subscribed: bool,
}

impl RecipeDto {
    pub fn assemble(
        recipe: RecipeWithAuthor,
        tags: Vec<Tag>,
        ingredients: Vec<IngredientAmountDto>,
        flags: ViewerFlags,
    ) -> Self {
        Self {
            id: recipe.id,
            tags,
            author: UserProfile {
                email: recipe.author_email,
                id: recipe.author_id,
                username: recipe.author_username,
                first_name: recipe.author_first_name,
                last_name: recipe.author_last_name,
                is_subscribed: flags.author_subscribed,
            },
            ingredients,
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Short recipe card returned by favorite and cart toggles and inside subscriptions.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecipeSummary {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&RecipeWithAuthor> for RecipeSummary {
    fn from(recipe: &RecipeWithAuthor) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmountInput {
    pub id: i32,
    pub amount: i32,
}

/// Body of a recipe create or update.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeWriteInput {
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmountInput>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRecipesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub author: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

/// Resolved recipe listing filter. Viewer-relative filters carry the viewer id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i32>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
}

impl ListRecipesQuery {
    /// Builds the filter for `viewer`; flag filters are dropped for anonymous callers.
    pub fn filter_for(&self, viewer: Option<i32>) -> RecipeFilter {
        let favorited_by = viewer.filter(|_| is_truthy(self.is_favorited.as_deref()));
        let in_cart_of = viewer.filter(|_| is_truthy(self.is_in_shopping_cart.as_deref()));

        RecipeFilter {
            author_id: self.author,
            tag_slugs: self
                .tags
                .iter()
                .map(|slug| slug.trim())
                .filter(|slug| !slug.is_empty())
                .map(str::to_string)
                .collect(),
            favorited_by,
            in_cart_of,
        }
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some("1") | Some("true") | Some("True")
    )
}
