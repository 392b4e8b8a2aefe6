use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{
        IngredientAmountDto, ListRecipesQuery, MAX_RECIPE_NAME_LEN, MAX_SMALL_POSITIVE, Paginated,
        RecipeDto, RecipeSummary, RecipeWithAuthor, RecipeWriteInput, Tag, ViewerFlags,
        resolve_page,
    },
    repository::{
        CartRepository, FavoriteRepository, RecipeRepository, RecipeWriteError,
        SubscriptionRepository,
    },
    telemetry::{
        CART_ENTRIES_ADDED, CART_ENTRIES_REMOVED, FAVORITES_ADDED, FAVORITES_REMOVED,
        RECIPES_CREATED, RECIPES_DELETED, RECIPES_UPDATED,
    },
};

use super::toggle::{added, removed};

#[derive(Clone)]
pub struct RecipeService {
    recipe_repo: RecipeRepository,
    favorite_repo: FavoriteRepository,
    cart_repo: CartRepository,
    subscription_repo: SubscriptionRepository,
    default_page_size: i64,
}

impl RecipeService {
    pub fn new(
        recipe_repo: RecipeRepository,
        favorite_repo: FavoriteRepository,
        cart_repo: CartRepository,
        subscription_repo: SubscriptionRepository,
        default_page_size: i64,
    ) -> Self {
        Self {
            recipe_repo,
            favorite_repo,
            cart_repo,
            subscription_repo,
            default_page_size,
        }
    }

    #[instrument(name = "recipe.create", skip(self, input))]
    pub async fn create(&self, author_id: i32, input: RecipeWriteInput) -> AppResult<RecipeDto> {
        validate_recipe_input(&input)?;

        let recipe_id = self
            .recipe_repo
            .create(author_id, &input)
            .await
            .map_err(write_error)?;

        RECIPES_CREATED.add(1, &[]);

        tracing::info!(recipe_id, author_id, "Recipe created");

        self.get(recipe_id, Some(author_id)).await
    }

    #[instrument(name = "recipe.get", skip(self))]
    pub async fn get(&self, id: i32, viewer: Option<i32>) -> AppResult<RecipeDto> {
        let recipe = self.find(id).await?;

        self.assemble(vec![recipe], viewer)
            .await?
            .pop()
            .ok_or(AppError::Internal("Failed to assemble recipe".to_string()))
    }

    #[instrument(name = "recipe.list", skip(self))]
    pub async fn list(
        &self,
        query: ListRecipesQuery,
        viewer: Option<i32>,
    ) -> AppResult<Paginated<RecipeDto>> {
        let page = resolve_page(query.page, query.limit, self.default_page_size)?;
        let filter = query.filter_for(viewer);

        let recipes = self.recipe_repo.list(&filter, page.limit, page.offset).await?;
        let count = self.recipe_repo.count(&filter).await?;

        Ok(Paginated {
            count,
            results: self.assemble(recipes, viewer).await?,
        })
    }

    /// Full replacement of the recipe's fields, tags and ingredient lines.
    #[instrument(name = "recipe.update", skip(self, input))]
    pub async fn update(&self, id: i32, user_id: i32, input: RecipeWriteInput) -> AppResult<RecipeDto> {
        let recipe = self.find(id).await?;

        if recipe.author_id != user_id {
            return Err(AppError::Forbidden);
        }

        validate_recipe_input(&input)?;

        self.recipe_repo
            .update(recipe.id, &input)
            .await
            .map_err(write_error)?;

        RECIPES_UPDATED.add(1, &[]);

        tracing::info!(recipe_id = recipe.id, "Recipe updated");

        self.get(recipe.id, Some(user_id)).await
    }

    #[instrument(name = "recipe.delete", skip(self))]
    pub async fn delete(&self, id: i32, user_id: i32) -> AppResult<()> {
        let recipe = self.find(id).await?;

        if recipe.author_id != user_id {
            return Err(AppError::Forbidden);
        }

        self.recipe_repo.delete(recipe.id).await?;

        RECIPES_DELETED.add(1, &[]);

        tracing::info!(recipe_id = recipe.id, "Recipe deleted");

        Ok(())
    }

    #[instrument(name = "recipe.add_favorite", skip(self))]
    pub async fn add_favorite(&self, id: i32, user_id: i32) -> AppResult<RecipeSummary> {
        let recipe = self.find(id).await?;

        added(
            self.favorite_repo
                .create(user_id, recipe.id)
                .await
                .map_err(missing_recipe_as_not_found)?,
            "Recipe is already in favorites",
        )?;

        FAVORITES_ADDED.add(1, &[]);
        tracing::info!(recipe_id = recipe.id, user_id, "Recipe favorited");

        Ok(RecipeSummary::from(&recipe))
    }

    #[instrument(name = "recipe.remove_favorite", skip(self))]
    pub async fn remove_favorite(&self, id: i32, user_id: i32) -> AppResult<()> {
        let recipe = self.find(id).await?;

        removed(
            self.favorite_repo.delete(user_id, recipe.id).await?,
            "Recipe is not in favorites",
        )?;

        FAVORITES_REMOVED.add(1, &[]);
        tracing::info!(recipe_id = recipe.id, user_id, "Recipe unfavorited");

        Ok(())
    }

    #[instrument(name = "recipe.add_to_cart", skip(self))]
    pub async fn add_to_cart(&self, id: i32, user_id: i32) -> AppResult<RecipeSummary> {
        let recipe = self.find(id).await?;

        added(
            self.cart_repo
                .create(user_id, recipe.id)
                .await
                .map_err(missing_recipe_as_not_found)?,
            "Recipe is already in the shopping cart",
        )?;

        CART_ENTRIES_ADDED.add(1, &[]);
        tracing::info!(recipe_id = recipe.id, user_id, "Recipe added to shopping cart");

        Ok(RecipeSummary::from(&recipe))
    }

    #[instrument(name = "recipe.remove_from_cart", skip(self))]
    pub async fn remove_from_cart(&self, id: i32, user_id: i32) -> AppResult<()> {
        let recipe = self.find(id).await?;

        removed(
            self.cart_repo.delete(user_id, recipe.id).await?,
            "Recipe is not in the shopping cart",
        )?;

        CART_ENTRIES_REMOVED.add(1, &[]);
        tracing::info!(recipe_id = recipe.id, user_id, "Recipe removed from shopping cart");

        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<RecipeWithAuthor> {
        self.recipe_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Recipe not found".to_string()))
    }

    /// Attaches tags, ingredient lines and the viewer's flags, keeping input order.
    async fn assemble(
        &self,
        recipes: Vec<RecipeWithAuthor>,
        viewer: Option<i32>,
    ) -> AppResult<Vec<RecipeDto>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

        let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
        for row in self.recipe_repo.tags_for(&recipe_ids).await? {
            tags.entry(row.recipe_id).or_default().push(Tag::from(row));
        }

        let mut ingredients: HashMap<i32, Vec<IngredientAmountDto>> = HashMap::new();
        for line in self.recipe_repo.ingredients_for(&recipe_ids).await? {
            ingredients
                .entry(line.recipe_id)
                .or_default()
                .push(IngredientAmountDto::from(line));
        }

        let (favorited, in_cart, followed) = match viewer {
            Some(uid) => {
                let author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
                (
                    to_set(self.favorite_repo.favorited_among(uid, &recipe_ids).await?),
                    to_set(self.cart_repo.in_cart_among(uid, &recipe_ids).await?),
                    to_set(self.subscription_repo.followed_among(uid, &author_ids).await?),
                )
            }
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        Ok(recipes
            .into_iter()
            .map(|recipe| {
                let flags = ViewerFlags {
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    author_subscribed: followed.contains(&recipe.author_id),
                };
                let recipe_tags = tags.remove(&recipe.id).unwrap_or_default();
                let recipe_ingredients = ingredients.remove(&recipe.id).unwrap_or_default();
                RecipeDto::assemble(recipe, recipe_tags, recipe_ingredients, flags)
            })
            .collect())
    }
}

/// Structural checks run before a recipe write touches the store.
pub fn validate_recipe_input(input: &RecipeWriteInput) -> AppResult<()> {
    if input.tags.is_empty() {
        return Err(AppError::Validation("At least one tag is required".to_string()));
    }
    let mut seen_tags = HashSet::new();
    for tag in &input.tags {
        if !seen_tags.insert(*tag) {
            return Err(AppError::Validation(format!("Tag {tag} is listed more than once")));
        }
    }

    if input.ingredients.is_empty() {
        return Err(AppError::Validation(
            "At least one ingredient is required".to_string(),
        ));
    }
    let mut seen_ingredients = HashSet::new();
    for line in &input.ingredients {
        if !seen_ingredients.insert(line.id) {
            return Err(AppError::Validation(format!(
                "Ingredient {} is listed more than once",
                line.id
            )));
        }
        if !(1..=MAX_SMALL_POSITIVE).contains(&line.amount) {
            return Err(AppError::Validation(format!(
                "Amount of ingredient {} must be between 1 and {MAX_SMALL_POSITIVE}",
                line.id
            )));
        }
    }

    if !(1..=MAX_SMALL_POSITIVE).contains(&input.cooking_time) {
        return Err(AppError::Validation(format!(
            "Cooking time must be between 1 and {MAX_SMALL_POSITIVE} minutes"
        )));
    }

    if input.name.trim().is_empty() || input.name.chars().count() > MAX_RECIPE_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be between 1 and {MAX_RECIPE_NAME_LEN} characters"
        )));
    }
    if input.text.trim().is_empty() {
        return Err(AppError::Validation("Text is required".to_string()));
    }
    if input.image.trim().is_empty() {
        return Err(AppError::Validation("Image is required".to_string()));
    }

    Ok(())
}

/// A toggle insert racing a recipe delete fails on the foreign key; the caller
/// sees the same outcome as if the recipe had been gone before the lookup.
pub fn missing_recipe_as_not_found(error: sqlx::Error) -> AppError {
    let recipe_gone =
        matches!(&error, sqlx::Error::Database(e) if e.is_foreign_key_violation());

    if recipe_gone {
        AppError::NotFound("Recipe not found".to_string())
    } else {
        AppError::Database(error)
    }
}

fn write_error(error: RecipeWriteError) -> AppError {
    match error {
        RecipeWriteError::UnknownTags(ids) => {
            AppError::Validation(format!("Unknown tags: {ids:?}"))
        }
        RecipeWriteError::UnknownIngredients(ids) => {
            AppError::Validation(format!("Unknown ingredients: {ids:?}"))
        }
        RecipeWriteError::Database(e) => AppError::Database(e),
    }
}

fn to_set(ids: Vec<i32>) -> HashSet<i32> {
    ids.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngredientAmountInput;
    use tokio_test::{assert_err, assert_ok};

    fn valid_input() -> RecipeWriteInput {
        RecipeWriteInput {
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmountInput { id: 10, amount: 5 },
                IngredientAmountInput { id: 11, amount: 200 },
            ],
            name: "Блины".to_string(),
            image: "data:image/png;base64,iVBORw0KGgo".to_string(),
            text: "Смешать и жарить".to_string(),
            cooking_time: 30,
        }
    }

    fn validation_message(input: &RecipeWriteInput) -> String {
        match assert_err!(validate_recipe_input(input)) {
            AppError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert_ok!(validate_recipe_input(&valid_input()));
    }

    #[test]
    fn test_cooking_time_lower_bound() {
        let mut input = valid_input();
        input.cooking_time = 0;
        assert!(validation_message(&input).contains("Cooking time"));

        input.cooking_time = 1;
        assert_ok!(validate_recipe_input(&input));
    }

    #[test]
    fn test_cooking_time_upper_bound() {
        let mut input = valid_input();
        input.cooking_time = MAX_SMALL_POSITIVE + 1;
        assert_err!(validate_recipe_input(&input));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut input = valid_input();
        input.tags = vec![1, 1];
        assert!(validation_message(&input).contains("Tag 1"));
    }

    #[test]
    fn test_missing_tags_rejected() {
        let mut input = valid_input();
        input.tags.clear();
        assert!(validation_message(&input).contains("tag"));
    }

    #[test]
    fn test_duplicate_ingredient_rejected_not_merged() {
        let mut input = valid_input();
        input.ingredients = vec![
            IngredientAmountInput { id: 10, amount: 5 },
            IngredientAmountInput { id: 10, amount: 3 },
        ];
        assert!(validation_message(&input).contains("Ingredient 10"));
    }

    #[test]
    fn test_missing_ingredients_rejected() {
        let mut input = valid_input();
        input.ingredients.clear();
        assert!(validation_message(&input).contains("ingredient"));
    }

    #[test]
    fn test_ingredient_amount_must_be_positive() {
        let mut input = valid_input();
        input.ingredients[1].amount = 0;
        assert!(validation_message(&input).contains("Amount of ingredient 11"));

        input.ingredients[1].amount = 1;
        assert_ok!(validate_recipe_input(&input));
    }

    #[test]
    fn test_name_text_and_image_required() {
        let mut input = valid_input();
        input.name = " ".to_string();
        assert_err!(validate_recipe_input(&input));

        let mut input = valid_input();
        input.name = "x".repeat(MAX_RECIPE_NAME_LEN + 1);
        assert_err!(validate_recipe_input(&input));

        let mut input = valid_input();
        input.text = String::new();
        assert_err!(validate_recipe_input(&input));

        let mut input = valid_input();
        input.image = String::new();
        assert_err!(validate_recipe_input(&input));
    }

    #[test]
    fn test_unknown_references_map_to_validation() {
        let error = write_error(RecipeWriteError::UnknownTags(vec![99]));
        assert!(matches!(error, AppError::Validation(msg) if msg.contains("99")));

        let error = write_error(RecipeWriteError::UnknownIngredients(vec![5, 6]));
        assert!(matches!(error, AppError::Validation(msg) if msg.contains("[5, 6]")));
    }

    #[test]
    fn test_other_store_errors_stay_database_errors() {
        let error = missing_recipe_as_not_found(sqlx::Error::RowNotFound);
        assert!(matches!(error, AppError::Database(sqlx::Error::RowNotFound)));
    }
}
