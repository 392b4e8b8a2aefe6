use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{Ingredient, IngredientSearchQuery, Tag},
    repository::{IngredientRepository, TagRepository},
};

/// Read-only access to tags and the ingredient catalog.
#[derive(Clone)]
pub struct CatalogService {
    tag_repo: TagRepository,
    ingredient_repo: IngredientRepository,
}

impl CatalogService {
    pub fn new(tag_repo: TagRepository, ingredient_repo: IngredientRepository) -> Self {
        Self {
            tag_repo,
            ingredient_repo,
        }
    }

    #[instrument(name = "catalog.list_tags", skip(self))]
    pub async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        Ok(self.tag_repo.list().await?)
    }

    #[instrument(name = "catalog.get_tag", skip(self))]
    pub async fn get_tag(&self, id: i32) -> AppResult<Tag> {
        self.tag_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Tag not found".to_string()))
    }

    #[instrument(name = "catalog.search_ingredients", skip(self))]
    pub async fn search_ingredients(&self, query: &IngredientSearchQuery) -> AppResult<Vec<Ingredient>> {
        Ok(self.ingredient_repo.search(query.prefix()).await?)
    }

    #[instrument(name = "catalog.get_ingredient", skip(self))]
    pub async fn get_ingredient(&self, id: i32) -> AppResult<Ingredient> {
        self.ingredient_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Ingredient not found".to_string()))
    }
}
