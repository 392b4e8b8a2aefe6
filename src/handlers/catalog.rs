use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    error::AppResult,
    models::{Ingredient, IngredientSearchQuery, Tag},
};

pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(state.catalog_service.list_tags().await?))
}

pub async fn get_tag(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Tag>> {
    Ok(Json(state.catalog_service.get_tag(id).await?))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientSearchQuery>,
) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(state.catalog_service.search_ingredients(&query).await?))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Ingredient>> {
    Ok(Json(state.catalog_service.get_ingredient(id).await?))
}
