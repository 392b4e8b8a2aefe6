use axum::{
    Json,
    extract::{Path, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};
use axum_extra::extract::Query;
use bytes::Bytes;

use crate::{
    AppState,
    error::AppResult,
    middleware::{AuthUser, OptionalAuthUser},
    models::{ListRecipesQuery, Paginated, RecipeDto, RecipeSummary, RecipeWriteInput},
};

pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<RecipeWriteInput>,
) -> AppResult<(StatusCode, Json<RecipeDto>)> {
    let response = state.recipe_service.create(user_id, input).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RecipeDto>> {
    let response = state.recipe_service.get(id, viewer).await?;

    Ok(Json(response))
}

// `tags` may repeat, so this uses the multi-value query extractor.
pub async fn list_recipes(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<ListRecipesQuery>,
) -> AppResult<Json<Paginated<RecipeDto>>> {
    let response = state.recipe_service.list(query, viewer).await?;

    Ok(Json(response))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
    Json(input): Json<RecipeWriteInput>,
) -> AppResult<Json<RecipeDto>> {
    let response = state.recipe_service.update(id, user_id, input).await?;

    Ok(Json(response))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.recipe_service.delete(id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<RecipeSummary>)> {
    let summary = state.recipe_service.add_favorite(id, user_id).await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.recipe_service.remove_favorite(id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<RecipeSummary>)> {
    let summary = state.recipe_service.add_to_cart(id, user_id).await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.recipe_service.remove_from_cart(id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<impl IntoResponse> {
    let file = state.shopping_list_service.download(user_id).await?;

    let disposition = attachment_disposition(&file.filename);

    Ok((
        [
            (CONTENT_TYPE, "text/plain".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(file.body),
    ))
}

/// `Content-Disposition` for a download: an ASCII `filename` fallback plus
/// the exact name as RFC 6266 `filename*`.
fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_ascii_filename_disposition() {
        assert_eq!(
            attachment_disposition("anna_050320240907_shopping_list.txt"),
            "attachment; filename=\"anna_050320240907_shopping_list.txt\"; \
             filename*=UTF-8''anna_050320240907_shopping_list.txt"
        );
    }

    #[test]
    fn test_non_ascii_filename_is_encoded() {
        let disposition = attachment_disposition("Анна_1_050320240907_shopping_list.txt");

        assert!(disposition.is_ascii());
        assert!(disposition.contains("filename=\"____1_050320240907_shopping_list.txt\""));
        assert!(disposition.contains(
            "filename*=UTF-8''%D0%90%D0%BD%D0%BD%D0%B0_1_050320240907_shopping_list.txt"
        ));
        HeaderValue::from_str(&disposition).expect("disposition should be a valid header value");
    }
}
