use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppResult,
    middleware::{AuthUser, OptionalAuthUser},
    models::{PageQuery, Paginated, SubscriptionCard, SubscriptionsQuery, UserProfile},
};

pub async fn list_users(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Paginated<UserProfile>>> {
    let response = state.user_service.list(query, viewer).await?;

    Ok(Json(response))
}

pub async fn get_user(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserProfile>> {
    let response = state.user_service.get(id, viewer).await?;

    Ok(Json(response))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserProfile>> {
    let response = state.user_service.me(user_id).await?;

    Ok(Json(response))
}

pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<i32>,
    Query(query): Query<SubscriptionsQuery>,
) -> AppResult<(StatusCode, Json<SubscriptionCard>)> {
    let card = state
        .user_service
        .subscribe(user_id, author_id, query.recipes_limit)
        .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.user_service.unsubscribe(user_id, author_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<SubscriptionsQuery>,
) -> AppResult<Json<Paginated<SubscriptionCard>>> {
    let response = state.user_service.subscriptions(user_id, query).await?;

    Ok(Json(response))
}
