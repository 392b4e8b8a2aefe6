use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::AppResult,
    middleware::AuthUser,
    models::{LoginInput, RegisterInput, RegisteredUser, TokenResponse},
};

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<RegisteredUser>)> {
    let user = state.auth_service.register(input).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.auth_service.login(input).await?;

    Ok(Json(token))
}

// Tokens are stateless; logging out only requires a valid one.
pub async fn logout(AuthUser(user_id): AuthUser) -> StatusCode {
    tracing::info!(user_id, "User logged out");

    StatusCode::NO_CONTENT
}
