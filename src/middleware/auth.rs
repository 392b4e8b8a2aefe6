use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::AppError};

/// Caller identity for endpoints that require an authenticated user.
pub struct AuthUser(pub i32);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts, state).await?;
        let user_id = state.auth_service.validate_token(&token)?;
        Ok(AuthUser(user_id))
    }
}

/// Caller identity for endpoints that also serve anonymous visitors.
/// A missing or unusable token means anonymous.
pub struct OptionalAuthUser(pub Option<i32>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = match extract_token(parts, state).await {
            Ok(token) => state.auth_service.validate_token(&token).ok(),
            Err(_) => None,
        };
        Ok(OptionalAuthUser(user_id))
    }
}

async fn extract_token(parts: &mut Parts, state: &AppState) -> Result<String, AppError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

    Ok(bearer.token().to_string())
}
