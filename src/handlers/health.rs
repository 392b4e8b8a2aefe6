use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Health check could not reach the database"))
        .is_ok();

    let (status, report) = if database_ok {
        (StatusCode::OK, ("ok", "healthy"))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ("error", "unhealthy"))
    };

    (
        status,
        Json(HealthReport {
            status: report.0,
            database: report.1,
            service: "foodgram",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
