use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};

use crate::{AppState, handlers, telemetry::track_http_metrics};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/auth/token/login", post(handlers::login))
        .route("/api/auth/token/logout", post(handlers::logout))
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::register),
        )
        .route("/api/users/me", get(handlers::me))
        .route("/api/users/subscriptions", get(handlers::subscriptions))
        .route("/api/users/{id}", get(handlers::get_user))
        .route(
            "/api/users/{id}/subscribe",
            post(handlers::subscribe).delete(handlers::unsubscribe),
        )
        .route("/api/tags", get(handlers::list_tags))
        .route("/api/tags/{id}", get(handlers::get_tag))
        .route("/api/ingredients", get(handlers::list_ingredients))
        .route("/api/ingredients/{id}", get(handlers::get_ingredient))
        .route(
            "/api/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(handlers::download_shopping_cart),
        )
        .route(
            "/api/recipes/{id}",
            get(handlers::get_recipe)
                .patch(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(handlers::add_to_cart).delete(handlers::remove_from_cart),
        )
        .route_layer(from_fn(track_http_metrics))
        .with_state(state)
}
