pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;

pub use config::Config;

use repository::{
    CartRepository, FavoriteRepository, IngredientRepository, RecipeRepository,
    SubscriptionRepository, TagRepository, UserRepository,
};
use services::{AuthService, CatalogService, RecipeService, ShoppingListService, UserService};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub catalog_service: CatalogService,
    pub recipe_service: RecipeService,
    pub shopping_list_service: ShoppingListService,
}

impl AppState {
    /// Wires repositories and services over a shared pool.
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let user_repo = UserRepository::new(pool.clone());
        let recipe_repo = RecipeRepository::new(pool.clone());
        let favorite_repo = FavoriteRepository::new(pool.clone());
        let cart_repo = CartRepository::new(pool.clone());
        let subscription_repo = SubscriptionRepository::new(pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), config);
        let user_service = UserService::new(
            user_repo.clone(),
            subscription_repo.clone(),
            recipe_repo.clone(),
            config.default_page_size,
        );
        let catalog_service = CatalogService::new(
            TagRepository::new(pool.clone()),
            IngredientRepository::new(pool.clone()),
        );
        let recipe_service = RecipeService::new(
            recipe_repo,
            favorite_repo,
            cart_repo.clone(),
            subscription_repo,
            config.default_page_size,
        );
        let shopping_list_service = ShoppingListService::new(cart_repo, user_repo);

        Self {
            pool,
            auth_service,
            user_service,
            catalog_service,
            recipe_service,
            shopping_list_service,
        }
    }
}
