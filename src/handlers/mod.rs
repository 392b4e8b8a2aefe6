mod auth;
mod catalog;
mod health;
mod recipes;
mod users;

pub use auth::{login, logout, register};
pub use catalog::{get_ingredient, get_tag, list_ingredients, list_tags};
pub use health::health_check;
pub use recipes::{
    add_favorite, add_to_cart, create_recipe, delete_recipe, download_shopping_cart, get_recipe,
    list_recipes, remove_favorite, remove_from_cart, update_recipe,
};
pub use users::{get_user, list_users, me, subscribe, subscriptions, unsubscribe};
