mod auth;
mod catalog;
mod recipe;
mod shopping_list;
mod toggle;
mod user;

pub use auth::{AuthService, Claims, validate_registration};
pub use catalog::CatalogService;
pub use recipe::{RecipeService, missing_recipe_as_not_found, validate_recipe_input};
pub use shopping_list::{ShoppingListService, aggregate, render_report, report_filename};
pub use user::UserService;
