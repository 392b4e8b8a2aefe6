mod cart;
mod favorite;
mod ingredient;
mod recipe;
mod subscription;
mod tag;
mod user;

pub use cart::CartRepository;
pub use favorite::FavoriteRepository;
pub use ingredient::IngredientRepository;
pub use recipe::{RecipeRepository, RecipeWriteError};
pub use subscription::SubscriptionRepository;
pub use tag::TagRepository;
pub use user::UserRepository;
