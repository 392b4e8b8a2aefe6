mod ingredient;
mod membership;
mod pagination;
mod recipe;
mod shopping;
mod tag;
mod user;

pub use ingredient::*;
pub use membership::*;
pub use pagination::*;
pub use recipe::*;
pub use shopping::*;
pub use tag::*;
pub use user::*;
