use sqlx::FromRow;
use time::OffsetDateTime;

/// One row of the cart walk. Ingredient columns are `NULL` for a cart recipe
/// with no ingredient lines, so an empty result set means an empty cart.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub recipe_id: i32,
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
    pub amount: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    EmptyCart,
    Items(Vec<ShoppingItem>),
}

#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub generated_at: OffsetDateTime,
    pub items: Vec<ShoppingItem>,
}

/// Rendered report ready to be served as a file.
#[derive(Debug, Clone)]
pub struct ShoppingListFile {
    pub filename: String,
    pub body: String,
}
