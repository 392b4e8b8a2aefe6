use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

/// One catalog entry as it appears in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IngredientSearchQuery {
    pub name: Option<String>,
}

impl IngredientSearchQuery {
    /// Trimmed name prefix, `None` when blank.
    pub fn prefix(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
    }
}
