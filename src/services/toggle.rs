//! Absent/present transitions shared by favorites, the shopping cart and
//! subscriptions: adding a present pair conflicts, removing an absent one is
//! not found.

use crate::error::{AppError, AppResult};

pub fn added<T>(created: Option<T>, already_present: &str) -> AppResult<T> {
    created.ok_or_else(|| AppError::Conflict(already_present.to_string()))
}

pub fn removed(deleted: bool, not_present: &str) -> AppResult<()> {
    if deleted {
        Ok(())
    } else {
        Err(AppError::NotFound(not_present.to_string()))
    }
}
