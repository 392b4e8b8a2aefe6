use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery {
    pub fn resolve(&self, default_size: i64) -> AppResult<Page> {
        resolve_page(self.page, self.limit, default_size)
    }
}

pub fn resolve_page(page: Option<i64>, limit: Option<i64>, default_size: i64) -> AppResult<Page> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }

    let limit = limit.unwrap_or(default_size);
    if limit < 1 {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }
    let limit = limit.min(MAX_PAGE_SIZE);

    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::Validation("page is out of range".to_string()))?;

    Ok(Page { limit, offset })
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn test_defaults_to_first_page() {
        let page = PageQuery::default().resolve(6).expect("default page should resolve");
        assert_eq!(page, Page { limit: 6, offset: 0 });
    }

    #[test]
    fn test_offset_follows_page_number() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(10),
        };
        let page = query.resolve(6).expect("page should resolve");
        assert_eq!(page, Page { limit: 10, offset: 20 });
    }

    #[test]
    fn test_limit_is_capped() {
        let page = resolve_page(Some(1), Some(10_000), 6).expect("page should resolve");
        assert_eq!(page.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        assert_err!(resolve_page(Some(0), None, 6));
        assert_err!(resolve_page(None, Some(0), 6));
        assert_err!(resolve_page(Some(-2), Some(5), 6));
    }

    #[test]
    fn test_huge_page_is_out_of_range() {
        let error = assert_err!(resolve_page(Some(i64::MAX), Some(100), 6));
        assert!(matches!(error, AppError::Validation(msg) if msg == "page is out of range"));

        let page = resolve_page(Some(i64::MAX), Some(1), 6).expect("largest offset should fit");
        assert_eq!(page.offset, i64::MAX - 1);
    }

    #[test]
    fn test_paginated_serialization() {
        let paginated = Paginated {
            count: 2,
            results: vec![1, 2],
        };
        let json = serde_json::to_string(&paginated).expect("serialization should succeed");
        assert_eq!(json, r#"{"count":2,"results":[1,2]}"#);
    }
}
