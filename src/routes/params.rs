use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits in an `i64` at any allowed limit.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn normalize(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }
}

// Paging fields are repeated instead of flattened: serde_urlencoded cannot
// deserialize numbers through `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Page number, default 1
    pub page: Option<i64>,
    /// Items per page, default 10, at most 100
    pub limit: Option<i64>,
    /// Case-insensitive substring of the product name
    pub search: Option<String>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::normalize(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// Page number, default 1
    pub page: Option<i64>,
    /// Items per page, default 10, at most 100
    pub limit: Option<i64>,
    /// Exact status filter
    pub status: Option<String>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::normalize(self.page, self.limit)
    }
}
