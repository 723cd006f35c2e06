use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config;

/// Query parameters shared by every listing endpoint
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Clamp the raw query to sane bounds: page >= 1, per_page in
    /// 1..=max_per_page, defaults from config.
    pub fn from_query(query: &PageQuery) -> Self {
        let api = &config::config().api;
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(api.default_per_page)
            .clamp(1, api.max_per_page);
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        // Saturating math: an absurd page number yields a huge offset and an
        // empty result set, never an overflow panic or negative OFFSET
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total_rows: i64) -> i64 {
        if total_rows <= 0 {
            return 0;
        }
        (total_rows + self.per_page - 1) / self.per_page
    }
}

/// Listing payload: rows plus the paging summary clients rely on
#[derive(Debug, Serialize)]
pub struct Page {
    pub rows: Vec<Value>,
    pub page: i64,
    pub per_page: i64,
    pub total_rows: i64,
    pub total_pages: i64,
}

impl Page {
    pub fn new(rows: Vec<Value>, pagination: Pagination, total_rows: i64) -> Self {
        Self {
            rows,
            page: pagination.page,
            per_page: pagination.per_page,
            total_rows,
            total_pages: pagination.total_pages(total_rows),
        }
    }
}
