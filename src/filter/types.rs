use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY term. `column` is always a compile-time constant, never input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOrderInfo {
    pub column: &'static str,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub const fn asc(column: &'static str) -> Self {
        Self { column, sort: SortDirection::Asc }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self { column, sort: SortDirection::Desc }
    }
}

/// 1-based page request, already clamped to the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let api = &crate::config::CONFIG.api;
        let requested = page_size.unwrap_or(api.default_page_size);
        let page_size = if requested > api.max_page_size {
            tracing::debug!("Page size {} exceeds max {}, capping to max", requested, api.max_page_size);
            api.max_page_size
        } else {
            requested.max(1)
        };

        Self {
            page: page.unwrap_or(1).max(1),
            page_size,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    /// More rows exist past this page.
    pub fn is_next(&self, total: i64, returned: usize) -> bool {
        total > self.offset() + returned as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}
