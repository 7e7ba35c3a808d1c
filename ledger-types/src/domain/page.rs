//! Pagination window for history queries.

/// Page size used when the caller gives none (or a non-positive one).
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Larger requested page sizes are capped to this.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A normalized `LIMIT`/`OFFSET` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(l) if l > 0 => l,
            _ => DEFAULT_PAGE_SIZE,
        };
        let offset = offset.unwrap_or(0).max(0);
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
