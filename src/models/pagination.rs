use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 1-based page request. Page numbers below 1 are treated as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: u64) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    /// Rows to skip. Saturates for absurd page numbers, which then land past
    /// the end and yield an empty page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PageQuery {
    #[schema(value_type = Option<u64>, example = 1)]
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u64>,
}

/// Page numbers that fail to parse fall back to the first page rather than
/// rejecting the request.
pub fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|page| page.trim().parse().ok()))
}

/// One page of an ordered result; `total` counts the whole result.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let pages = total.div_ceil(request.per_page);
        let has_prev = request.page > 1;
        let has_next = request.page < pages;
        Page {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            pages,
            has_prev,
            has_next,
            prev_page: has_prev.then(|| request.page - 1),
            next_page: has_next.then(|| request.page + 1),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Page::new(Vec::new(), request, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            has_prev: self.has_prev,
            has_next: self.has_next,
            prev_page: self.prev_page,
            next_page: self.next_page,
        }
    }
}
