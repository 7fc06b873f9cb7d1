//! Offset pagination shared by stores and query services.

use serde::{Deserialize, Serialize};

/// Offset/limit window over an ordered enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of matching records to skip (0-based).
    pub offset: u64,
    /// Maximum number of records to return.
    pub limit: u64,
}

impl PageRequest {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Window for a 1-based page number. Page `0` is treated as page `1`.
    pub fn for_page(page: u64, page_size: u64) -> Self {
        let page = page.max(1);
        Self {
            offset: (page - 1).saturating_mul(page_size),
            limit: page_size,
        }
    }
}

/// One page of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matching records across all pages.
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let has_more = total > request.offset.saturating_add(items.len() as u64);
        Self {
            items,
            total,
            offset: request.offset,
            limit: request.limit,
            has_more,
        }
    }

    /// Cut a page out of an already filtered and ordered sequence.
    pub fn from_ordered(all: impl IntoIterator<Item = T>, request: PageRequest) -> Self {
        let all: Vec<T> = all.into_iter().collect();
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(request.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(request.limit).unwrap_or(usize::MAX))
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
            has_more: self.has_more,
        }
    }
}
