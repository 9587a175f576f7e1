//! # Pagination
//!
//! Zero-based page requests and the page envelope returned by list
//! endpoints. Out-of-range sizes are clamped rather than rejected.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters of a paged list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page, `1..=100`.
    #[serde(default)]
    pub size: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
        }
    }

    /// Effective zero-based page index.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    /// Effective page size after defaulting and clamping.
    pub fn size(&self) -> u32 {
        self.size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Slice an already ordered collection into the requested page.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let page = self.page();
        let size = self.size();
        let total_elements = items.len() as u64;
        let total_pages = total_elements.div_ceil(u64::from(size)) as u32;
        let skip = (page as usize).saturating_mul(size as usize);
        let items = items.into_iter().skip(skip).take(size as usize).collect();
        Page {
            items,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Transform every item while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
