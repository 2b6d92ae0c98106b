//! Pagination primitives shared by the store and the query layer.

use serde::Serialize;

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Creates a page request. Page 0 is read as page 1.
    ///
    /// Returns `None` when `page_size` is zero.
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Option<Self> {
        if page_size == 0 {
            return None;
        }
        let page = if page == 0 { 1 } else { page };
        Some(Self { page, page_size })
    }

    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn page_size(self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

/// One page of results plus the totals needed to render a paginator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            data,
            page: request.page(),
            page_size: request.page_size(),
            total_pages: total_items.div_ceil(u64::from(request.page_size())),
            total_items,
        }
    }

    /// Slices an already-materialized, fully ordered list.
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let data = all
            .into_iter()
            .skip(skip)
            .take(request.page_size() as usize)
            .collect();
        Self::new(data, request, total_items)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(PageRequest::new(1, 0).is_none());
    }

    #[test]
    fn zero_page_reads_as_first() {
        let request = PageRequest::new(0, 10).unwrap();
        assert_eq!(request.page(), 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn offset_for_later_pages() {
        assert_eq!(PageRequest::new(3, 25).unwrap().offset(), 50);
    }

    #[test]
    fn total_pages_rounds_up() {
        let request = PageRequest::new(1, 10).unwrap();
        assert_eq!(Page::<u8>::new(vec![], request, 0).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], request, 10).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], request, 11).total_pages, 2);
    }

    #[test]
    fn page_past_the_end_is_empty_with_totals() {
        let request = PageRequest::new(5, 2).unwrap();
        let page = Page::from_all(vec![1, 2, 3], request);
        assert!(page.data.is_empty());
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 5);
    }

    #[test]
    fn from_all_slices() {
        let request = PageRequest::new(2, 2).unwrap();
        let page = Page::from_all(vec![1, 2, 3, 4, 5], request);
        assert_eq!(page.data, vec![3, 4]);
    }
}
