/// Pagination envelope shared by all listing endpoints
///
/// Every listing in BookRelay is paged and returns the same envelope:
/// the page content plus enough metadata for a client to render a
/// pager without issuing a count query of its own.
///
/// # Example
///
/// ```
/// use bookrelay_shared::pagination::{Page, PageRequest};
///
/// let request = PageRequest::new(0, 10);
/// assert_eq!(request.offset(), 0);
///
/// let page = Page::new(vec!["a", "b"], &request, 12);
/// assert_eq!(page.total_pages, 2);
/// assert!(page.first);
/// assert!(!page.last);
/// ```

use serde::{Deserialize, Serialize};

/// Default page size when a request does not specify one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on page size, to keep result sets bounded
pub const MAX_PAGE_SIZE: i64 = 100;

/// A sanitized page request
///
/// Page numbers are zero-based. Construction clamps the size into
/// `1..=MAX_PAGE_SIZE` and the page number to be non-negative, so a
/// `PageRequest` is always safe to turn into LIMIT/OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page number
    pub page: i64,

    /// Number of rows per page
    pub size: i64,
}

impl PageRequest {
    /// Creates a page request, clamping out-of-range values
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.max(0),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Row offset for this page
    pub fn offset(&self) -> i64 {
        self.page * self.size
    }

    /// Row limit for this page
    pub fn limit(&self) -> i64 {
        self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results with pager metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The rows on this page
    pub content: Vec<T>,

    /// Zero-based page number
    pub number: i64,

    /// Requested page size
    pub size: i64,

    /// Total rows across all pages
    pub total_elements: i64,

    /// Total number of pages
    pub total_pages: i64,

    /// Whether this is the first page
    pub first: bool,

    /// Whether this is the last page
    pub last: bool,
}

impl<T> Page<T> {
    /// Builds a page envelope from one page of rows and the total count
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + request.size - 1) / request.size
        };

        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: request.page + 1 >= total_pages,
        }
    }

    /// Maps page content while preserving the pager metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(-3, 0);
        assert_eq!(request.page, 0);
        assert_eq!(request.size, 1);

        let request = PageRequest::new(2, 10_000);
        assert_eq!(request.size, MAX_PAGE_SIZE);
        assert_eq!(request.offset(), 2 * MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_math() {
        let request = PageRequest::new(0, 10);
        let page = Page::new(vec![1, 2, 3], &request, 3);
        assert_eq!(page.total_pages, 1);
        assert!(page.first);
        assert!(page.last);

        let request = PageRequest::new(1, 10);
        let page = Page::new((0..10).collect(), &request, 25);
        assert_eq!(page.total_pages, 3);
        assert!(!page.first);
        assert!(!page.last);

        let request = PageRequest::new(2, 10);
        let page = Page::new(vec![0; 5], &request, 25);
        assert!(page.last);
    }

    #[test]
    fn test_empty_page() {
        let request = PageRequest::default();
        let page: Page<i32> = Page::new(vec![], &request, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
    }

    #[test]
    fn test_map_preserves_metadata() {
        let request = PageRequest::new(0, 2);
        let page = Page::new(vec![1, 2], &request, 5).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20]);
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
    }
}
