//! Page-number pagination.
//!
//! List endpoints return a [`Page`] envelope:
//!
//! ```json
//! {"count": 23, "next": "?page=3", "previous": "?page=1", "results": [...]}
//! ```

use serde::Serialize;

/// Errors that can occur when resolving a page.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// The page parameter is not a positive integer.
    #[error("invalid page: {0:?}")]
    Invalid(String),
    /// The page lies past the last page.
    #[error("page {0} is out of range")]
    OutOfRange(u32),
}

/// A requested page (1-based) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: u32,
    size: u32,
}

impl PageRequest {
    /// Page size used by every paginated listing.
    pub const DEFAULT_SIZE: u32 = 10;

    /// The first page with the default size.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            number: 1,
            size: Self::DEFAULT_SIZE,
        }
    }

    /// Create a page request.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Invalid` if `number` or `size` is zero.
    pub fn new(number: u32, size: u32) -> Result<Self, PageError> {
        if number == 0 || size == 0 {
            return Err(PageError::Invalid(number.to_string()));
        }
        Ok(Self { number, size })
    }

    /// Resolve the raw `?page=` query value with the default page size.
    ///
    /// A missing value means the first page.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Invalid` if the value is not a positive integer.
    pub fn from_query(raw: Option<&str>) -> Result<Self, PageError> {
        let Some(raw) = raw else {
            return Ok(Self::first());
        };

        let number = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| PageError::Invalid(raw.to_owned()))?;
        Self::new(number, Self::DEFAULT_SIZE)
    }

    /// 1-based page number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Page size.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.size as u64
    }

    /// Number of rows to take.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results plus navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Total number of items across all pages.
    pub count: u64,
    /// Query string of the next page, if any.
    pub next: Option<String>,
    /// Query string of the previous page, if any.
    pub previous: Option<String>,
    /// Items on this page.
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Assemble a page from the rows fetched for `request` and the total count.
    ///
    /// # Errors
    ///
    /// Returns `PageError::OutOfRange` when a page other than the first is
    /// requested past the end of the result set.
    pub fn new(request: PageRequest, count: u64, results: Vec<T>) -> Result<Self, PageError> {
        if request.number > 1 && request.offset() >= count {
            return Err(PageError::OutOfRange(request.number));
        }

        let shown = request.offset() + results.len() as u64;
        let next = (shown < count).then(|| format!("?page={}", request.number + 1));
        let previous = (request.number > 1).then(|| format!("?page={}", request.number - 1));

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }

    /// Convert every item on the page, keeping the navigation links.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_defaults_to_first_page() {
        assert_eq!(PageRequest::from_query(None).unwrap(), PageRequest::first());
    }

    #[test]
    fn test_from_query_rejects_zero_and_garbage() {
        assert!(matches!(
            PageRequest::from_query(Some("0")),
            Err(PageError::Invalid(_))
        ));
        assert!(matches!(
            PageRequest::from_query(Some("last")),
            Err(PageError::Invalid(_))
        ));
    }

    #[test]
    fn test_offset_and_limit() {
        let request = PageRequest::from_query(Some("3")).unwrap();
        assert_eq!(request.offset(), 20);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn test_middle_page_links() {
        let request = PageRequest::new(2, 10).unwrap();
        let page = Page::new(request, 25, (10..20).collect()).unwrap();
        assert_eq!(page.next.as_deref(), Some("?page=3"));
        assert_eq!(page.previous.as_deref(), Some("?page=1"));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let request = PageRequest::new(3, 10).unwrap();
        let page = Page::new(request, 25, (20..25).collect()).unwrap();
        assert_eq!(page.next, None);
        assert_eq!(page.results.len(), 5);
    }

    #[test]
    fn test_empty_first_page_is_valid() {
        let page: Page<u8> = Page::new(PageRequest::first(), 0, vec![]).unwrap();
        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn test_page_past_end_is_out_of_range() {
        let request = PageRequest::new(4, 10).unwrap();
        assert_eq!(
            Page::<u8>::new(request, 30, vec![]),
            Err(PageError::OutOfRange(4))
        );
    }

    #[test]
    fn test_map_keeps_links() {
        let request = PageRequest::new(1, 2).unwrap();
        let page = Page::new(request, 3, vec![1, 2]).unwrap().map(|n| n * 10);
        assert_eq!(page.results, vec![10, 20]);
        assert_eq!(page.next.as_deref(), Some("?page=2"));
    }
}
