//! Page-number pagination used by every listing query.
//!
//! Pages are 1-based. A `page_size` of zero means "no limit", in which case
//! nothing is skipped and every row is returned.

use serde::Deserialize;

/// Requested page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub page_num: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_num: usize, page_size: usize) -> Self {
        Self {
            page_num,
            page_size,
        }
    }

    /// Every row on a single page.
    pub fn unbounded() -> Self {
        Self::new(1, 0)
    }

    /// Rows to skip: `page_size * (page_num - 1)`. Page 0 is treated as page 1.
    pub fn skip(&self) -> usize {
        self.page_size
            .saturating_mul(self.page_num.saturating_sub(1))
    }

    /// Maximum rows to return, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        (self.page_size > 0).then_some(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_skips_nothing() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.skip(), 0);
        assert_eq!(p.limit(), Some(10));
    }

    #[test]
    fn later_pages_skip_preceding_rows() {
        assert_eq!(Pagination::new(3, 10).skip(), 20);
    }

    #[test]
    fn zero_page_size_is_unbounded() {
        let p = Pagination::new(4, 0);
        assert_eq!(p.skip(), 0);
        assert_eq!(p.limit(), None);
    }

    #[test]
    fn page_zero_behaves_like_page_one() {
        assert_eq!(Pagination::new(0, 25).skip(), 0);
    }
}
