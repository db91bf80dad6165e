//! Offset pagination for the full history view.

/// One page of a result set of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based page index.
    pub index: usize,
    /// Rows per page (never zero).
    pub size: usize,
    /// Total rows available.
    pub total: u64,
}

impl PageWindow {
    /// Create a window. A zero page size is treated as one.
    pub fn new(index: usize, size: usize, total: u64) -> Self {
        Self {
            index,
            size: size.max(1),
            total,
        }
    }

    /// Row offset of the first entry on this page. Saturates for absurd
    /// page indexes.
    pub fn offset(&self) -> u64 {
        (self.index as u64).saturating_mul(self.size as u64)
    }

    /// `ceil(total / size)`; zero for an empty result set.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.size as u64)
    }

    /// Whether a previous page exists.
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// Whether a next page exists.
    pub fn has_next(&self) -> bool {
        (self.index as u64)
            .saturating_add(1)
            .saturating_mul(self.size as u64)
            < self.total
    }

    /// One-based page number for display.
    pub fn display_page(&self) -> u64 {
        (self.index as u64).saturating_add(1)
    }

    /// Zero-based index of the following page.
    pub fn next_index(&self) -> usize {
        self.index.saturating_add(1)
    }

    /// Page count for display; an empty history still shows one page.
    pub fn display_total_pages(&self) -> u64 {
        self.total_pages().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(PageWindow::new(0, 50, 120).total_pages(), 3);
        assert_eq!(PageWindow::new(0, 50, 100).total_pages(), 2);
        assert_eq!(PageWindow::new(0, 50, 1).total_pages(), 1);
        assert_eq!(PageWindow::new(0, 50, 0).total_pages(), 0);
    }

    #[test]
    fn test_navigation_bounds() {
        let first = PageWindow::new(0, 50, 120);
        assert!(!first.has_previous());
        assert!(first.has_next());

        let middle = PageWindow::new(1, 50, 120);
        assert!(middle.has_previous());
        assert!(middle.has_next());

        let last = PageWindow::new(2, 50, 120);
        assert!(last.has_previous());
        assert!(!last.has_next());
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_page() {
        let page = PageWindow::new(1, 50, 100);
        assert!(!page.has_next());
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageWindow::new(0, 50, 120).offset(), 0);
        assert_eq!(PageWindow::new(2, 50, 120).offset(), 100);
    }

    #[test]
    fn test_empty_history_display() {
        let page = PageWindow::new(0, 50, 0);
        assert_eq!(page.display_page(), 1);
        assert_eq!(page.display_total_pages(), 1);
        assert!(!page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_huge_page_index_saturates() {
        let page = PageWindow::new(usize::MAX, 50, 120);
        assert_eq!(page.offset(), u64::MAX);
        assert!(page.has_previous());
        assert!(!page.has_next());
        assert!(page.display_page() >= usize::MAX as u64);
        assert_eq!(page.next_index(), usize::MAX);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let page = PageWindow::new(0, 0, 3);
        assert_eq!(page.size, 1);
        assert_eq!(page.total_pages(), 3);
    }
}
