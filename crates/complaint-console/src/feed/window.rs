//! Accumulated view over a server-paginated collection

use complaint_client::{Complaint, Paginated, UserSummary};

/// Pages fetched so far, concatenated in arrival order.
///
/// Pagination numbers always come from the last server response; nothing
/// is computed locally. Overlapping pages are kept as returned.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow<T> {
    current_page: u64,
    page_size: u64,
    total_items: u64,
    total_pages: u64,
    items: Vec<T>,
    loaded: bool,
}

impl<T> PageWindow<T> {
    pub fn new(page_size: u64) -> Self {
        Self {
            current_page: 0,
            page_size,
            total_items: 0,
            total_pages: 0,
            items: Vec::new(),
            loaded: false,
        }
    }

    /// Forget everything; the next fetch starts at page 1
    pub fn reset(&mut self) {
        self.current_page = 0;
        self.total_items = 0;
        self.total_pages = 0;
        self.items.clear();
        self.loaded = false;
    }

    /// Append a fetched page and adopt its metadata
    pub fn apply(&mut self, page: Paginated<T>) {
        self.current_page = page.meta.current_page;
        self.total_items = page.meta.total_items;
        self.total_pages = page.meta.total_pages;
        if page.meta.items_per_page > 0 {
            self.page_size = page.meta.items_per_page;
        }
        self.items.extend(page.items);
        self.loaded = true;
    }

    /// `current_page < total_pages`
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Page number to request next
    pub fn next_page(&self) -> u64 {
        self.current_page + 1
    }

    /// Whether at least one page has been applied since the last reset
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PageWindow<Complaint> {
    /// Replace every entry with the record's id wholesale.
    ///
    /// Returns the number of entries replaced.
    pub fn replace(&mut self, record: &Complaint) -> usize {
        let mut replaced = 0;
        for item in self.items.iter_mut().filter(|item| item.id == record.id) {
            *item = record.clone();
            replaced += 1;
        }
        replaced
    }

    /// Fill in the submitter summary on records that lack one.
    ///
    /// Returns the number of records patched.
    pub fn splice_submitter(&mut self, summary: &UserSummary) -> usize {
        let mut patched = 0;
        for item in self
            .items
            .iter_mut()
            .filter(|item| item.user_id == summary.id && item.user.is_none())
        {
            item.user = Some(summary.clone());
            patched += 1;
        }
        patched
    }

    /// First entry with the given id
    pub fn find(&self, id: &str) -> Option<&Complaint> {
        self.items.iter().find(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::sample_complaint;
    use complaint_client::{PageLinks, PageMeta};

    fn page(ids: &[&str], current_page: u64, total_pages: u64) -> Paginated<Complaint> {
        Paginated {
            items: ids.iter().map(|id| sample_complaint(id, "u1")).collect(),
            meta: PageMeta {
                item_count: ids.len() as u64,
                total_items: 5,
                items_per_page: 2,
                total_pages,
                current_page,
            },
            links: PageLinks::default(),
        }
    }

    #[test]
    fn test_has_more_follows_server_metadata() {
        let mut window = PageWindow::new(2);
        assert!(!window.has_more());
        assert_eq!(window.next_page(), 1);

        window.apply(page(&["c1", "c2"], 1, 3));
        assert!(window.has_more());

        window.apply(page(&["c3", "c4"], 2, 3));
        window.apply(page(&["c5"], 3, 3));
        assert!(!window.has_more());
        assert_eq!(window.len(), 5);
        assert_eq!(window.total_items(), 5);
    }

    #[test]
    fn test_overlapping_pages_are_kept() {
        let mut window = PageWindow::new(2);
        window.apply(page(&["c1", "c2"], 1, 3));
        window.apply(page(&["c2", "c3"], 2, 3));
        assert_eq!(window.len(), 4);

        let mut updated = sample_complaint("c2", "u1");
        updated.version = 9;
        assert_eq!(window.replace(&updated), 2);
    }

    #[test]
    fn test_splice_only_fills_missing_summaries() {
        let mut window = PageWindow::new(2);
        window.apply(page(&["c1", "c2"], 1, 1));

        let summary = UserSummary {
            id: "u1".into(),
            first_name: Some("Grace".into()),
            last_name: None,
            email: "grace@example.com".into(),
        };
        assert_eq!(window.splice_submitter(&summary), 2);
        assert_eq!(window.splice_submitter(&summary), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut window = PageWindow::new(2);
        window.apply(page(&["c1", "c2"], 1, 3));
        window.reset();
        assert!(window.is_empty());
        assert!(!window.is_loaded());
        assert_eq!(window.next_page(), 1);
    }
}
