//! Sort and pagination state of a list view.
//!
//! Every transition is applied synchronously on the triggering interaction;
//! the resulting `ListParams` are what the next fetch uses.

use crate::types::{ListParams, SortKey, SortOrder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQueryState<K: SortKey> {
    page: u32,
    per_page: u32,
    sort_by: K,
    order: SortOrder,
    total_pages: Option<u32>,
}

impl<K: SortKey> ListQueryState<K> {
    /// Start on page 1, ascending by `sort_by`.
    pub fn new(per_page: u32, sort_by: K) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            sort_by,
            order: SortOrder::Asc,
            total_pages: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn sort_by(&self) -> K {
        self.sort_by
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Clicking the active column flips the order; any other column sorts
    /// ascending by it from page 1.
    pub fn toggle_sort(&mut self, column: K) {
        if column == self.sort_by {
            self.order = self.order.flipped();
        } else {
            self.sort_by = column;
            self.order = SortOrder::Asc;
            self.page = 1;
        }
    }

    /// Clamped to the known page range; optimistic while the range is unknown.
    pub fn set_page(&mut self, page: u32) {
        self.page = self.clamp(page);
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page.saturating_add(1));
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        match self.total_pages {
            Some(total) => self.page < total,
            None => true,
        }
    }

    /// Record the page count reported by the server and re-clamp.
    pub fn observe_total_pages(&mut self, total_pages: u32) {
        self.total_pages = Some(total_pages);
        self.page = self.clamp(self.page);
    }

    pub fn params(&self) -> ListParams<K> {
        ListParams::new(self.page, self.per_page, self.sort_by, self.order)
    }

    fn clamp(&self, page: u32) -> u32 {
        let page = page.max(1);
        match self.total_pages {
            Some(total) => page.min(total.max(1)),
            None => page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupSortKey, GroupWordSortKey};

    #[test]
    fn starts_on_first_page_ascending() {
        let state = ListQueryState::new(10, GroupSortKey::Name);
        assert_eq!(
            state.params(),
            ListParams::new(1, 10, GroupSortKey::Name, SortOrder::Asc)
        );
        assert_eq!(state.total_pages(), None);
    }

    #[test]
    fn toggling_active_column_flips_order_and_keeps_page() {
        let mut state = ListQueryState::new(10, GroupSortKey::Name);
        state.set_page(3);
        state.toggle_sort(GroupSortKey::Name);
        assert_eq!(state.order(), SortOrder::Desc);
        assert_eq!(state.page(), 3);
        state.toggle_sort(GroupSortKey::Name);
        assert_eq!(state.order(), SortOrder::Asc);
        assert_eq!(state.page(), 3);
    }

    #[test]
    fn toggling_other_column_sorts_ascending_from_page_one() {
        for &start in GroupSortKey::ALL {
            for &other in GroupSortKey::ALL.iter().filter(|&&k| k != start) {
                for order_flips in 0..2 {
                    let mut state = ListQueryState::new(10, start);
                    if order_flips == 1 {
                        state.toggle_sort(start);
                    }
                    state.set_page(4);
                    state.toggle_sort(other);
                    assert_eq!(state.sort_by(), other);
                    assert_eq!(state.order(), SortOrder::Asc);
                    assert_eq!(state.page(), 1);
                }
            }
        }
    }

    #[test]
    fn term_then_definition_clicks() {
        let mut state = ListQueryState::new(10, GroupWordSortKey::Quebecois);
        let mut seen = vec![state.params()];
        state.toggle_sort(GroupWordSortKey::Quebecois);
        seen.push(state.params());
        state.toggle_sort(GroupWordSortKey::StandardFrench);
        seen.push(state.params());

        let shape: Vec<_> = seen.iter().map(|p| (p.sort_by.as_str(), p.order)).collect();
        assert_eq!(
            shape,
            vec![
                ("quebecois", SortOrder::Asc),
                ("quebecois", SortOrder::Desc),
                ("standard_french", SortOrder::Asc),
            ]
        );
    }

    #[test]
    fn set_page_is_optimistic_until_total_known() {
        let mut state = ListQueryState::new(10, GroupSortKey::Name);
        state.set_page(40);
        assert_eq!(state.page(), 40);
        state.set_page(0);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn set_page_clamps_once_total_known() {
        let mut state = ListQueryState::new(10, GroupSortKey::Name);
        state.set_page(7);
        state.observe_total_pages(3);
        assert_eq!(state.page(), 3);
        state.set_page(9);
        assert_eq!(state.page(), 3);
        state.set_page(2);
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn empty_listing_keeps_page_one() {
        let mut state = ListQueryState::new(10, GroupSortKey::Name);
        state.observe_total_pages(0);
        state.set_page(5);
        assert_eq!(state.page(), 1);
        assert!(!state.has_next());
        assert!(!state.has_previous());
    }

    #[test]
    fn next_and_previous_respect_bounds() {
        let mut state = ListQueryState::new(10, GroupSortKey::Name);
        state.observe_total_pages(2);
        state.previous_page();
        assert_eq!(state.page(), 1);
        state.next_page();
        assert_eq!(state.page(), 2);
        assert!(!state.has_next());
        state.next_page();
        assert_eq!(state.page(), 2);
        assert!(state.has_previous());
    }
}
