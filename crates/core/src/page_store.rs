//! Page-indexed storage
//!
//! A growable list of page slots, each holding the items drawn on that page.
//! Slots are only ever appended; clearing a page empties its slot but keeps it.

use serde::{Deserialize, Serialize};

/// Items grouped by zero-based page index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageStore<T> {
    pages: Vec<Vec<T>>,
}

impl<T> Default for PageStore<T> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<T> PageStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with `page_count` empty slots
    pub fn with_pages(page_count: usize) -> Self {
        let mut store = Self::new();
        store.ensure_capacity(page_count);
        store
    }

    /// Number of page slots
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Grow to at least `page_count` slots. Never shrinks.
    pub fn ensure_capacity(&mut self, page_count: usize) {
        if self.pages.len() < page_count {
            self.pages.resize_with(page_count, Vec::new);
        }
    }

    /// Push `item` onto `page`.
    ///
    /// `total_pages` is the document's current page count; the store grows to
    /// cover it (and `page` itself) before writing.
    pub fn append(&mut self, page: usize, item: T, total_pages: usize) {
        self.ensure_capacity(total_pages.max(page + 1));
        self.pages[page].push(item);
    }

    /// Replace the item at `index` on `page`.
    ///
    /// Returns `false` without touching anything when the slot or index does
    /// not exist (e.g. the item was removed by an earlier edit).
    pub fn replace(&mut self, page: usize, index: usize, item: T) -> bool {
        match self.pages.get_mut(page).and_then(|items| items.get_mut(index)) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Drop every item on `page` matching `predicate`
    pub fn remove_where<F>(&mut self, page: usize, mut predicate: F)
    where
        F: FnMut(&T) -> bool,
    {
        if let Some(items) = self.pages.get_mut(page) {
            items.retain(|item| !predicate(item));
        }
    }

    /// Empty the slot for `page`, creating it if needed
    pub fn clear(&mut self, page: usize) {
        self.ensure_capacity(page + 1);
        self.pages[page].clear();
    }

    /// Items on `page`; empty when the slot doesn't exist
    pub fn page(&self, page: usize) -> &[T] {
        self.pages.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, page: usize, index: usize) -> Option<&T> {
        self.pages.get(page)?.get(index)
    }

    /// Iterate `(page_index, items)` over every slot
    pub fn iter_pages(&self) -> impl Iterator<Item = (usize, &[T])> {
        self.pages.iter().enumerate().map(|(index, items)| (index, items.as_slice()))
    }

    /// Total number of items across all pages
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_capacity_grows_with_empty_slots() {
        let mut store: PageStore<u32> = PageStore::new();
        store.ensure_capacity(5);

        assert_eq!(store.len(), 5);
        assert!((0..5).all(|page| store.page(page).is_empty()));
    }

    #[test]
    fn ensure_capacity_never_shrinks() {
        let mut store: PageStore<u32> = PageStore::with_pages(5);
        store.append(4, 9, 5);

        store.ensure_capacity(2);
        store.ensure_capacity(0);

        assert_eq!(store.len(), 5);
        assert_eq!(store.page(4), &[9]);
    }

    #[test]
    fn append_grows_to_document_page_count() {
        let mut store = PageStore::new();
        store.append(1, "a", 4);

        assert_eq!(store.len(), 4);
        assert_eq!(store.page(1), &["a"]);
    }

    #[test]
    fn append_past_known_page_count_creates_slot() {
        let mut store = PageStore::new();
        store.append(6, 1, 0);

        assert_eq!(store.len(), 7);
        assert_eq!(store.page(6), &[1]);
    }

    #[test]
    fn replace_ignores_stale_indices() {
        let mut store = PageStore::new();
        store.append(0, 1, 1);

        assert!(store.replace(0, 0, 10));
        assert!(!store.replace(0, 1, 20));
        assert!(!store.replace(3, 0, 30));

        assert_eq!(store.page(0), &[10]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_where_keeps_non_matching_items() {
        let mut store = PageStore::new();
        for value in [1, 2, 3, 4] {
            store.append(0, value, 1);
        }

        store.remove_where(0, |v| v % 2 == 0);
        store.remove_where(8, |_| true);

        assert_eq!(store.page(0), &[1, 3]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_empties_without_removing() {
        let mut store = PageStore::new();
        store.append(0, 1, 2);
        store.append(1, 2, 2);

        store.clear(0);
        store.clear(3);

        assert_eq!(store.len(), 4);
        assert!(store.page(0).is_empty());
        assert_eq!(store.page(1), &[2]);
        assert_eq!(store.item_count(), 1);
    }
}
