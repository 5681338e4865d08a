//! Document store
//!
//! Holds the active buffer and where the user is in it. Every replacement
//! gets a fresh [`BufferId`].

use crate::buffer::{BufferId, PdfBuffer};

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    current: Option<(BufferId, PdfBuffer)>,
    next_id: u64,
    current_page: u32,
    total_pages: Option<u32>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `buffer` as the active document and return its new tag.
    ///
    /// Page position and count carry over until a recount says otherwise.
    pub fn replace(&mut self, buffer: PdfBuffer) -> BufferId {
        self.next_id += 1;
        let id = BufferId(self.next_id);
        self.current = Some((id, buffer));
        id
    }

    /// Replace the buffer and reset to page 1 with a known page count
    pub fn load(&mut self, buffer: PdfBuffer, total_pages: u32) -> BufferId {
        let id = self.replace(buffer);
        self.current_page = 1;
        self.total_pages = Some(total_pages);
        id
    }

    pub fn buffer(&self) -> Option<&PdfBuffer> {
        self.current.as_ref().map(|(_, buffer)| buffer)
    }

    pub fn buffer_id(&self) -> Option<BufferId> {
        self.current.as_ref().map(|(id, _)| *id)
    }

    pub fn is_current(&self, id: BufferId) -> bool {
        self.buffer_id() == Some(id)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// 1-based; 0 while empty
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn set_total_pages(&mut self, total: Option<u32>) {
        self.total_pages = total;
        if let Some(total) = total {
            self.current_page = self.current_page.clamp(1, total.max(1));
        }
    }

    /// Move by `delta` pages, clamped to `[1, total_pages]`. Returns whether
    /// the page changed.
    pub fn step_page(&mut self, delta: i32) -> bool {
        let Some(total) = self.total_pages.filter(|&t| t > 0) else {
            return false;
        };
        let target = (self.current_page as i64 + delta as i64).clamp(1, total as i64) as u32;
        let changed = target != self.current_page;
        self.current_page = target;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(tag: &[u8]) -> PdfBuffer {
        PdfBuffer::from(tag)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = DocumentStore::new();
        assert!(store.is_empty());
        assert_eq!(store.buffer_id(), None);
        assert_eq!(store.current_page(), 0);
        assert_eq!(store.total_pages(), None);
    }

    #[test]
    fn test_every_replacement_gets_a_new_tag() {
        let mut store = DocumentStore::new();
        let a = store.load(buffer(b"a"), 3);
        let b = store.replace(buffer(b"a"));
        assert_ne!(a, b);
        assert!(store.is_current(b));
        assert!(!store.is_current(a));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = DocumentStore::new();
        store.load(buffer(b"a"), 3);
        store.step_page(1);
        store.replace(buffer(b"b"));
        assert_eq!(store.current_page(), 2);
        assert_eq!(store.total_pages(), Some(3));
        assert_eq!(store.buffer().unwrap().as_bytes(), b"b");
    }

    #[test]
    fn test_step_page_clamps() {
        let mut store = DocumentStore::new();
        store.load(buffer(b"a"), 3);
        assert!(!store.step_page(-1));
        assert_eq!(store.current_page(), 1);
        assert!(store.step_page(5));
        assert_eq!(store.current_page(), 3);
        assert!(!store.step_page(1));
    }

    #[test]
    fn test_step_page_without_count_is_noop() {
        let mut store = DocumentStore::new();
        store.load(buffer(b"a"), 3);
        store.set_total_pages(None);
        assert!(!store.step_page(1));
    }

    #[test]
    fn test_smaller_count_pulls_page_back() {
        let mut store = DocumentStore::new();
        store.load(buffer(b"a"), 5);
        store.step_page(4);
        store.set_total_pages(Some(2));
        assert_eq!(store.current_page(), 2);
    }
}
