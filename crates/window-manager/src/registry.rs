//! Title ↔ handle bookkeeping for tracked windows.

use std::collections::HashMap;

use crate::errors::{WindowError, WindowResult};
use crate::model::{WindowHandle, WindowRecord};

#[derive(Clone, Debug)]
struct Slot {
    handle: WindowHandle,
    seq: u64,
}

/// Registry keyed by logical title with a reverse index by handle.
///
/// Both keys are unique: a title resolves to at most one handle and a handle
/// is registered under at most one title. Listing preserves insertion order.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    by_title: HashMap<String, Slot>,
    by_handle: HashMap<WindowHandle, String>,
    next_seq: u64,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        title: impl Into<String>,
        handle: WindowHandle,
    ) -> WindowResult<WindowRecord> {
        let title = title.into();
        if self.by_title.contains_key(&title) {
            return Err(WindowError::DuplicateTitle { title });
        }
        if let Some(existing) = self.by_handle.get(&handle) {
            return Err(WindowError::DuplicateHandle {
                handle,
                title: existing.clone(),
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_handle.insert(handle.clone(), title.clone());
        self.by_title.insert(
            title.clone(),
            Slot {
                handle: handle.clone(),
                seq,
            },
        );
        Ok(WindowRecord { title, handle })
    }

    pub fn handle_of(&self, title: &str) -> Option<&WindowHandle> {
        self.by_title.get(title).map(|slot| &slot.handle)
    }

    pub fn title_of(&self, handle: &WindowHandle) -> Option<&str> {
        self.by_handle.get(handle).map(String::as_str)
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }

    pub fn contains_handle(&self, handle: &WindowHandle) -> bool {
        self.by_handle.contains_key(handle)
    }

    pub fn remove_title(&mut self, title: &str) -> Option<WindowRecord> {
        let slot = self.by_title.remove(title)?;
        self.by_handle.remove(&slot.handle);
        Some(WindowRecord {
            title: title.to_string(),
            handle: slot.handle,
        })
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    pub fn records(&self) -> Vec<WindowRecord> {
        let mut slots: Vec<(&String, &Slot)> = self.by_title.iter().collect();
        slots.sort_by_key(|(_, slot)| slot.seq);
        slots
            .into_iter()
            .map(|(title, slot)| WindowRecord {
                title: title.clone(),
                handle: slot.handle.clone(),
            })
            .collect()
    }

    /// Live handles that no record points at, in the order the driver listed them.
    pub fn untracked(&self, live: &[WindowHandle]) -> Vec<WindowHandle> {
        live.iter()
            .filter(|handle| !self.by_handle.contains_key(*handle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: &str) -> WindowHandle {
        WindowHandle::from(raw)
    }

    #[test]
    fn insert_and_resolve_both_ways() {
        let mut registry = WindowRegistry::new();
        registry.insert("main", handle("h-1")).unwrap();
        registry.insert("MockDApp", handle("h-2")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.handle_of("MockDApp"), Some(&handle("h-2")));
        assert_eq!(registry.title_of(&handle("h-1")), Some("main"));
        assert!(registry.handle_of("popupConnectorWindow").is_none());
    }

    #[test]
    fn rejects_duplicate_title() {
        let mut registry = WindowRegistry::new();
        registry.insert("main", handle("h-1")).unwrap();
        let err = registry.insert("main", handle("h-2")).unwrap_err();

        assert!(matches!(err, WindowError::DuplicateTitle { title } if title == "main"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains_handle(&handle("h-2")));
    }

    #[test]
    fn rejects_duplicate_handle() {
        let mut registry = WindowRegistry::new();
        registry.insert("main", handle("h-1")).unwrap();
        let err = registry.insert("other", handle("h-1")).unwrap_err();

        match err {
            WindowError::DuplicateHandle { handle: dup, title } => {
                assert_eq!(dup, handle("h-1"));
                assert_eq!(title, "main");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!registry.contains_title("other"));
    }

    #[test]
    fn remove_clears_reverse_index() {
        let mut registry = WindowRegistry::new();
        registry.insert("main", handle("h-1")).unwrap();
        registry.insert("popup", handle("h-2")).unwrap();

        let removed = registry.remove_title("popup").unwrap();
        assert_eq!(removed.handle, handle("h-2"));
        assert!(registry.title_of(&handle("h-2")).is_none());
        assert!(registry.remove_title("popup").is_none());

        // the freed title can be registered again
        registry.insert("popup", handle("h-3")).unwrap();
        assert_eq!(registry.handle_of("popup"), Some(&handle("h-3")));
    }

    #[test]
    fn records_keep_insertion_order() {
        let mut registry = WindowRegistry::new();
        for (title, raw) in [("main", "h-9"), ("b", "h-1"), ("a", "h-5")] {
            registry.insert(title, handle(raw)).unwrap();
        }
        let titles: Vec<String> = registry.records().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["main", "b", "a"]);
    }

    #[test]
    fn untracked_is_set_difference() {
        let mut registry = WindowRegistry::new();
        registry.insert("main", handle("h-1")).unwrap();
        let live = vec![handle("h-1"), handle("h-7"), handle("h-8")];

        assert_eq!(registry.untracked(&live), vec![handle("h-7"), handle("h-8")]);
    }
}
