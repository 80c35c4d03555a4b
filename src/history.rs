//! Breadcrumb trail of visited terms, with best-effort session persistence.

use crate::{Term, TermStore};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::warn;

/// Ordered list of visited term IDs.
///
/// The order is a path, not a set: the same ID may appear more than once as
/// long as the occurrences are not adjacent. Dangling IDs (terms that no
/// longer resolve) are dropped from display but stay in the trail until the
/// next mutation rewrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trail {
    ids: Vec<String>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: Vec<String>) -> Self {
        Self { ids }
    }

    /// Decodes the persisted wire format, a bare JSON array of ID strings.
    /// Anything unparsable falls back to an empty trail with a warning;
    /// corrupt session state is never fatal.
    pub fn from_json(payload: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(payload) {
            Ok(ids) => Self { ids },
            Err(err) => {
                warn!(%err, "discarding unparsable navigation trail");
                Self::new()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.ids).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Appends a visit. No-op when `id` is already at the tail.
    pub fn push(&mut self, id: &str) -> bool {
        if self.ids.last().is_some_and(|tail| tail == id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Cuts the trail back to the first occurrence of `id`, keeping that
    /// entry. An ID that is not on the trail leaves it untouched.
    pub fn truncate_after(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|entry| entry == id) {
            Some(position) => {
                self.ids.truncate(position + 1);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Maps the trail to terms for rendering, silently omitting IDs that no
    /// longer resolve. Does not mutate the trail.
    pub fn display_list<'a>(&self, store: &'a TermStore) -> Vec<&'a Term> {
        self.ids
            .iter()
            .filter_map(|id| store.get_by_id(id))
            .collect()
    }
}

/// Session-scoped storage for the serialized trail.
///
/// Reads are lenient (absent is fine), writes are best-effort: the caller
/// logs failures and keeps the in-memory trail authoritative.
pub trait TrailStore {
    fn read(&self) -> Option<String>;
    fn write(&self, payload: &str) -> io::Result<()>;
}

impl<T: TrailStore + ?Sized> TrailStore for &T {
    fn read(&self) -> Option<String> {
        (**self).read()
    }

    fn write(&self, payload: &str) -> io::Result<()> {
        (**self).write(payload)
    }
}

/// Trail persisted to a single JSON file, used by the CLI.
pub struct FileTrailStore {
    path: PathBuf,
}

impl FileTrailStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the OS temp dir, scoped per user.
    pub fn session_default() -> Self {
        Self::new(std::env::temp_dir().join("termgloss-trail.json"))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TrailStore for FileTrailStore {
    fn read(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok()
    }

    fn write(&self, payload: &str) -> io::Result<()> {
        fs::write(&self.path, payload)
    }
}

/// In-memory store for headless sessions and tests.
#[derive(Default)]
pub struct MemoryTrailStore {
    payload: std::cell::RefCell<Option<String>>,
}

impl MemoryTrailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrailStore for MemoryTrailStore {
    fn read(&self) -> Option<String> {
        self.payload.borrow().clone()
    }

    fn write(&self, payload: &str) -> io::Result<()> {
        *self.payload.borrow_mut() = Some(payload.to_string());
        Ok(())
    }
}

/// A trail coupled to its persisted mirror.
///
/// Every mutation re-persists the whole trail. A failed write is logged and
/// swallowed; the in-memory trail stays authoritative for the rest of the
/// session even when it can no longer be saved.
pub struct NavigationHistory<S: TrailStore> {
    trail: Trail,
    store: S,
}

impl<S: TrailStore> NavigationHistory<S> {
    pub fn new(store: S) -> Self {
        Self {
            trail: Trail::new(),
            store,
        }
    }

    /// Restores the persisted trail at startup; absent or corrupt state
    /// yields an empty trail.
    pub fn restore(store: S) -> Self {
        let trail = match store.read() {
            Some(payload) => Trail::from_json(&payload),
            None => Trail::new(),
        };
        Self { trail, store }
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn push(&mut self, id: &str) {
        if self.trail.push(id) {
            self.persist();
        }
    }

    pub fn truncate_after(&mut self, id: &str) {
        if self.trail.truncate_after(id) {
            self.persist();
        }
    }

    pub fn clear(&mut self) {
        self.trail.clear();
        self.persist();
    }

    pub fn display_list<'a>(&self, store: &'a TermStore) -> Vec<&'a Term> {
        self.trail.display_list(store)
    }

    fn persist(&self) {
        if let Err(err) = self.store.write(&self.trail.to_json()) {
            warn!(%err, "failed to persist navigation trail; keeping it in memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn trail_of(ids: &[&str]) -> Trail {
        Trail::from_ids(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn push_skips_adjacent_repeats() {
        let mut trail = Trail::new();
        assert!(trail.push("api"));
        assert!(!trail.push("api"));
        assert_eq!(trail.ids(), ["api"]);
    }

    #[test]
    fn push_allows_non_adjacent_revisits() {
        let mut trail = Trail::new();
        trail.push("api");
        trail.push("rest");
        trail.push("api");
        assert_eq!(trail.ids(), ["api", "rest", "api"]);
    }

    #[test]
    fn truncate_after_keeps_clicked_entry() {
        let mut trail = trail_of(&["a", "b", "c", "d"]);
        assert!(trail.truncate_after("b"));
        assert_eq!(trail.ids(), ["a", "b"]);
    }

    #[test]
    fn truncate_after_uses_first_occurrence() {
        let mut trail = trail_of(&["a", "b", "a", "c"]);
        trail.truncate_after("a");
        assert_eq!(trail.ids(), ["a"]);
    }

    #[test]
    fn truncate_after_missing_id_is_a_noop() {
        let mut trail = trail_of(&["a", "b", "c", "d"]);
        assert!(!trail.truncate_after("z"));
        assert_eq!(trail.ids(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn corrupt_payload_restores_empty() {
        let trail = Trail::from_json("{not json");
        assert!(trail.is_empty());
        let trail = Trail::from_json(r#"{"ids": ["a"]}"#);
        assert!(trail.is_empty());
    }

    #[test]
    fn display_list_omits_dangling_ids_without_mutating() {
        let store = fixtures::store();
        let trail = trail_of(&["api", "gone", "rest"]);
        let shown: Vec<_> = trail.display_list(&store).iter().map(|t| t.id.clone()).collect();
        assert_eq!(shown, ["api", "rest"]);
        // The dangling ID survives until the next mutation.
        assert_eq!(trail.ids(), ["api", "gone", "rest"]);
    }

    #[test]
    fn history_round_trips_through_store() {
        let store = MemoryTrailStore::new();
        let mut history = NavigationHistory::new(store);
        history.push("a");
        history.push("b");
        let payload = history.store.read().expect("persisted");
        let restored = NavigationHistory::restore(MemoryTrailStore {
            payload: std::cell::RefCell::new(Some(payload)),
        });
        assert_eq!(restored.trail().ids(), ["a", "b"]);
    }

    #[test]
    fn history_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trail.json");
        {
            let mut history = NavigationHistory::new(FileTrailStore::new(&path));
            history.push("a");
            history.push("b");
            history.push("c");
            history.truncate_after("b");
        }
        let restored = NavigationHistory::restore(FileTrailStore::new(&path));
        assert_eq!(restored.trail().ids(), ["a", "b"]);
    }

    #[test]
    fn restore_from_absent_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = NavigationHistory::restore(FileTrailStore::new(dir.path().join("none.json")));
        assert!(history.trail().is_empty());
    }

    #[test]
    fn clear_persists_an_empty_trail() {
        let mut history = NavigationHistory::new(MemoryTrailStore::new());
        history.push("a");
        history.clear();
        assert_eq!(history.store.read().as_deref(), Some("[]"));
    }
}
