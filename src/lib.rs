mod data;
pub mod history;
pub mod session;
#[cfg(feature = "web")]
pub mod web;

pub use data::{DatasetError, GlossaryDataset, Term};

use std::collections::HashMap;
use std::path::Path;

/// Sentinel category that matches every term.
pub const ALL_CATEGORIES: &str = "all";

/// Read-only access to the loaded glossary.
///
/// Owns the sorted dataset plus lookup indexes built once at load time:
/// every rendered related-term link performs one name lookup, so resolution
/// is a map hit rather than a scan.
pub struct TermStore {
    dataset: GlossaryDataset,
    by_id: HashMap<String, usize>,
    id_by_name: HashMap<String, usize>,
}

impl TermStore {
    /// Loads a dataset file and indexes it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Ok(Self::from_dataset(GlossaryDataset::load(path)?))
    }

    pub fn from_dataset(dataset: GlossaryDataset) -> Self {
        let mut by_id = HashMap::with_capacity(dataset.terms.len());
        let mut id_by_name = HashMap::with_capacity(dataset.terms.len());
        for (index, term) in dataset.terms.iter().enumerate() {
            by_id.insert(term.id.clone(), index);
            id_by_name.insert(term.term.to_lowercase(), index);
        }
        Self {
            dataset,
            by_id,
            id_by_name,
        }
    }

    /// Terms in display order (sorted by name at load).
    pub fn terms(&self) -> &[Term] {
        &self.dataset.terms
    }

    pub fn categories(&self) -> &[String] {
        &self.dataset.categories
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Term> {
        self.by_id.get(id).map(|&index| &self.dataset.terms[index])
    }

    /// Case-insensitive exact match against the display name.
    pub fn resolve_id_by_name(&self, name: &str) -> Option<&str> {
        self.id_by_name
            .get(&name.to_lowercase())
            .map(|&index| self.dataset.terms[index].id.as_str())
    }

    /// Cross-references a term's related names back to IDs.
    ///
    /// Names with no matching term resolve to `None` and render as plain
    /// text; the name-based linking is preserved from the data model even
    /// though it breaks silently when a referenced term is renamed.
    pub fn related_links(&self, term: &Term) -> Vec<RelatedLink> {
        term.related_terms
            .iter()
            .map(|name| RelatedLink {
                name: name.clone(),
                id: self.resolve_id_by_name(name).map(str::to_string),
            })
            .collect()
    }
}

/// A related-term reference, resolved (or not) against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedLink {
    pub name: String,
    pub id: Option<String>,
}

/// Computes the visible subset of the store for a category + search query.
///
/// Pure: same inputs always yield the same list, and the store's sort order
/// is preserved. The category match is exact and case-sensitive (unknown
/// categories simply match nothing); the query is a case-insensitive
/// substring match over name, definition, and full form.
pub fn filter_terms<'a>(store: &'a TermStore, category: &str, query: &str) -> Vec<&'a Term> {
    let needle = query.to_lowercase();
    store
        .terms()
        .iter()
        .filter(|term| category == ALL_CATEGORIES || term.category == category)
        .filter(|term| needle.is_empty() || term_matches(term, &needle))
        .collect()
}

fn term_matches(term: &Term, needle: &str) -> bool {
    term.term.to_lowercase().contains(needle)
        || term.definition.to_lowercase().contains(needle)
        || term
            .full_form
            .as_deref()
            .is_some_and(|full| full.to_lowercase().contains(needle))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ids(terms: &[&Term]) -> Vec<String> {
        terms.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn store_keeps_terms_sorted_by_name() {
        let store = fixtures::store();
        let names: Vec<_> = store.terms().iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, ["API", "CI/CD", "Docker", "REST"]);
    }

    #[test]
    fn get_by_id_hits_and_misses() {
        let store = fixtures::store();
        assert_eq!(store.get_by_id("docker").map(|t| t.term.as_str()), Some("Docker"));
        assert!(store.get_by_id("kubernetes").is_none());
    }

    #[test]
    fn resolve_id_by_name_is_case_insensitive_exact() {
        let store = fixtures::store();
        assert_eq!(store.resolve_id_by_name("rest"), Some("rest"));
        assert_eq!(store.resolve_id_by_name("REST"), Some("rest"));
        // Substrings of a name are not matches.
        assert_eq!(store.resolve_id_by_name("RES"), None);
    }

    #[test]
    fn related_links_mark_unresolved_names() {
        let store = fixtures::store();
        let api = store.get_by_id("api").expect("api present");
        let links = store.related_links(api);
        assert_eq!(
            links,
            vec![
                RelatedLink {
                    name: "REST".to_string(),
                    id: Some("rest".to_string()),
                },
                RelatedLink {
                    name: "GraphQL".to_string(),
                    id: None,
                },
            ]
        );
    }

    #[test]
    fn all_category_with_empty_query_returns_everything() {
        let store = fixtures::store();
        let visible = filter_terms(&store, ALL_CATEGORIES, "");
        assert_eq!(visible.len(), store.terms().len());
    }

    #[test]
    fn category_filter_is_exact_and_order_preserving() {
        let store = fixtures::store();
        assert_eq!(ids(&filter_terms(&store, "DevOps", "")), ["ci-cd", "docker"]);
        // Case-sensitive: no folding on the category side.
        assert!(filter_terms(&store, "devops", "").is_empty());
        assert!(filter_terms(&store, "Nonexistent", "").is_empty());
    }

    #[test]
    fn query_matches_full_form() {
        let store = fixtures::store();
        assert_eq!(ids(&filter_terms(&store, ALL_CATEGORIES, "continuous")), ["ci-cd"]);
    }

    #[test]
    fn query_matches_name_and_definition() {
        let store = fixtures::store();
        assert_eq!(ids(&filter_terms(&store, ALL_CATEGORIES, "dock")), ["docker"]);
        assert_eq!(
            ids(&filter_terms(&store, ALL_CATEGORIES, "stateless")),
            ["rest"]
        );
    }

    #[test]
    fn query_and_category_compose() {
        let store = fixtures::store();
        assert_eq!(ids(&filter_terms(&store, "Web", "contract")), ["api"]);
        assert!(filter_terms(&store, "DevOps", "contract").is_empty());
    }

    #[test]
    fn excluded_terms_match_no_field() {
        let store = fixtures::store();
        let visible = filter_terms(&store, ALL_CATEGORIES, "container");
        let visible_ids = ids(&visible);
        for term in store.terms() {
            let matched = visible_ids.contains(&term.id);
            let any_field = term.term.to_lowercase().contains("container")
                || term.definition.to_lowercase().contains("container")
                || term
                    .full_form
                    .as_deref()
                    .is_some_and(|f| f.to_lowercase().contains("container"));
            assert_eq!(matched, any_field, "field match mismatch for {}", term.id);
        }
    }

    #[test]
    fn filter_is_idempotent() {
        let store = fixtures::store();
        let first = ids(&filter_terms(&store, "Web", "api"));
        let second = ids(&filter_terms(&store, "Web", "api"));
        assert_eq!(first, second);
    }
}
