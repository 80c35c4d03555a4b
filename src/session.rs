//! Navigation controller: one browsing session over a loaded glossary.

use crate::history::{NavigationHistory, TrailStore};
use crate::{ALL_CATEGORIES, Term, TermStore, filter_terms};
use std::time::{Duration, Instant};
use tracing::warn;

/// How long a just-navigated-to term stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(1500);

/// Transient filter inputs. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub category: String,
    pub query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            query: String::new(),
        }
    }
}

/// Presentation boundary. The controller only ever asks the presenter to
/// bring a term into view; how that happens (scroll, anchor, nothing) is the
/// front end's business.
pub trait Presenter {
    fn focus_term(&mut self, id: &str);
}

/// Presenter for headless sessions and tests.
#[derive(Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn focus_term(&mut self, _id: &str) {}
}

/// Counts snapshot for status lines and API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    pub visible: usize,
    pub total: usize,
    pub trail: usize,
}

/// Owns the store, the filter state, and the trail for one user session.
///
/// All mutation happens on discrete events (a keystroke, a click), so the
/// session is single-threaded by construction and needs no locking.
pub struct BrowseSession<S: TrailStore, P: Presenter = NullPresenter> {
    store: TermStore,
    filter: FilterState,
    history: NavigationHistory<S>,
    presenter: P,
    highlight: Option<(String, Instant)>,
}

impl<S: TrailStore> BrowseSession<S, NullPresenter> {
    /// Headless session: restores the trail, presents nothing.
    pub fn new(store: TermStore, trail_store: S) -> Self {
        Self::with_presenter(store, trail_store, NullPresenter)
    }
}

impl<S: TrailStore, P: Presenter> BrowseSession<S, P> {
    pub fn with_presenter(store: TermStore, trail_store: S, presenter: P) -> Self {
        Self {
            store,
            filter: FilterState::default(),
            history: NavigationHistory::restore(trail_store),
            presenter,
            highlight: None,
        }
    }

    pub fn store(&self) -> &TermStore {
        &self.store
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.filter.category = category.into();
    }

    /// The currently visible terms under the active filter state.
    pub fn visible_terms(&self) -> Vec<&Term> {
        filter_terms(&self.store, &self.filter.category, &self.filter.query)
    }

    /// The trail mapped to live terms, dangling entries omitted.
    pub fn breadcrumbs(&self) -> Vec<&Term> {
        self.history.display_list(&self.store)
    }

    pub fn trail_ids(&self) -> &[String] {
        self.history.trail().ids()
    }

    pub fn counts(&self) -> SessionCounts {
        SessionCounts {
            visible: self.visible_terms().len(),
            total: self.store.terms().len(),
            trail: self.history.trail().len(),
        }
    }

    /// Handles a navigation event (related-term click or breadcrumb click).
    ///
    /// Unknown IDs change nothing. A breadcrumb click truncates the trail at
    /// the clicked entry instead of appending; either way the filters reset
    /// so the target term is visible no matter what was typed before, and
    /// the presenter is asked to bring it into view.
    pub fn navigate_to(&mut self, id: &str, from_trail: bool) {
        if self.store.get_by_id(id).is_none() {
            warn!(id, "navigation target not in store; ignoring");
            return;
        }
        if from_trail {
            self.history.truncate_after(id);
        } else {
            self.history.push(id);
        }
        self.filter = FilterState::default();
        self.highlight = Some((id.to_string(), Instant::now() + HIGHLIGHT_DURATION));
        self.presenter.focus_term(id);
    }

    pub fn clear_trail(&mut self) {
        self.history.clear();
    }

    /// The term that should currently render highlighted, if any.
    ///
    /// Highlights are deadlines, not timers: re-navigating to the same term
    /// simply moves the deadline, and an expired highlight reports nothing.
    pub fn active_highlight(&self, now: Instant) -> Option<&str> {
        match &self.highlight {
            Some((id, until)) if now < *until => Some(id.as_str()),
            _ => None,
        }
    }
}
