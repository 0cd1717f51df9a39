//! View models: the state a list or detail page renders from.
//!
//! # Design
//! A view model owns its `ListQueryState` (lists) or the identifier it was
//! routed with (details) plus a `QueryObserver`. Interactions update the
//! local state synchronously and then point the observer at the new key.
//! Rendering here means producing the plain strings a page shows; layout is
//! left to whatever front end consumes these types.
//!
//! View models issue their first query on construction, so they must be
//! created inside a tokio runtime.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::error::{FetchError, Resource};
use crate::list_state::ListQueryState;
use crate::query_cache::{QueryKey, QueryObserver, QueryState};
use crate::types::{
    GroupDetails, ListParams, Page, RecentSession, SortKey, SortOrder, StudyStats, Word,
};

pub type ListFetch<K, R> =
    Arc<dyn Fn(ListParams<K>) -> BoxFuture<'static, Result<Page<R>, FetchError>> + Send + Sync>;

pub type DetailFetch<R> = Arc<dyn Fn(i64) -> BoxFuture<'static, Result<R, FetchError>> + Send + Sync>;

pub type SingletonFetch<R> = Arc<dyn Fn() -> BoxFuture<'static, Result<R, FetchError>> + Send + Sync>;

/// Arrow shown next to a column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    Unsorted,
    Ascending,
    Descending,
}

/// Prefix a fetch failure with the view's context.
pub fn error_message(context: &str, error: &FetchError) -> String {
    format!("Error loading {context}: {error}")
}

pub struct ListView<K: SortKey, R> {
    resource: Resource,
    scope: Option<i64>,
    context: &'static str,
    state: ListQueryState<K>,
    observer: QueryObserver<Page<R>>,
    fetch: ListFetch<K, R>,
}

impl<K: SortKey, R: Clone + Send + Sync + 'static> ListView<K, R> {
    pub fn new(
        resource: Resource,
        scope: Option<i64>,
        context: &'static str,
        state: ListQueryState<K>,
        observer: QueryObserver<Page<R>>,
        fetch: ListFetch<K, R>,
    ) -> Self {
        let view = Self {
            resource,
            scope,
            context,
            state,
            observer,
            fetch,
        };
        view.refresh();
        view
    }

    fn refresh(&self) {
        let params = self.state.params();
        let key = QueryKey::list(self.resource, self.scope, &params);
        let fetch = Arc::clone(&self.fetch);
        self.observer.set_query(key, move || fetch(params.clone()));
    }

    /// Feed the latest page count back into the list state.
    fn sync_total_pages(&mut self) {
        let total_pages = self
            .observer
            .state()
            .data
            .map(|page| page.total_pages);
        if let Some(total_pages) = total_pages {
            self.state.observe_total_pages(total_pages);
        }
    }

    pub fn toggle_sort(&mut self, column: K) {
        self.state.toggle_sort(column);
        self.refresh();
    }

    pub fn set_page(&mut self, page: u32) {
        self.sync_total_pages();
        self.state.set_page(page);
        self.refresh();
    }

    pub fn next_page(&mut self) {
        self.sync_total_pages();
        self.state.next_page();
        self.refresh();
    }

    pub fn previous_page(&mut self) {
        self.sync_total_pages();
        self.state.previous_page();
        self.refresh();
    }

    pub fn list_state(&self) -> &ListQueryState<K> {
        &self.state
    }

    pub fn query_state(&self) -> QueryState<Page<R>> {
        self.observer.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<Page<R>>> {
        self.observer.subscribe()
    }

    /// Key of the query matching the current list state.
    pub fn current_key(&self) -> QueryKey {
        QueryKey::list(self.resource, self.scope, &self.state.params())
    }

    /// Rows currently on screen; the previous page's rows while the next
    /// page loads.
    pub fn rows(&self) -> Vec<R> {
        self.observer
            .state()
            .data
            .map(|page| page.items)
            .unwrap_or_default()
    }

    /// Skeleton rows are shown only when there is nothing else to show.
    pub fn shows_skeleton(&self) -> bool {
        let state = self.observer.state();
        state.is_loading() && state.data.is_none()
    }

    pub fn error_message(&self) -> Option<String> {
        self.observer
            .state()
            .error
            .map(|error| error_message(self.context, &error))
    }

    pub fn page_label(&self) -> Option<String> {
        self.observer
            .state()
            .data
            .map(|page| format!("Page {} of {}", self.state.page(), page.total_pages))
    }

    pub fn sort_indicator(&self, column: K) -> SortIndicator {
        if column != self.state.sort_by() {
            return SortIndicator::Unsorted;
        }
        match self.state.order() {
            SortOrder::Asc => SortIndicator::Ascending,
            SortOrder::Desc => SortIndicator::Descending,
        }
    }
}

/// Lines of text a detail page shows for its record.
pub trait Render {
    fn lines(&self) -> Vec<String>;
}

impl Render for GroupDetails {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.name.clone()];
        if let Some(description) = &self.description {
            lines.push(description.clone());
        }
        lines.push(format!("Words: {}", self.word_count));
        if let Some(rate) = self.success_rate {
            lines.push(format!("Success Rate: {:.1}%", rate * 100.0));
        }
        if let Some(at) = &self.last_studied_at {
            lines.push(format!("Last Studied: {at}"));
        }
        lines
    }
}

impl Render for Word {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.quebecois.clone(),
            format!("Standard French: {}", self.standard_french),
            format!("English: {}", self.english),
        ];
        if let Some(pronunciation) = &self.pronunciation {
            lines.push(format!("Pronunciation: {pronunciation}"));
        }
        if let Some(notes) = &self.usage_notes {
            lines.push(format!("Usage Notes: {notes}"));
        }
        lines.push(format!("Correct: {}", self.correct_count));
        lines.push(format!("Wrong: {}", self.wrong_count));
        if !self.groups.is_empty() {
            let names: Vec<&str> = self.groups.iter().map(|g| g.name.as_str()).collect();
            lines.push(format!("Groups: {}", names.join(", ")));
        }
        lines
    }
}

pub struct DetailView<R> {
    resource: Resource,
    context: &'static str,
    not_found: &'static str,
    id: i64,
    observer: QueryObserver<R>,
    fetch: DetailFetch<R>,
}

impl<R: Clone + Send + Sync + 'static> DetailView<R> {
    pub fn new(
        resource: Resource,
        context: &'static str,
        not_found: &'static str,
        id: i64,
        observer: QueryObserver<R>,
        fetch: DetailFetch<R>,
    ) -> Self {
        let view = Self {
            resource,
            context,
            not_found,
            id,
            observer,
            fetch,
        };
        view.refresh();
        view
    }

    fn refresh(&self) {
        let id = self.id;
        let fetch = Arc::clone(&self.fetch);
        self.observer
            .set_query(QueryKey::detail(self.resource, id), move || fetch(id));
    }

    /// Switch to another record, e.g. after navigation.
    pub fn load(&mut self, id: i64) {
        self.id = id;
        self.refresh();
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn current_key(&self) -> QueryKey {
        QueryKey::detail(self.resource, self.id)
    }

    pub fn query_state(&self) -> QueryState<R> {
        self.observer.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<R>> {
        self.observer.subscribe()
    }

    pub fn data(&self) -> Option<R> {
        self.observer.state().data
    }

    /// "Not found" for a 404, otherwise the contextual error.
    pub fn message(&self) -> Option<String> {
        let error = self.observer.state().error?;
        if error.is_not_found() {
            Some(self.not_found.to_string())
        } else {
            Some(error_message(self.context, &error))
        }
    }
}

impl<R: Render + Clone + Send + Sync + 'static> DetailView<R> {
    pub fn lines(&self) -> Vec<String> {
        self.data().map(|data| data.lines()).unwrap_or_default()
    }
}

pub struct DashboardView {
    stats: QueryObserver<StudyStats>,
    recent: QueryObserver<Option<RecentSession>>,
}

impl DashboardView {
    pub fn new(
        stats: QueryObserver<StudyStats>,
        stats_fetch: SingletonFetch<StudyStats>,
        recent: QueryObserver<Option<RecentSession>>,
        recent_fetch: SingletonFetch<Option<RecentSession>>,
    ) -> Self {
        stats.set_query(QueryKey::singleton(Resource::StudyStats), move || stats_fetch());
        recent.set_query(
            QueryKey::singleton(Resource::RecentStudySession),
            move || recent_fetch(),
        );
        Self { stats, recent }
    }

    pub fn stats_state(&self) -> QueryState<StudyStats> {
        self.stats.state()
    }

    pub fn recent_state(&self) -> QueryState<Option<RecentSession>> {
        self.recent.state()
    }

    pub fn stats_lines(&self) -> Vec<String> {
        let state = self.stats.state();
        if let Some(error) = state.error {
            return vec![error_message("study stats", &error)];
        }
        let Some(stats) = state.data else {
            return Vec::new();
        };
        vec![
            format!("Total Vocabulary: {}", stats.total_vocabulary),
            format!("Words Studied: {}", stats.total_words_studied),
            format!("Mastered Words: {}", stats.mastered_words),
            format!("Success Rate: {:.1}%", stats.success_rate * 100.0),
            format!("Study Sessions: {}", stats.total_sessions),
            format!("Active Groups: {}", stats.active_groups),
            format!("Current Streak: {} days", stats.current_streak),
        ]
    }

    pub fn recent_lines(&self) -> Vec<String> {
        let state = self.recent.state();
        if let Some(error) = state.error {
            return vec![error_message("recent session", &error)];
        }
        match state.data {
            Some(Some(session)) => vec![
                format!("Last Session: {}", session.activity_name),
                format!("Started: {}", session.created_at),
                format!("Correct: {}", session.correct_count),
                format!("Wrong: {}", session.wrong_count),
            ],
            Some(None) => vec!["No study sessions yet".to_string()],
            None => Vec::new(),
        }
    }
}
