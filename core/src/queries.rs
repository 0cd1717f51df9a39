//! Composition root: one API handle and one cache per resource.
//!
//! Every view model is built from here so views of the same resource share
//! cached data and in-flight requests.

use std::sync::Arc;

use futures::future::FutureExt;

use crate::api::VocabApi;
use crate::config::Config;
use crate::error::{FetchError, Resource};
use crate::list_state::ListQueryState;
use crate::query_cache::{QueryCache, QueryObserver};
use crate::transport::Transport;
use crate::types::{
    Group, GroupDetails, GroupSortKey, GroupWordSortKey, ListParams, Page, RecentSession,
    SessionCreated, StudySession, StudySessionSortKey, StudyStats, Word, WordReview, WordSortKey,
};
use crate::views::{DashboardView, DetailView, ListView};

pub type GroupsListView = ListView<GroupSortKey, Group>;
pub type GroupWordsListView = ListView<GroupWordSortKey, Word>;
pub type WordsListView = ListView<WordSortKey, Word>;
pub type GroupStudySessionsView = ListView<StudySessionSortKey, StudySession>;
pub type StudySessionsListView = ListView<StudySessionSortKey, StudySession>;
pub type GroupDetailsView = DetailView<GroupDetails>;
pub type WordDetailsView = DetailView<Word>;

pub struct Queries<T> {
    api: VocabApi<T>,
    per_page: u32,
    groups: QueryCache<Page<Group>>,
    group_details: QueryCache<GroupDetails>,
    group_words: QueryCache<Page<Word>>,
    /// Shared by the global and the per-group session lists.
    sessions: QueryCache<Page<StudySession>>,
    words: QueryCache<Page<Word>>,
    word_details: QueryCache<Word>,
    study_stats: QueryCache<StudyStats>,
    recent_session: QueryCache<Option<RecentSession>>,
}

impl<T: Transport> Queries<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        let list = config.list_stale_time.0;
        let detail = config.detail_stale_time.0;
        let cache_time = config.cache_time.0;
        Self {
            api: VocabApi::new(&config.api_base_url, transport),
            per_page: config.per_page,
            groups: QueryCache::new(list).with_cache_time(cache_time),
            group_details: QueryCache::new(detail).with_cache_time(cache_time),
            group_words: QueryCache::new(list).with_cache_time(cache_time),
            sessions: QueryCache::new(list).with_cache_time(cache_time),
            words: QueryCache::new(list).with_cache_time(cache_time),
            word_details: QueryCache::new(detail).with_cache_time(cache_time),
            study_stats: QueryCache::new(list).with_cache_time(cache_time),
            recent_session: QueryCache::new(list).with_cache_time(cache_time),
        }
    }

    pub fn api(&self) -> &VocabApi<T> {
        &self.api
    }

    pub fn groups_list(&self) -> GroupsListView {
        let api = self.api.clone();
        ListView::new(
            Resource::Groups,
            None,
            "groups",
            ListQueryState::new(self.per_page, GroupSortKey::Name),
            QueryObserver::new(self.groups.clone(), true),
            Arc::new(move |params: ListParams<GroupSortKey>| {
                let api = api.clone();
                async move { api.fetch_groups(&params).await }.boxed()
            }),
        )
    }

    pub fn group_words_list(&self, group_id: i64) -> GroupWordsListView {
        let api = self.api.clone();
        ListView::new(
            Resource::GroupWords,
            Some(group_id),
            "words",
            ListQueryState::new(self.per_page, GroupWordSortKey::Quebecois),
            QueryObserver::new(self.group_words.clone(), true),
            Arc::new(move |params: ListParams<GroupWordSortKey>| {
                let api = api.clone();
                async move { api.fetch_group_words(group_id, &params).await }.boxed()
            }),
        )
    }

    pub fn group_study_sessions_list(&self, group_id: i64) -> GroupStudySessionsView {
        let api = self.api.clone();
        let mut state = ListQueryState::new(self.per_page, StudySessionSortKey::StartTime);
        // Most recent sessions first.
        state.toggle_sort(StudySessionSortKey::StartTime);
        ListView::new(
            Resource::GroupStudySessions,
            Some(group_id),
            "study sessions",
            state,
            QueryObserver::new(self.sessions.clone(), true),
            Arc::new(move |params: ListParams<StudySessionSortKey>| {
                let api = api.clone();
                async move { api.fetch_group_study_sessions(group_id, &params).await }.boxed()
            }),
        )
    }

    /// Every study session, newest first.
    pub fn study_sessions_list(&self) -> StudySessionsListView {
        let api = self.api.clone();
        let mut state = ListQueryState::new(self.per_page, StudySessionSortKey::StartTime);
        state.toggle_sort(StudySessionSortKey::StartTime);
        ListView::new(
            Resource::StudySessions,
            None,
            "study sessions",
            state,
            QueryObserver::new(self.sessions.clone(), true),
            Arc::new(move |params: ListParams<StudySessionSortKey>| {
                let api = api.clone();
                async move { api.fetch_study_sessions(&params).await }.boxed()
            }),
        )
    }

    pub fn words_list(&self) -> WordsListView {
        let api = self.api.clone();
        ListView::new(
            Resource::Words,
            None,
            "words",
            ListQueryState::new(self.per_page, WordSortKey::Quebecois),
            QueryObserver::new(self.words.clone(), true),
            Arc::new(move |params: ListParams<WordSortKey>| {
                let api = api.clone();
                async move { api.fetch_words(&params).await }.boxed()
            }),
        )
    }

    pub fn group_details(&self, group_id: i64) -> GroupDetailsView {
        let api = self.api.clone();
        DetailView::new(
            Resource::GroupDetails,
            "group details",
            "Group not found",
            group_id,
            QueryObserver::new(self.group_details.clone(), false),
            Arc::new(move |id: i64| {
                let api = api.clone();
                async move { api.fetch_group_details(id).await }.boxed()
            }),
        )
    }

    pub fn word_details(&self, word_id: i64) -> WordDetailsView {
        let api = self.api.clone();
        DetailView::new(
            Resource::WordDetails,
            "word",
            "Word not found",
            word_id,
            QueryObserver::new(self.word_details.clone(), false),
            Arc::new(move |id: i64| {
                let api = api.clone();
                async move { api.fetch_word_details(id).await }.boxed()
            }),
        )
    }

    pub fn dashboard(&self) -> DashboardView {
        let stats_api = self.api.clone();
        let recent_api = self.api.clone();
        DashboardView::new(
            QueryObserver::new(self.study_stats.clone(), false),
            Arc::new(move || {
                let api = stats_api.clone();
                async move { api.fetch_study_stats().await }.boxed()
            }),
            QueryObserver::new(self.recent_session.clone(), false),
            Arc::new(move || {
                let api = recent_api.clone();
                async move { api.fetch_recent_study_session().await }.boxed()
            }),
        )
    }

    /// Start a study session; the group's session list and the dashboard are
    /// marked stale.
    pub async fn start_study_session(
        &self,
        group_id: i64,
        study_activity_id: i64,
    ) -> Result<SessionCreated, FetchError> {
        let created = self
            .api
            .create_study_session(group_id, study_activity_id)
            .await?;
        self.sessions
            .invalidate_resource(Resource::GroupStudySessions)
            .await;
        self.sessions
            .invalidate_resource(Resource::StudySessions)
            .await;
        self.recent_session
            .invalidate_resource(Resource::RecentStudySession)
            .await;
        Ok(created)
    }

    /// Submit reviews; word counters and stats are marked stale.
    pub async fn submit_reviews(
        &self,
        session_id: i64,
        reviews: &[WordReview],
    ) -> Result<(), FetchError> {
        self.api
            .submit_study_session_review(session_id, reviews)
            .await?;
        self.word_details
            .invalidate_resource(Resource::WordDetails)
            .await;
        self.group_words
            .invalidate_resource(Resource::GroupWords)
            .await;
        self.words.invalidate_resource(Resource::Words).await;
        self.study_stats
            .invalidate_resource(Resource::StudyStats)
            .await;
        self.recent_session
            .invalidate_resource(Resource::RecentStudySession)
            .await;
        Ok(())
    }
}
