//! Async resource fetchers.
//!
//! `VocabApi` pairs the stateless `VocabClient` with a `Transport`. Each
//! fetcher maps typed parameters to a typed response and never catches: any
//! transport, status or schema failure comes back as a `FetchError` tagged
//! with the resource.

use std::sync::Arc;

use tracing::debug;

use crate::client::VocabClient;
use crate::error::{ApiError, FetchError, Resource};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{
    Group, GroupDetails, GroupSortKey, GroupWordSortKey, ListParams, NewStudySession, Page,
    RecentSession, SessionCreated, StudySession, StudySessionSortKey, StudyStats, Word,
    WordReview, WordSortKey,
};

pub struct VocabApi<T> {
    client: VocabClient,
    transport: Arc<T>,
}

impl<T> Clone for VocabApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> VocabApi<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            client: VocabClient::new(base_url),
            transport: Arc::new(transport),
        }
    }

    pub fn client(&self) -> &VocabClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn execute(
        &self,
        resource: Resource,
        request: HttpRequest,
    ) -> Result<HttpResponse, FetchError> {
        debug!(%resource, path = %request.path, "fetching");
        self.transport
            .execute(request)
            .await
            .map_err(|e| FetchError::new(resource, e))
    }

    async fn fetch<R>(
        &self,
        resource: Resource,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&VocabClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, FetchError> {
        let request = request.map_err(|e| FetchError::new(resource, e))?;
        let response = self.execute(resource, request).await?;
        parse(&self.client, response).map_err(|e| FetchError::new(resource, e))
    }

    pub async fn fetch_groups(
        &self,
        params: &ListParams<GroupSortKey>,
    ) -> Result<Page<Group>, FetchError> {
        self.fetch(
            Resource::Groups,
            Ok(self.client.build_list_groups(params)),
            VocabClient::parse_page,
        )
        .await
    }

    pub async fn fetch_group_details(&self, group_id: i64) -> Result<GroupDetails, FetchError> {
        self.fetch(
            Resource::GroupDetails,
            Ok(self.client.build_get_group(group_id)),
            VocabClient::parse_get_group,
        )
        .await
    }

    pub async fn fetch_group_words(
        &self,
        group_id: i64,
        params: &ListParams<GroupWordSortKey>,
    ) -> Result<Page<Word>, FetchError> {
        self.fetch(
            Resource::GroupWords,
            Ok(self.client.build_list_group_words(group_id, params)),
            VocabClient::parse_page,
        )
        .await
    }

    pub async fn fetch_group_study_sessions(
        &self,
        group_id: i64,
        params: &ListParams<StudySessionSortKey>,
    ) -> Result<Page<StudySession>, FetchError> {
        self.fetch(
            Resource::GroupStudySessions,
            Ok(self.client.build_list_group_study_sessions(group_id, params)),
            VocabClient::parse_page,
        )
        .await
    }

    pub async fn fetch_study_sessions(
        &self,
        params: &ListParams<StudySessionSortKey>,
    ) -> Result<Page<StudySession>, FetchError> {
        self.fetch(
            Resource::StudySessions,
            Ok(self.client.build_list_study_sessions(params)),
            VocabClient::parse_page,
        )
        .await
    }

    pub async fn fetch_words(
        &self,
        params: &ListParams<WordSortKey>,
    ) -> Result<Page<Word>, FetchError> {
        self.fetch(
            Resource::Words,
            Ok(self.client.build_list_words(params)),
            VocabClient::parse_page,
        )
        .await
    }

    pub async fn fetch_word_details(&self, word_id: i64) -> Result<Word, FetchError> {
        self.fetch(
            Resource::WordDetails,
            Ok(self.client.build_get_word(word_id)),
            VocabClient::parse_get_word,
        )
        .await
    }

    pub async fn fetch_study_stats(&self) -> Result<StudyStats, FetchError> {
        self.fetch(
            Resource::StudyStats,
            Ok(self.client.build_get_study_stats()),
            VocabClient::parse_get_study_stats,
        )
        .await
    }

    pub async fn fetch_recent_study_session(&self) -> Result<Option<RecentSession>, FetchError> {
        self.fetch(
            Resource::RecentStudySession,
            Ok(self.client.build_get_recent_session()),
            VocabClient::parse_get_recent_session,
        )
        .await
    }

    pub async fn create_study_session(
        &self,
        group_id: i64,
        study_activity_id: i64,
    ) -> Result<SessionCreated, FetchError> {
        let input = NewStudySession {
            group_id,
            study_activity_id,
        };
        self.fetch(
            Resource::CreateStudySession,
            self.client.build_create_study_session(&input),
            VocabClient::parse_create_study_session,
        )
        .await
    }

    pub async fn submit_study_session_review(
        &self,
        session_id: i64,
        reviews: &[WordReview],
    ) -> Result<(), FetchError> {
        self.fetch(
            Resource::StudySessionReview,
            self.client.build_submit_review(session_id, reviews),
            VocabClient::parse_submit_review,
        )
        .await
    }
}
