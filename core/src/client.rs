//! Stateless HTTP request builder and response parser for the vocabulary API.
//!
//! # Design
//! `VocabClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Parsing is the schema boundary: a body that does not decode into the
//! declared type, or a page whose counts disagree, is a `Schema` error.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    GroupDetails, GroupSortKey, GroupWordSortKey, ListParams, NewStudySession, Page,
    RecentSession, ReviewSubmission, SessionCreated, StudySessionSortKey, StudyStats, Word,
    WordEnvelope, WordReview, WordSortKey,
};

/// Synchronous, stateless client for the vocabulary API.
#[derive(Debug, Clone)]
pub struct VocabClient {
    base_url: String,
}

impl VocabClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn build_list_groups(&self, params: &ListParams<GroupSortKey>) -> HttpRequest {
        let mut req = HttpRequest::get(self.url("/groups"));
        req.query = params.to_query();
        req
    }

    pub fn build_get_group(&self, group_id: i64) -> HttpRequest {
        HttpRequest::get(self.url(&format!("/groups/{group_id}")))
    }

    pub fn build_list_group_words(
        &self,
        group_id: i64,
        params: &ListParams<GroupWordSortKey>,
    ) -> HttpRequest {
        let mut req = HttpRequest::get(self.url(&format!("/groups/{group_id}/words")));
        req.query = params.to_query();
        req
    }

    pub fn build_list_group_study_sessions(
        &self,
        group_id: i64,
        params: &ListParams<StudySessionSortKey>,
    ) -> HttpRequest {
        let mut req = HttpRequest::get(self.url(&format!("/groups/{group_id}/study_sessions")));
        req.query = params.to_query();
        req
    }

    pub fn build_list_study_sessions(&self, params: &ListParams<StudySessionSortKey>) -> HttpRequest {
        let mut req = HttpRequest::get(self.url("/study_sessions"));
        req.query = params.to_query();
        req
    }

    pub fn build_list_words(&self, params: &ListParams<WordSortKey>) -> HttpRequest {
        let mut req = HttpRequest::get(self.url("/words"));
        req.query = params.to_query();
        req
    }

    pub fn build_get_word(&self, word_id: i64) -> HttpRequest {
        HttpRequest::get(self.url(&format!("/words/{word_id}")))
    }

    pub fn build_get_study_stats(&self) -> HttpRequest {
        HttpRequest::get(self.url("/dashboard/stats"))
    }

    pub fn build_get_recent_session(&self) -> HttpRequest {
        HttpRequest::get(self.url("/dashboard/recent-session"))
    }

    pub fn build_create_study_session(
        &self,
        input: &NewStudySession,
    ) -> Result<HttpRequest, ApiError> {
        self.json_post("/study_sessions", input)
    }

    pub fn build_submit_review(
        &self,
        session_id: i64,
        reviews: &[WordReview],
    ) -> Result<HttpRequest, ApiError> {
        let input = ReviewSubmission {
            reviews: reviews.to_vec(),
        };
        self.json_post(&format!("/study_sessions/{session_id}/review"), &input)
    }

    fn json_post<B: Serialize>(&self, path: &str, input: &B) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(path),
            query: Vec::new(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Parse any paginated listing (groups, words, study sessions).
    pub fn parse_page<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Page<T>, ApiError> {
        let page: Page<T> = parse_json(response)?;
        page.validate().map_err(ApiError::Schema)?;
        Ok(page)
    }

    pub fn parse_get_group(&self, response: HttpResponse) -> Result<GroupDetails, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_word(&self, response: HttpResponse) -> Result<Word, ApiError> {
        parse_json::<WordEnvelope>(response).map(|envelope| envelope.word)
    }

    pub fn parse_get_study_stats(&self, response: HttpResponse) -> Result<StudyStats, ApiError> {
        parse_json(response)
    }

    /// A JSON `null` body means no session has been recorded yet.
    pub fn parse_get_recent_session(
        &self,
        response: HttpResponse,
    ) -> Result<Option<RecentSession>, ApiError> {
        parse_json(response)
    }

    pub fn parse_create_study_session(
        &self,
        response: HttpResponse,
    ) -> Result<SessionCreated, ApiError> {
        parse_json(response)
    }

    pub fn parse_submit_review(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Schema(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Group, SortOrder};

    fn client() -> VocabClient {
        VocabClient::new("http://localhost:5000/api")
    }

    const GROUPS_BODY: &str = r#"{
        "groups": [
            {"id": 1, "name": "Common Verbs", "word_count": 25,
             "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z"}
        ],
        "total": 1, "page": 1, "per_page": 10, "total_pages": 1
    }"#;

    #[test]
    fn build_list_groups_carries_list_params() {
        let params = ListParams::new(3, 10, GroupSortKey::WordCount, SortOrder::Desc);
        let req = client().build_list_groups(&params);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:5000/api/groups");
        assert_eq!(req.query_param("page"), Some("3"));
        assert_eq!(req.query_param("per_page"), Some("10"));
        assert_eq!(req.query_param("sort_by"), Some("word_count"));
        assert_eq!(req.query_param("order"), Some("desc"));
        assert!(req.body.is_none());
    }

    #[test]
    fn out_of_range_page_is_passed_through() {
        let params = ListParams::new(999, 10, GroupWordSortKey::Quebecois, SortOrder::Asc);
        let req = client().build_list_group_words(4, &params);
        assert_eq!(req.path, "http://localhost:5000/api/groups/4/words");
        assert_eq!(req.query_param("page"), Some("999"));
    }

    #[test]
    fn build_list_study_sessions_targets_global_listing() {
        let params = ListParams::new(2, 5, StudySessionSortKey::GroupName, SortOrder::Asc);
        let req = client().build_list_study_sessions(&params);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:5000/api/study_sessions");
        assert_eq!(
            req.url().unwrap(),
            "http://localhost:5000/api/study_sessions?page=2&per_page=5&sort_by=group_name&order=asc"
        );
    }

    #[test]
    fn build_detail_requests() {
        assert_eq!(
            client().build_get_group(1).path,
            "http://localhost:5000/api/groups/1"
        );
        assert_eq!(
            client().build_get_word(42).path,
            "http://localhost:5000/api/words/42"
        );
        assert_eq!(
            client().build_get_recent_session().path,
            "http://localhost:5000/api/dashboard/recent-session"
        );
    }

    #[test]
    fn build_create_study_session_produces_json_post() {
        let input = NewStudySession {
            group_id: 2,
            study_activity_id: 1,
        };
        let req = client().build_create_study_session(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:5000/api/study_sessions");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["group_id"], 2);
        assert_eq!(body["study_activity_id"], 1);
    }

    #[test]
    fn build_submit_review_wraps_reviews() {
        let reviews = [
            WordReview {
                word_id: 1,
                is_correct: true,
            },
            WordReview {
                word_id: 2,
                is_correct: false,
            },
        ];
        let req = client().build_submit_review(9, &reviews).unwrap();
        assert_eq!(req.path, "http://localhost:5000/api/study_sessions/9/review");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["reviews"][1]["word_id"], 2);
        assert_eq!(body["reviews"][1]["is_correct"], false);
    }

    #[test]
    fn parse_groups_page_success() {
        let page: Page<Group> = client()
            .parse_page(HttpResponse::new(200, GROUPS_BODY))
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Common Verbs");
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn parse_page_rejects_inconsistent_total_pages() {
        let body = r#"{"groups":[],"total":25,"page":1,"per_page":10,"total_pages":2}"#;
        let err = client()
            .parse_page::<Group>(HttpResponse::new(200, body))
            .unwrap_err();
        assert!(matches!(err, ApiError::Schema(_)));
    }

    #[test]
    fn parse_page_rejects_malformed_items() {
        let body = r#"{"groups":[{"id":"one"}],"total":1,"page":1,"per_page":10,"total_pages":1}"#;
        let err = client()
            .parse_page::<Group>(HttpResponse::new(200, body))
            .unwrap_err();
        assert!(matches!(err, ApiError::Schema(_)));
    }

    #[test]
    fn parse_get_group_not_found() {
        let err = client()
            .parse_get_group(HttpResponse::new(404, r#"{"error":"Group not found"}"#))
            .unwrap_err();
        assert_eq!(err, ApiError::NotFound);
    }

    #[test]
    fn parse_get_word_unwraps_envelope() {
        let body = r#"{"word":{"id":3,"quebecois":"blonde","standard_french":"petite amie",
            "english":"girlfriend","correct_count":0,"wrong_count":2,
            "groups":[{"id":1,"name":"Relationships"}]}}"#;
        let word = client().parse_get_word(HttpResponse::new(200, body)).unwrap();
        assert_eq!(word.quebecois, "blonde");
        assert_eq!(word.groups[0].name, "Relationships");
    }

    #[test]
    fn parse_recent_session_null_is_none() {
        let session = client()
            .parse_get_recent_session(HttpResponse::new(200, "null"))
            .unwrap();
        assert!(session.is_none());
    }

    #[test]
    fn parse_server_error_keeps_status_and_body() {
        let err = client()
            .parse_get_study_stats(HttpResponse::new(500, "Database error"))
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 500,
                body: "Database error".to_string()
            }
        );
    }

    #[test]
    fn parse_submit_review_accepts_no_content() {
        assert!(client()
            .parse_submit_review(HttpResponse::new(204, ""))
            .is_ok());
        assert!(client()
            .parse_submit_review(HttpResponse::new(400, "bad"))
            .is_err());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = VocabClient::new("http://localhost:5000/api/");
        assert_eq!(
            client.build_get_study_stats().path,
            "http://localhost:5000/api/dashboard/stats"
        );
    }

    #[test]
    fn parse_bad_json_is_schema_error() {
        let err = client()
            .parse_get_study_stats(HttpResponse::new(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Schema(_)));
    }
}
