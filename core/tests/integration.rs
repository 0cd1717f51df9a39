//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and drives the core over
//! real HTTP with `ReqwestTransport`. Every response passes through the same
//! schema checks the front end relies on, so drift between the two crates
//! shows up here.

use vocab_core::{
    Config, GroupSortKey, GroupWordSortKey, ListParams, Queries, ReqwestTransport, SortOrder,
    StudySessionSortKey, VocabApi, WordReview, WordSortKey,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

async fn api() -> VocabApi<ReqwestTransport> {
    let base_url = start_server().await;
    VocabApi::new(&base_url, ReqwestTransport::new().unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn browse_groups_and_words() {
    let api = api().await;

    let groups = api
        .fetch_groups(&ListParams::new(1, 10, GroupSortKey::Name, SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(groups.total, 3);
    assert_eq!(groups.total_pages, 1);
    assert_eq!(groups.items[0].name, "Common Verbs");

    let details = api.fetch_group_details(groups.items[0].id).await.unwrap();
    assert_eq!(details.word_count, 3);
    assert_eq!(details.description.as_deref(), Some("Everyday actions"));
    assert_eq!(details.success_rate, None);

    let words = api
        .fetch_group_words(
            details.id,
            &ListParams::new(1, 2, GroupWordSortKey::StandardFrench, SortOrder::Desc),
        )
        .await
        .unwrap();
    assert_eq!(words.total, 3);
    assert_eq!(words.total_pages, 2);
    assert_eq!(words.items[0].standard_french, "vérifier");

    let word = api.fetch_word_details(words.items[0].id).await.unwrap();
    assert_eq!(word.quebecois, "checker");
    assert_eq!(word.groups[0].name, "Common Verbs");

    let all = api
        .fetch_words(&ListParams::new(2, 5, WordSortKey::English, SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(all.page, 2);
    assert_eq!(all.items.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_records_are_not_found() {
    let api = api().await;

    let err = api.fetch_group_details(404).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "resource not found");

    let err = api.fetch_word_details(404).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread")]
async fn study_session_lifecycle() {
    let api = api().await;

    assert_eq!(api.fetch_recent_study_session().await.unwrap(), None);

    let created = api.create_study_session(1, 1).await.unwrap();
    api.submit_study_session_review(
        created.session_id,
        &[
            WordReview {
                word_id: 1,
                is_correct: true,
            },
            WordReview {
                word_id: 3,
                is_correct: true,
            },
            WordReview {
                word_id: 2,
                is_correct: false,
            },
        ],
    )
    .await
    .unwrap();

    let recent = api.fetch_recent_study_session().await.unwrap().unwrap();
    assert_eq!(recent.id, created.session_id);
    assert_eq!(recent.correct_count, 2);
    assert_eq!(recent.wrong_count, 1);

    let stats = api.fetch_study_stats().await.unwrap();
    assert_eq!(stats.total_sessions, 1);
    assert_eq!(stats.total_words_studied, 3);

    let sessions = api
        .fetch_group_study_sessions(
            1,
            &ListParams::new(1, 10, StudySessionSortKey::StartTime, SortOrder::Desc),
        )
        .await
        .unwrap();
    assert_eq!(sessions.items.len(), 1);
    assert_eq!(sessions.items[0].activity_name, "Flashcards");
    assert_eq!(sessions.items[0].review_items_count, 3);

    let second = api.create_study_session(2, 2).await.unwrap();
    let everything = api
        .fetch_study_sessions(&ListParams::new(
            1,
            10,
            StudySessionSortKey::Id,
            SortOrder::Desc,
        ))
        .await
        .unwrap();
    assert_eq!(everything.total, 2);
    let ids: Vec<i64> = everything.items.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![second.session_id, created.session_id]);
    assert_eq!(everything.items[0].activity_name, "Matching");
}

#[tokio::test(flavor = "multi_thread")]
async fn group_details_page_over_http() {
    let base_url = start_server().await;
    let config = Config {
        api_base_url: base_url,
        ..Config::default()
    };
    let queries = Queries::new(&config, ReqwestTransport::new().unwrap());

    let details = queries.group_details(3);
    details
        .subscribe()
        .wait_for(|s| s.is_settled_for(&details.current_key()))
        .await
        .unwrap();
    assert_eq!(details.lines()[0], "Slang");
    assert!(details.lines().contains(&"Words: 4".to_string()));

    let mut words = queries.group_words_list(3);
    words
        .subscribe()
        .wait_for(|s| s.is_settled_for(&words.current_key()))
        .await
        .unwrap();
    let terms: Vec<String> = words.rows().into_iter().map(|w| w.quebecois).collect();
    assert_eq!(terms, ["blonde", "char", "jaser", "pogner"]);

    words.toggle_sort(GroupWordSortKey::Quebecois);
    words
        .subscribe()
        .wait_for(|s| s.is_settled_for(&words.current_key()))
        .await
        .unwrap();
    let terms: Vec<String> = words.rows().into_iter().map(|w| w.quebecois).collect();
    assert_eq!(terms, ["pogner", "jaser", "char", "blonde"]);

    let missing = queries.group_details(77);
    missing
        .subscribe()
        .wait_for(|s| s.is_settled_for(&missing.current_key()))
        .await
        .unwrap();
    assert_eq!(missing.message().as_deref(), Some("Group not found"));
}
