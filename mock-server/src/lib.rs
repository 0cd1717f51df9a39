use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Word {
    pub id: i64,
    pub quebecois: String,
    pub standard_french: String,
    pub english: String,
    pub pronunciation: Option<String>,
    pub usage_notes: Option<String>,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub created_at: String,
    pub group_ids: Vec<i64>,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: i64,
    pub group_id: i64,
    pub study_activity_id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub reviews: Vec<Review>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Review {
    pub word_id: i64,
    pub is_correct: bool,
}

#[derive(Deserialize)]
pub struct CreateSession {
    pub group_id: i64,
    pub study_activity_id: i64,
}

#[derive(Deserialize)]
pub struct SubmitReviews {
    pub reviews: Vec<Review>,
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub groups: BTreeMap<i64, Group>,
    pub words: BTreeMap<i64, Word>,
    pub sessions: BTreeMap<i64, Session>,
    pub activities: BTreeMap<i64, String>,
}

impl Store {
    /// A small Québécois vocabulary spread over three groups.
    pub fn seeded() -> Self {
        let mut store = Store::default();
        store.activities.insert(1, "Flashcards".to_string());
        store.activities.insert(2, "Matching".to_string());

        let groups = [
            (1, "Common Verbs", Some("Everyday actions")),
            (2, "Food", None),
            (3, "Slang", Some("Expressions you will hear in Montréal")),
        ];
        for (id, name, description) in groups {
            store.groups.insert(
                id,
                Group {
                    id,
                    name: name.to_string(),
                    description: description.map(str::to_string),
                    created_at: format!("2024-01-0{id}T09:00:00Z"),
                    updated_at: format!("2024-02-0{id}T09:00:00Z"),
                },
            );
        }

        let words = [
            (1, "jaser", "bavarder", "to chat", vec![1, 3]),
            (2, "checker", "vérifier", "to check", vec![1]),
            (3, "pogner", "attraper", "to catch", vec![1, 3]),
            (4, "poutine", "poutine", "poutine", vec![2]),
            (5, "bleuet", "myrtille", "blueberry", vec![2]),
            (6, "char", "voiture", "car", vec![3]),
            (7, "blonde", "petite amie", "girlfriend", vec![3]),
        ];
        for (id, quebecois, standard_french, english, group_ids) in words {
            store.words.insert(
                id,
                Word {
                    id,
                    quebecois: quebecois.to_string(),
                    standard_french: standard_french.to_string(),
                    english: english.to_string(),
                    pronunciation: None,
                    usage_notes: None,
                    correct_count: 0,
                    wrong_count: 0,
                    created_at: format!("2024-03-0{id}T12:00:00Z"),
                    group_ids,
                },
            );
        }
        store
    }

    fn word_count(&self, group_id: i64) -> usize {
        self.words
            .values()
            .filter(|w| w.group_ids.contains(&group_id))
            .count()
    }

    fn group_json(&self, group: &Group) -> Value {
        json!({
            "id": group.id,
            "name": group.name,
            "word_count": self.word_count(group.id),
            "created_at": group.created_at,
            "updated_at": group.updated_at,
        })
    }

    fn word_json(&self, word: &Word) -> Value {
        let groups: Vec<Value> = word
            .group_ids
            .iter()
            .filter_map(|id| self.groups.get(id))
            .map(|g| json!({ "id": g.id, "name": g.name }))
            .collect();
        json!({
            "id": word.id,
            "quebecois": word.quebecois,
            "standard_french": word.standard_french,
            "english": word.english,
            "pronunciation": word.pronunciation,
            "usage_notes": word.usage_notes,
            "correct_count": word.correct_count,
            "wrong_count": word.wrong_count,
            "groups": groups,
            "created_at": word.created_at,
        })
    }

    fn session_json(&self, session: &Session) -> Value {
        json!({
            "id": session.id,
            "group_id": session.group_id,
            "group_name": self.groups.get(&session.group_id).map(|g| g.name.as_str()),
            "activity_id": session.study_activity_id,
            "activity_name": self.activity_name(session.study_activity_id),
            "start_time": session.start_time,
            "end_time": session.end_time,
            "review_items_count": session.reviews.len(),
        })
    }

    fn activity_name(&self, id: i64) -> &str {
        self.activities.get(&id).map(String::as_str).unwrap_or_default()
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error body in the backend's `{"error": ...}` shape.
#[derive(Debug)]
pub struct ApiFailure(StatusCode, String);

impl ApiFailure {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, message.into())
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, message.into())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/groups", get(list_groups))
        .route("/groups/{id}", get(get_group))
        .route("/groups/{id}/words", get(list_group_words))
        .route("/groups/{id}/study_sessions", get(list_group_sessions))
        .route("/words", get(list_words))
        .route("/words/{id}", get(get_word))
        .route("/study_sessions", get(list_sessions).post(create_session))
        .route("/study_sessions/{id}/review", post(submit_review))
        .route("/dashboard/stats", get(study_stats))
        .route("/dashboard/recent-session", get(recent_session))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Validated paging and sorting for one listing.
struct Paging {
    page: usize,
    per_page: usize,
    sort_by: String,
    desc: bool,
}

impl Paging {
    fn parse(query: ListQuery, columns: &[&str], default_sort: &str) -> Result<Self, ApiFailure> {
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(ApiFailure::bad_request("Page number must be positive"));
        }
        let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
        let sort_by = query.sort_by.unwrap_or_else(|| default_sort.to_string());
        if !columns.contains(&sort_by.as_str()) {
            return Err(ApiFailure::bad_request(format!(
                "Invalid sort_by parameter. Must be one of: {}",
                columns.join(", ")
            )));
        }
        let desc = match query.order.as_deref().unwrap_or("asc") {
            "asc" => false,
            "desc" => true,
            _ => {
                return Err(ApiFailure::bad_request(
                    "Invalid order parameter. Must be 'asc' or 'desc'",
                ))
            }
        };
        Ok(Self {
            page: page as usize,
            per_page: per_page as usize,
            sort_by,
            desc,
        })
    }

    /// Sort rows by the requested column (ties broken by id) and cut the page.
    fn apply(&self, name: &str, mut rows: Vec<Value>) -> Value {
        let column = self.sort_by.as_str();
        rows.sort_by(|a, b| {
            compare(&a[column], &b[column]).then_with(|| compare(&a["id"], &b["id"]))
        });
        if self.desc {
            rows.reverse();
        }
        let total = rows.len();
        let total_pages = total.div_ceil(self.per_page);
        let items: Vec<Value> = rows
            .into_iter()
            .skip((self.page - 1).saturating_mul(self.per_page))
            .take(self.per_page)
            .collect();
        let mut body = json!({
            "total": total,
            "page": self.page,
            "per_page": self.per_page,
            "total_pages": total_pages,
        });
        body[name] = Value::Array(items);
        body
    }
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Null, Value::Null) => std::cmp::Ordering::Equal,
        (Value::Null, _) => std::cmp::Ordering::Less,
        (_, Value::Null) => std::cmp::Ordering::Greater,
        _ => std::cmp::Ordering::Equal,
    }
}

const GROUP_COLUMNS: &[&str] = &["name", "word_count", "created_at"];
const GROUP_WORD_COLUMNS: &[&str] = &["quebecois", "standard_french", "created_at"];
const WORD_COLUMNS: &[&str] = &[
    "quebecois",
    "standard_french",
    "english",
    "correct_count",
    "wrong_count",
];
const SESSION_COLUMNS: &[&str] = &[
    "id",
    "activity_name",
    "group_name",
    "start_time",
    "end_time",
    "review_items_count",
];

async fn list_groups(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let paging = Paging::parse(query, GROUP_COLUMNS, "name")?;
    let store = db.read().await;
    let rows = store.groups.values().map(|g| store.group_json(g)).collect();
    Ok(Json(paging.apply("groups", rows)))
}

async fn get_group(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    let group = store
        .groups
        .get(&id)
        .ok_or_else(|| ApiFailure::not_found("Group not found"))?;

    let mut body = store.group_json(group);
    body["description"] = json!(group.description);

    let (correct, wrong) = store
        .words
        .values()
        .filter(|w| w.group_ids.contains(&id))
        .fold((0u32, 0u32), |(c, w), word| {
            (c + word.correct_count, w + word.wrong_count)
        });
    if correct + wrong > 0 {
        body["success_rate"] = json!(f64::from(correct) / f64::from(correct + wrong));
    }
    if let Some(last) = store.sessions.values().rev().find(|s| s.group_id == id) {
        body["last_studied_at"] = json!(last.start_time);
    }
    Ok(Json(body))
}

async fn list_group_words(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let paging = Paging::parse(query, GROUP_WORD_COLUMNS, "quebecois")?;
    let store = db.read().await;
    if !store.groups.contains_key(&id) {
        return Err(ApiFailure::not_found("Group not found"));
    }
    let rows = store
        .words
        .values()
        .filter(|w| w.group_ids.contains(&id))
        .map(|w| store.word_json(w))
        .collect();
    Ok(Json(paging.apply("words", rows)))
}

async fn list_group_sessions(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let paging = Paging::parse(query, SESSION_COLUMNS, "start_time")?;
    let store = db.read().await;
    if !store.groups.contains_key(&id) {
        return Err(ApiFailure::not_found("Group not found"));
    }
    let rows = store
        .sessions
        .values()
        .filter(|s| s.group_id == id)
        .map(|s| store.session_json(s))
        .collect();
    Ok(Json(paging.apply("study_sessions", rows)))
}

async fn list_sessions(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let paging = Paging::parse(query, SESSION_COLUMNS, "start_time")?;
    let store = db.read().await;
    let rows = store.sessions.values().map(|s| store.session_json(s)).collect();
    Ok(Json(paging.apply("study_sessions", rows)))
}

async fn list_words(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let paging = Paging::parse(query, WORD_COLUMNS, "quebecois")?;
    let store = db.read().await;
    let rows = store.words.values().map(|w| store.word_json(w)).collect();
    Ok(Json(paging.apply("words", rows)))
}

async fn get_word(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    let word = store
        .words
        .get(&id)
        .ok_or_else(|| ApiFailure::not_found("Word not found"))?;
    Ok(Json(json!({ "word": store.word_json(word) })))
}

async fn create_session(
    State(db): State<Db>,
    Json(input): Json<CreateSession>,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    let mut store = db.write().await;
    if !store.groups.contains_key(&input.group_id) {
        return Err(ApiFailure::not_found("Group not found"));
    }
    if !store.activities.contains_key(&input.study_activity_id) {
        return Err(ApiFailure::bad_request("Unknown study activity"));
    }
    let id = store.sessions.keys().next_back().copied().unwrap_or(0) + 1;
    store.sessions.insert(
        id,
        Session {
            id,
            group_id: input.group_id,
            study_activity_id: input.study_activity_id,
            start_time: format!("2024-04-01T{:02}:00:00Z", id % 24),
            end_time: None,
            reviews: Vec::new(),
        },
    );
    tracing::info!(session_id = id, group_id = input.group_id, "study session created");
    Ok((StatusCode::CREATED, Json(json!({ "session_id": id }))))
}

async fn submit_review(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<SubmitReviews>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    if !store.sessions.contains_key(&id) {
        return Err(ApiFailure::not_found("Study session not found"));
    }
    if let Some(missing) = input
        .reviews
        .iter()
        .find(|r| !store.words.contains_key(&r.word_id))
    {
        return Err(ApiFailure::bad_request(format!(
            "Unknown word id {}",
            missing.word_id
        )));
    }
    for review in &input.reviews {
        if let Some(word) = store.words.get_mut(&review.word_id) {
            if review.is_correct {
                word.correct_count += 1;
            } else {
                word.wrong_count += 1;
            }
        }
    }
    if let Some(session) = store.sessions.get_mut(&id) {
        session.reviews.extend(input.reviews);
        session.end_time = Some(session.start_time.replace(":00:00Z", ":30:00Z"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn study_stats(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let studied = store
        .words
        .values()
        .filter(|w| w.correct_count + w.wrong_count > 0);
    let (correct, wrong) = studied
        .clone()
        .fold((0u32, 0u32), |(c, w), word| {
            (c + word.correct_count, w + word.wrong_count)
        });
    let mastered = studied
        .clone()
        .filter(|w| w.correct_count >= 3 && w.correct_count >= 4 * w.wrong_count)
        .count();
    let success_rate = if correct + wrong > 0 {
        f64::from(correct) / f64::from(correct + wrong)
    } else {
        0.0
    };
    let active_groups = store
        .groups
        .keys()
        .filter(|id| store.sessions.values().any(|s| s.group_id == **id))
        .count();
    let current_streak = store
        .sessions
        .values()
        .rev()
        .take_while(|s| !s.reviews.is_empty())
        .count();

    Json(json!({
        "total_vocabulary": store.words.len(),
        "total_words_studied": studied.count(),
        "mastered_words": mastered,
        "success_rate": success_rate,
        "total_sessions": store.sessions.len(),
        "active_groups": active_groups,
        "current_streak": current_streak,
    }))
}

async fn recent_session(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let Some(session) = store.sessions.values().next_back() else {
        return Json(Value::Null);
    };
    let correct = session.reviews.iter().filter(|r| r.is_correct).count();
    Json(json!({
        "id": session.id,
        "group_id": session.group_id,
        "activity_name": store.activity_name(session.study_activity_id),
        "created_at": session.start_time,
        "correct_count": correct,
        "wrong_count": session.reviews.len() - correct,
    }))
}
