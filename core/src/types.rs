//! Domain DTOs for the vocabulary API.
//!
//! # Design
//! These types mirror the backend's JSON but are defined independently from
//! the mock-server crate; integration tests catch schema drift. Everything is
//! read-only from the client's point of view except the two study-session
//! payloads.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A word group as it appears in the groups list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub word_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// A single group with its optional study statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupDetails {
    pub id: i64,
    pub name: String,
    pub word_count: u32,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_studied_at: Option<String>,
    /// Fraction in `[0, 1]`.
    #[serde(default)]
    pub success_rate: Option<f64>,
}

/// Back-reference from a word to a group containing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordGroup {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    pub id: i64,
    pub quebecois: String,
    pub standard_french: String,
    pub english: String,
    #[serde(default)]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub usage_notes: Option<String>,
    pub correct_count: u32,
    pub wrong_count: u32,
    #[serde(default)]
    pub groups: Vec<WordGroup>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Envelope returned by `GET /words/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordEnvelope {
    pub word: Word,
}

/// One page of a paginated listing.
///
/// Endpoints name the item list after the resource (`groups`, `words`,
/// `study_sessions`, or plain `items`); some report `total_words` / `current_page` instead of
/// `total` / `page`. All spellings decode into the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    #[serde(alias = "groups", alias = "words", alias = "study_sessions", alias = "items")]
    pub items: Vec<T>,
    #[serde(alias = "total_words")]
    pub total: u32,
    #[serde(alias = "current_page")]
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Check the pagination invariants the server promises.
    pub fn validate(&self) -> Result<(), String> {
        if self.per_page == 0 {
            return Err("per_page must be at least 1".to_string());
        }
        if self.page == 0 {
            return Err("page must be at least 1".to_string());
        }
        let expected = self.total.div_ceil(self.per_page);
        if self.total_pages != expected {
            return Err(format!(
                "total_pages is {} but {} items at {} per page make {expected}",
                self.total_pages, self.total, self.per_page
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyStats {
    pub total_vocabulary: u32,
    pub total_words_studied: u32,
    pub mastered_words: u32,
    pub success_rate: f64,
    pub total_sessions: u32,
    pub active_groups: u32,
    pub current_streak: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentSession {
    pub id: i64,
    pub group_id: i64,
    pub activity_name: String,
    pub created_at: String,
    pub correct_count: u32,
    pub wrong_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudySession {
    pub id: i64,
    pub group_id: i64,
    pub group_name: String,
    #[serde(alias = "study_activity_id")]
    pub activity_id: i64,
    pub activity_name: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    pub review_items_count: u32,
}

/// Request payload for `POST /study_sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewStudySession {
    pub group_id: i64,
    pub study_activity_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCreated {
    pub session_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordReview {
    pub word_id: i64,
    pub is_correct: bool,
}

/// Request payload for `POST /study_sessions/{id}/review`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub reviews: Vec<WordReview>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// A sortable column of some listing.
pub trait SortKey: Copy + Eq + Debug + Serialize + Send + Sync + 'static {
    /// Wire value for the `sort_by` parameter.
    fn as_str(&self) -> &'static str;

    /// Column header shown for this key.
    fn label(&self) -> &'static str;
}

macro_rules! sort_key {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($wire:literal, $label:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl SortKey for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

sort_key!(
    /// Columns of the groups list.
    GroupSortKey {
        Name => ("name", "Name"),
        WordCount => ("word_count", "Words"),
        CreatedAt => ("created_at", "Created"),
    }
);

sort_key!(
    /// Columns of a group's word list.
    GroupWordSortKey {
        Quebecois => ("quebecois", "Term"),
        StandardFrench => ("standard_french", "Definition"),
        CreatedAt => ("created_at", "Added Date"),
    }
);

sort_key!(
    /// Columns of the all-words list.
    WordSortKey {
        Quebecois => ("quebecois", "Québécois"),
        StandardFrench => ("standard_french", "Standard French"),
        English => ("english", "English"),
        CorrectCount => ("correct_count", "Correct"),
        WrongCount => ("wrong_count", "Wrong"),
    }
);

sort_key!(
    StudySessionSortKey {
        Id => ("id", "ID"),
        ActivityName => ("activity_name", "Activity"),
        GroupName => ("group_name", "Group"),
        StartTime => ("start_time", "Start Time"),
        EndTime => ("end_time", "End Time"),
        ReviewItemsCount => ("review_items_count", "Review Items"),
    }
);

/// Request parameters of a paginated, sorted listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListParams<K: SortKey> {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: K,
    pub order: SortOrder,
}

impl<K: SortKey> ListParams<K> {
    pub fn new(page: u32, per_page: u32, sort_by: K, order: SortOrder) -> Self {
        Self {
            page,
            per_page,
            sort_by,
            order,
        }
    }

    /// Query pairs in the order the front end has always sent them.
    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
            ("sort_by".to_string(), self.sort_by.as_str().to_string()),
            ("order".to_string(), self.order.as_str().to_string()),
        ]
    }
}
