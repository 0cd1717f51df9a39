//! The single routing table of the front end: path to page.
//!
//! Detail pages receive their identifier from the path; nothing else is
//! shared between pages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    GroupsList,
    GroupDetails { id: i64 },
    WordsList,
    WordShow { id: i64 },
    StudySessions,
}

/// One row of the table. `:id` marks the numeric path parameter.
struct Entry {
    pattern: &'static str,
    build: fn(Option<i64>) -> Route,
}

const TABLE: &[Entry] = &[
    Entry {
        pattern: "/",
        build: |_| Route::Dashboard,
    },
    Entry {
        pattern: "/groups",
        build: |_| Route::GroupsList,
    },
    Entry {
        pattern: "/groups/:id",
        build: |id| Route::GroupDetails { id: id.unwrap_or_default() },
    },
    Entry {
        pattern: "/words",
        build: |_| Route::WordsList,
    },
    Entry {
        pattern: "/words/:id",
        build: |id| Route::WordShow { id: id.unwrap_or_default() },
    },
    Entry {
        pattern: "/study-sessions",
        build: |_| Route::StudySessions,
    },
];

impl Route {
    /// Match `path` against the table. Trailing slashes and query strings
    /// are ignored; ids must be positive integers.
    pub fn resolve(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        TABLE.iter().find_map(|entry| {
            let pattern: Vec<&str> = entry
                .pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            if pattern.len() != segments.len() {
                return None;
            }
            let mut id = None;
            for (expected, actual) in pattern.iter().zip(&segments) {
                if *expected == ":id" {
                    id = Some(actual.parse::<i64>().ok().filter(|n| *n > 0)?);
                } else if expected != actual {
                    return None;
                }
            }
            Some((entry.build)(id))
        })
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            Route::GroupsList => "/groups".to_string(),
            Route::GroupDetails { id } => format!("/groups/{id}"),
            Route::WordsList => "/words".to_string(),
            Route::WordShow { id } => format!("/words/{id}"),
            Route::StudySessions => "/study-sessions".to_string(),
        }
    }
}
