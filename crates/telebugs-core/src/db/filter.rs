//! Conjunctive `WHERE` clause builder with numbered placeholders.
//!
//! The project-scope predicate is always the first condition. Caller values
//! only ever reach SQL as bound parameters; the builder emits `?N` markers and
//! static column names.

use rusqlite::types::Value;
use std::fmt::Write as _;

/// Escape `LIKE` wildcards so the caller's text matches literally.
///
/// Pair the result with `ESCAPE '\'`.
#[must_use]
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Turn free text into an FTS5 query that cannot produce a syntax error.
///
/// Each whitespace-separated word becomes a quoted phrase; a trailing `*` on a
/// word is kept outside the quotes so prefix matching still works. Words with
/// no letters or digits are dropped. Returns `None` when nothing searchable is
/// left.
#[must_use]
pub fn fts_terms(raw: &str) -> Option<String> {
    let mut terms = Vec::new();
    for word in raw.split_whitespace() {
        let (stem, prefix) = word
            .strip_suffix('*')
            .map_or((word, false), |stem| (stem, true));
        let stem = stem.trim_end_matches('*');
        // punctuation-only words tokenize to nothing
        if !stem.chars().any(char::is_alphanumeric) {
            continue;
        }
        let quoted = format!("\"{}\"", stem.replace('"', "\"\""));
        terms.push(if prefix { format!("{quoted}*") } else { quoted });
    }

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Limit/offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

impl Page {
    #[must_use]
    pub const fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }
}

/// Accumulates `AND`-joined predicates and their parameters.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl QueryFilter {
    /// Start a filter whose first predicate is `column IN (...)` over `projects`.
    ///
    /// An empty scope yields a predicate that matches nothing.
    #[must_use]
    pub fn scoped(column: &'static str, projects: &[i64]) -> Self {
        let mut filter = Self {
            conditions: Vec::new(),
            params: Vec::with_capacity(projects.len()),
        };

        if projects.is_empty() {
            filter.conditions.push("0 = 1".to_string());
            return filter;
        }

        let mut placeholders = String::new();
        for (i, project) in projects.iter().enumerate() {
            let slot = filter.bind(Value::Integer(*project));
            if i > 0 {
                placeholders.push_str(", ");
            }
            placeholders.push_str(&slot);
        }
        filter.conditions.push(format!("{column} IN ({placeholders})"));
        filter
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    /// `column = value`.
    pub fn eq(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        let slot = self.bind(value.into());
        self.conditions.push(format!("{column} = {slot}"));
        self
    }

    /// Case-insensitive (ASCII) substring match on `column`.
    pub fn contains(&mut self, column: &'static str, needle: &str) -> &mut Self {
        let slot = self.bind(Value::Text(format!("%{}%", escape_like(needle))));
        self.conditions
            .push(format!("{column} LIKE {slot} ESCAPE '\\'"));
        self
    }

    /// Inclusive lower bound.
    pub fn at_least(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        let slot = self.bind(value.into());
        self.conditions.push(format!("{column} >= {slot}"));
        self
    }

    /// Inclusive upper bound.
    pub fn at_most(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        let slot = self.bind(value.into());
        self.conditions.push(format!("{column} <= {slot}"));
        self
    }

    /// A fixed predicate with no parameters.
    pub fn raw(&mut self, predicate: &'static str) -> &mut Self {
        self.conditions.push(predicate.to_string());
        self
    }

    /// Restrict `id_column` to rows of the `group_search_index` FTS table
    /// matching `fts_query` (already quoted, see [`fts_terms`]).
    pub fn fts_match(&mut self, id_column: &'static str, fts_query: String) -> &mut Self {
        let slot = self.bind(Value::Text(fts_query));
        self.conditions.push(format!(
            "{id_column} IN (SELECT rowid FROM group_search_index WHERE group_search_index MATCH {slot})"
        ));
        self
    }

    /// ` WHERE a AND b ...` (leading space included).
    #[must_use]
    pub fn where_clause(&self) -> String {
        let mut out = String::new();
        if !self.conditions.is_empty() {
            let _ = write!(out, " WHERE {}", self.conditions.join(" AND "));
        }
        out
    }

    /// Parameters bound by the conditions so far.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Parameters plus a ` LIMIT ?n OFFSET ?m` suffix for `page`.
    #[must_use]
    pub fn paged(&self, page: Page) -> (String, Vec<Value>) {
        let mut params = self.params.clone();
        params.push(Value::Integer(i64::from(page.limit)));
        let limit_slot = params.len();
        params.push(Value::Integer(i64::try_from(page.offset).unwrap_or(i64::MAX)));
        let offset_slot = params.len();
        (
            format!(" LIMIT ?{limit_slot} OFFSET ?{offset_slot}"),
            params,
        )
    }
}
