//! Full-text search over error groups via the `group_search_index` FTS5 table.

use super::{check_limit, default_limit};
use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::{Page, QueryFilter, fts_terms};
use crate::error::{ToolError, ToolResult, ValidationError, finish};
use crate::model::{GroupId, GroupStatus, ProjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchErrors {
    pub query: String,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u64,
}

impl SearchErrors {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }

    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a blank query or out-of-range limit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::new("query", "must not be empty"));
        }
        check_limit(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: GroupId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub error_type: String,
    pub error_message: String,
    pub culprit: Option<String>,
    pub occurrences: i64,
    pub last_seen: String,
    pub status: GroupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub total_count: u64,
    pub results: Vec<SearchHit>,
}

/// Match groups by error type, message or culprit, most recently seen first.
///
/// Every status is searched; merged groups never are.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn search_errors(
    store: &Store,
    ctx: &AuthContext,
    request: &SearchErrors,
) -> ToolResult<SearchResults> {
    finish(search(store, ctx, request))
}

fn search(
    store: &Store,
    ctx: &AuthContext,
    request: &SearchErrors,
) -> Result<SearchResults, ToolError> {
    request.validate()?;

    let empty = SearchResults {
        total_count: 0,
        results: vec![],
    };
    let projects = ctx.projects.effective(request.project_id);
    if projects.is_empty() {
        return Ok(empty);
    }
    let Some(terms) = fts_terms(&request.query) else {
        return Ok(empty);
    };

    let mut filter = QueryFilter::scoped("g.project_id", &projects);
    filter.raw("g.merged_into_id IS NULL");
    filter.fts_match("g.id", terms);

    let where_clause = filter.where_clause();
    let total_count = store.count(
        "count_search_errors",
        &format!("SELECT COUNT(*) FROM groups g{where_clause}"),
        filter.params(),
    )?;

    let (page_clause, params) = filter.paged(Page::new(request.limit, request.offset));
    let sql = format!(
        "SELECT g.id, g.project_id, p.name, g.error_type, g.error_message, g.culprit, \
         g.reports_count, g.last_occurred_at, g.resolved_at, g.muted_at \
         FROM groups g JOIN projects p ON p.id = g.project_id{where_clause} \
         ORDER BY g.last_occurred_at DESC, g.id DESC{page_clause}"
    );

    let results = store.query_many("search_errors", &sql, &params, |row| {
        let resolved_at: Option<String> = row.get(8)?;
        let muted_at: Option<String> = row.get(9)?;
        Ok(SearchHit {
            id: row.get(0)?,
            project_id: row.get(1)?,
            project_name: row.get(2)?,
            error_type: row.get(3)?,
            error_message: row.get(4)?,
            culprit: row.get(5)?,
            occurrences: row.get(6)?,
            last_seen: row.get(7)?,
            status: GroupStatus::derive(resolved_at, muted_at),
        })
    })?;

    debug!(total_count, returned = results.len(), "search_errors");
    Ok(SearchResults {
        total_count,
        results,
    })
}
