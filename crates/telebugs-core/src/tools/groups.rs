//! Error-group listing and detail.

use super::{check_limit, check_optional_timestamp, default_limit, time_bound};
use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::{Page, QueryFilter};
use crate::error::{Rejection, ToolError, ToolResult, ValidationError, finish};
use crate::model::{GroupId, GroupStatus, NoteId, ProjectId, StatusFilter};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Notes included with a group detail, newest first.
pub const GROUP_NOTES_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListErrorGroups {
    pub project_id: Option<ProjectId>,
    /// Exact match.
    pub error_type: Option<String>,
    /// Substring match.
    pub error_message: Option<String>,
    pub status: StatusFilter,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

impl Default for ListErrorGroups {
    fn default() -> Self {
        Self {
            project_id: None,
            error_type: None,
            error_message: None,
            status: StatusFilter::default(),
            from: None,
            to: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ListErrorGroups {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an out-of-range limit or a malformed
    /// date bound.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_limit(self.limit)?;
        check_optional_timestamp("from", self.from.as_deref())?;
        check_optional_timestamp("to", self.to.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorGroupSummary {
    pub id: GroupId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub error_type: String,
    pub error_message: String,
    pub culprit: Option<String>,
    pub occurrences: i64,
    pub first_seen: String,
    pub last_seen: String,
    pub status: GroupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorGroupPage {
    pub total_count: u64,
    pub error_groups: Vec<ErrorGroupSummary>,
}

/// Page through the caller's error groups, most recently seen first.
///
/// Merged groups are never listed.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn list_error_groups(
    store: &Store,
    ctx: &AuthContext,
    request: &ListErrorGroups,
) -> ToolResult<ErrorGroupPage> {
    finish(list(store, ctx, request))
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn list(
    store: &Store,
    ctx: &AuthContext,
    request: &ListErrorGroups,
) -> Result<ErrorGroupPage, ToolError> {
    request.validate()?;

    let projects = ctx.projects.effective(request.project_id);
    if projects.is_empty() {
        return Ok(ErrorGroupPage {
            total_count: 0,
            error_groups: vec![],
        });
    }

    let mut filter = QueryFilter::scoped("g.project_id", &projects);
    filter.raw("g.merged_into_id IS NULL");
    if let Some(error_type) = non_blank(request.error_type.as_ref()) {
        filter.eq("g.error_type", error_type.to_string());
    }
    if let Some(message) = non_blank(request.error_message.as_ref()) {
        filter.contains("g.error_message", message);
    }
    if let Some(predicate) = request.status.predicate() {
        filter.raw(predicate);
    }
    if let Some(from) = time_bound(request.from.as_deref()) {
        filter.at_least("g.last_occurred_at", from.to_string());
    }
    if let Some(to) = time_bound(request.to.as_deref()) {
        filter.at_most("g.last_occurred_at", to.to_string());
    }

    let where_clause = filter.where_clause();
    let total_count = store.count(
        "count_error_groups",
        &format!("SELECT COUNT(*) FROM groups g{where_clause}"),
        filter.params(),
    )?;

    let (page_clause, params) = filter.paged(Page::new(request.limit, request.offset));
    let sql = format!(
        "SELECT g.id, g.project_id, p.name, g.error_type, g.error_message, g.culprit, \
         g.reports_count, g.first_occurred_at, g.last_occurred_at, g.resolved_at, g.muted_at \
         FROM groups g JOIN projects p ON p.id = g.project_id{where_clause} \
         ORDER BY g.last_occurred_at DESC, g.id DESC{page_clause}"
    );

    let error_groups = store.query_many("list_error_groups", &sql, &params, |row| {
        let resolved_at: Option<String> = row.get(9)?;
        let muted_at: Option<String> = row.get(10)?;
        Ok(ErrorGroupSummary {
            id: row.get(0)?,
            project_id: row.get(1)?,
            project_name: row.get(2)?,
            error_type: row.get(3)?,
            error_message: row.get(4)?,
            culprit: row.get(5)?,
            occurrences: row.get(6)?,
            first_seen: row.get(7)?,
            last_seen: row.get(8)?,
            status: GroupStatus::derive(resolved_at, muted_at),
        })
    })?;

    debug!(total_count, returned = error_groups.len(), "list_error_groups");
    Ok(ErrorGroupPage {
        total_count,
        error_groups,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetErrorGroup {
    pub group_id: GroupId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNote {
    pub id: NoteId,
    pub content: String,
    pub automated: bool,
    pub author: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorGroupDetail {
    pub id: GroupId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub error_type: String,
    pub error_message: String,
    pub culprit: Option<String>,
    pub fingerprint: String,
    pub occurrences: i64,
    pub first_seen: String,
    pub last_seen: String,
    pub status: GroupStatus,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub muted_at: Option<String>,
    pub muted_until: Option<String>,
    pub muted_by: Option<String>,
    pub assigned_to: Option<String>,
    pub notes: Vec<GroupNote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorGroupView {
    pub error_group: ErrorGroupDetail,
}

/// One group with attribution names and its most recent notes.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn get_error_group(
    store: &Store,
    ctx: &AuthContext,
    request: &GetErrorGroup,
) -> ToolResult<ErrorGroupView> {
    finish(get(store, ctx, request.group_id))
}

fn get(store: &Store, ctx: &AuthContext, group_id: GroupId) -> Result<ErrorGroupView, ToolError> {
    let group = store.query_one(
        "get_error_group",
        "SELECT g.id, g.project_id, p.name, g.error_type, g.error_message, g.culprit, \
         g.fingerprint, g.reports_count, g.first_occurred_at, g.last_occurred_at, \
         g.resolved_at, g.muted_at, g.muted_until, \
         owner.name, resolver.name, muter.name \
         FROM groups g \
         JOIN projects p ON p.id = g.project_id \
         LEFT JOIN users owner ON owner.id = g.owner_id \
         LEFT JOIN users resolver ON resolver.id = g.resolver_id \
         LEFT JOIN users muter ON muter.id = g.muter_id \
         WHERE g.id = ?1",
        &[Value::Integer(group_id)],
        |row| {
            let resolved_at: Option<String> = row.get(10)?;
            let muted_at: Option<String> = row.get(11)?;
            Ok(ErrorGroupDetail {
                id: row.get(0)?,
                project_id: row.get(1)?,
                project_name: row.get(2)?,
                error_type: row.get(3)?,
                error_message: row.get(4)?,
                culprit: row.get(5)?,
                fingerprint: row.get(6)?,
                occurrences: row.get(7)?,
                first_seen: row.get(8)?,
                last_seen: row.get(9)?,
                status: GroupStatus::derive(resolved_at.as_ref(), muted_at.as_ref()),
                resolved_at,
                resolved_by: row.get(14)?,
                muted_at,
                muted_until: row.get(12)?,
                muted_by: row.get(15)?,
                assigned_to: row.get(13)?,
                notes: Vec::new(),
            })
        },
    )?;

    let mut group = group.ok_or_else(|| Rejection::not_found("Error group"))?;
    ctx.projects.authorize(group.project_id, "error group")?;

    group.notes = store.query_many(
        "get_error_group_notes",
        "SELECT n.id, n.content, n.automated, u.name, n.created_at \
         FROM notes n LEFT JOIN users u ON u.id = n.user_id \
         WHERE n.group_id = ?1 \
         ORDER BY n.created_at DESC, n.id DESC LIMIT ?2",
        &[
            Value::Integer(group_id),
            Value::Integer(i64::from(GROUP_NOTES_LIMIT)),
        ],
        |row| {
            Ok(GroupNote {
                id: row.get(0)?,
                content: row.get(1)?,
                automated: row.get(2)?,
                author: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )?;

    Ok(ErrorGroupView { error_group: group })
}
