//! One module per tool, plus report assembly and name-based dispatch.
//!
//! Every tool takes the [`Store`], the caller's [`AuthContext`] and a typed
//! request, and returns a [`crate::ToolResult`]. Requests are validated
//! before any query runs.

pub mod artifacts;
pub mod assembly;
pub mod dispatch;
pub mod groups;
pub mod lifecycle;
pub mod notes;
pub mod projects;
pub mod releases;
pub mod reports;
pub mod search;
pub mod statistics;

pub use dispatch::{Tool, call};

use crate::access::AuthContext;
use crate::db::Store;
use crate::error::{Rejection, ToolError, ValidationError};
use crate::model::{GroupId, ProjectId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Value;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub(crate) const fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Check a page size against `1..=MAX_PAGE_SIZE`.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `limit` when out of range.
pub fn check_limit(limit: u32) -> Result<(), ValidationError> {
    if (1..=MAX_PAGE_SIZE).contains(&limit) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "limit",
            format!("must be between 1 and {MAX_PAGE_SIZE}, got {limit}"),
        ))
    }
}

/// Accept an ISO-8601 date (`2024-01-31`) or date-time, with or without offset.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field` when `value` does not parse.
pub fn check_timestamp(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let parses = DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").is_ok();

    if parses {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("expected an ISO 8601 date or date-time, got '{value}'"),
        ))
    }
}

/// A caller-supplied time bound, trimmed. Blank counts as absent.
///
/// Validation and the bound parameter both go through this, so the value
/// checked is the value compared.
pub(crate) fn time_bound(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn check_optional_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    time_bound(value).map_or(Ok(()), |v| check_timestamp(field, v))
}

/// Current time as written by mutations: UTC RFC 3339 with milliseconds.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lifecycle columns of a group that passed the ownership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OwnedGroup {
    pub id: GroupId,
    pub project_id: ProjectId,
    pub resolved_at: Option<String>,
    pub muted_at: Option<String>,
}

/// Fetch a group, then verify the caller is a member of its project.
pub(crate) fn owned_group(
    store: &Store,
    ctx: &AuthContext,
    group_id: GroupId,
) -> Result<OwnedGroup, ToolError> {
    let group = store.query_one(
        "fetch_group_state",
        "SELECT id, project_id, resolved_at, muted_at FROM groups WHERE id = ?1",
        &[Value::Integer(group_id)],
        |row| {
            Ok(OwnedGroup {
                id: row.get(0)?,
                project_id: row.get(1)?,
                resolved_at: row.get(2)?,
                muted_at: row.get(3)?,
            })
        },
    )?;

    let group = group.ok_or_else(|| Rejection::not_found("Error group"))?;
    ctx.projects.authorize(group.project_id, "error group")?;
    Ok(group)
}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}
