//! Report assembly: rebuild the nested report view from its normalized rows.
//!
//! The report header is fetched first so the caller can run the ownership
//! check before any child row is read. Children are then loaded one query per
//! table:
//!
//! - backtraces in storage order, each with its frames by `position`
//! - contexts folded into a name-keyed map (later rows win, null names skipped)
//! - tags folded into a key-keyed map
//! - breadcrumbs by timestamp
//! - at most one request snapshot and one end-user snapshot
//!
//! JSON-encoded text columns go through [`lenient_json`], so a malformed
//! payload is returned verbatim as a string instead of failing the report.

use crate::db::Store;
use crate::error::StoreError;
use crate::model::{GroupId, ProjectId, ReportId, Severity};
use rusqlite::types::Value;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use tracing::debug;

/// Parse stored JSON text. Null or empty is `null`; unparseable text is kept
/// as a JSON string.
#[must_use]
pub fn lenient_json(raw: Option<String>) -> Json {
    match raw {
        None => Json::Null,
        Some(text) if text.is_empty() => Json::Null,
        Some(text) => serde_json::from_str(&text).unwrap_or_else(|_| Json::String(text)),
    }
}

/// Scalar report columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportHeader {
    pub id: ReportId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub group_id: GroupId,
    pub error_type: String,
    pub error_message: String,
    pub culprit: Option<String>,
    pub environment: Option<String>,
    pub platform: Option<String>,
    pub release: Option<String>,
    pub server: Option<String>,
    pub handled: Option<bool>,
    pub severity: Severity,
    pub occurred_at: String,
    pub log_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackFrame {
    pub file: Option<String>,
    pub function: Option<String>,
    pub line: Option<i64>,
    pub column: Option<i64>,
    pub context_line: Option<String>,
    pub pre_context: Json,
    pub post_context: Json,
    pub in_app: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackTrace {
    pub exception_type: Option<String>,
    pub exception_module: Option<String>,
    pub exception_value: Option<String>,
    pub frames: Vec<StackFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breadcrumb {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
    pub data: Json,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot {
    pub url: Option<String>,
    pub method: Option<String>,
    pub query_string: Option<String>,
    pub headers: Json,
    pub data: Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub ip_address: Option<String>,
    pub geo: GeoLocation,
}

/// The full report document. Absent request and user serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub stack_traces: Vec<StackTrace>,
    pub contexts: BTreeMap<String, Json>,
    pub tags: BTreeMap<String, Option<String>>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub request: Option<RequestSnapshot>,
    pub user: Option<UserSnapshot>,
}

/// Fetch the scalar columns of one report.
///
/// # Errors
///
/// Returns a [`StoreError`] if the query fails.
pub fn fetch_header(store: &Store, report_id: ReportId) -> Result<Option<ReportHeader>, StoreError> {
    store.query_one(
        "get_report",
        "SELECT r.id, r.project_id, p.name, r.group_id, r.error_type, r.error_message, \
         r.culprit, r.environment, r.platform, r.release_version, r.server_name, \
         r.handled, r.severity, r.occurred_at, r.log_message \
         FROM reports r JOIN projects p ON p.id = r.project_id \
         WHERE r.id = ?1",
        &[Value::Integer(report_id)],
        |row| {
            Ok(ReportHeader {
                id: row.get(0)?,
                project_id: row.get(1)?,
                project_name: row.get(2)?,
                group_id: row.get(3)?,
                error_type: row.get(4)?,
                error_message: row.get(5)?,
                culprit: row.get(6)?,
                environment: row.get(7)?,
                platform: row.get(8)?,
                release: row.get(9)?,
                server: row.get(10)?,
                handled: row.get(11)?,
                severity: Severity::from_code(row.get(12)?),
                occurred_at: row.get(13)?,
                log_message: row.get(14)?,
            })
        },
    )
}

/// Load every child structure of an already-authorized report.
///
/// # Errors
///
/// Returns a [`StoreError`] if any child query fails.
pub fn assemble(store: &Store, header: ReportHeader) -> Result<AssembledReport, StoreError> {
    let id = [Value::Integer(header.id)];

    let stack_traces = fetch_stack_traces(store, &id)?;

    let mut contexts = BTreeMap::new();
    let context_rows: Vec<(Option<String>, Option<String>)> = store.query_many(
        "get_report_contexts",
        "SELECT name, data FROM contexts WHERE report_id = ?1 ORDER BY id",
        &id,
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    for (name, data) in context_rows {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            contexts.insert(name, lenient_json(data));
        }
    }

    let tags: BTreeMap<String, Option<String>> = store
        .query_many(
            "get_report_tags",
            "SELECT key, value FROM tags WHERE report_id = ?1 ORDER BY id",
            &id,
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
        .into_iter()
        .collect();

    let breadcrumbs = store.query_many(
        "get_report_breadcrumbs",
        "SELECT breadcrumb_type, category, level, message, data, timestamp \
         FROM error_breadcrumbs WHERE report_id = ?1 ORDER BY timestamp, id",
        &id,
        |row| {
            Ok(Breadcrumb {
                kind: row.get(0)?,
                category: row.get(1)?,
                level: row.get(2)?,
                message: row.get(3)?,
                data: lenient_json(row.get(4)?),
                timestamp: row.get(5)?,
            })
        },
    )?;

    let request = store.query_one(
        "get_report_request",
        "SELECT url, method, query_string, headers, data \
         FROM requests WHERE report_id = ?1 ORDER BY id LIMIT 1",
        &id,
        |row| {
            Ok(RequestSnapshot {
                url: row.get(0)?,
                method: row.get(1)?,
                query_string: row.get(2)?,
                headers: lenient_json(row.get(3)?),
                data: lenient_json(row.get(4)?),
            })
        },
    )?;

    let user = store.query_one(
        "get_report_user",
        "SELECT user_id, username, email, ip_address, geo_country_code, geo_region, geo_city \
         FROM report_users WHERE report_id = ?1 ORDER BY id LIMIT 1",
        &id,
        |row| {
            Ok(UserSnapshot {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                ip_address: row.get(3)?,
                geo: GeoLocation {
                    country: row.get(4)?,
                    region: row.get(5)?,
                    city: row.get(6)?,
                },
            })
        },
    )?;

    debug!(
        report_id = header.id,
        stack_traces = stack_traces.len(),
        breadcrumbs = breadcrumbs.len(),
        "assembled report"
    );

    Ok(AssembledReport {
        header,
        stack_traces,
        contexts,
        tags,
        breadcrumbs,
        request,
        user,
    })
}

fn fetch_stack_traces(store: &Store, id: &[Value]) -> Result<Vec<StackTrace>, StoreError> {
    let backtraces: Vec<(i64, StackTrace)> = store.query_many(
        "get_report_backtraces",
        "SELECT id, exception_type, exception_module, exception_value \
         FROM backtraces WHERE report_id = ?1 ORDER BY id",
        id,
        |row| {
            Ok((
                row.get(0)?,
                StackTrace {
                    exception_type: row.get(1)?,
                    exception_module: row.get(2)?,
                    exception_value: row.get(3)?,
                    frames: Vec::new(),
                },
            ))
        },
    )?;
    if backtraces.is_empty() {
        return Ok(Vec::new());
    }

    let frames: Vec<(i64, StackFrame)> = store.query_many(
        "get_report_frames",
        "SELECT f.backtrace_id, f.abs_path, f.filename, f.function, f.lineno, f.colno, \
         f.context_line, f.pre_context, f.post_context, f.in_app \
         FROM frames f JOIN backtraces b ON b.id = f.backtrace_id \
         WHERE b.report_id = ?1 \
         ORDER BY f.backtrace_id, f.position, f.id",
        id,
        |row| {
            let abs_path: Option<String> = row.get(1)?;
            let filename: Option<String> = row.get(2)?;
            Ok((
                row.get(0)?,
                StackFrame {
                    file: abs_path.or(filename),
                    function: row.get(3)?,
                    line: row.get(4)?,
                    column: row.get(5)?,
                    context_line: row.get(6)?,
                    pre_context: lenient_json(row.get(7)?),
                    post_context: lenient_json(row.get(8)?),
                    in_app: row.get(9)?,
                },
            ))
        },
    )?;

    let mut by_backtrace: BTreeMap<i64, Vec<StackFrame>> = BTreeMap::new();
    for (backtrace_id, frame) in frames {
        by_backtrace.entry(backtrace_id).or_default().push(frame);
    }

    Ok(backtraces
        .into_iter()
        .map(|(backtrace_id, mut trace)| {
            trace.frames = by_backtrace.remove(&backtrace_id).unwrap_or_default();
            trace
        })
        .collect())
}
