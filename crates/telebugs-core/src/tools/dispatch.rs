//! Name-based dispatch from a tool name and JSON params to a JSON reply.
//!
//! This is the seam a transport uses: it never sees the typed request
//! structs. Params that fail to deserialize become an InvalidParams
//! rejection document, the same as a failed `validate()`.

use super::{artifacts, groups, lifecycle, notes, projects, releases, reports, search, statistics};
use crate::access::AuthContext;
use crate::db::Store;
use crate::error::{Rejection, StoreError, ToolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    ListProjects,
    ListErrorGroups,
    GetErrorGroup,
    ListReports,
    GetReport,
    GetStatistics,
    SearchErrors,
    ListReleases,
    ListReleaseArtifacts,
    GetSourcemapStatus,
    ResolveErrorGroup,
    UnresolveErrorGroup,
    MuteErrorGroup,
    UnmuteErrorGroup,
    AddNote,
    DeleteNote,
}

impl Tool {
    pub const ALL: [Self; 16] = [
        Self::ListProjects,
        Self::ListErrorGroups,
        Self::GetErrorGroup,
        Self::ListReports,
        Self::GetReport,
        Self::GetStatistics,
        Self::SearchErrors,
        Self::ListReleases,
        Self::ListReleaseArtifacts,
        Self::GetSourcemapStatus,
        Self::ResolveErrorGroup,
        Self::UnresolveErrorGroup,
        Self::MuteErrorGroup,
        Self::UnmuteErrorGroup,
        Self::AddNote,
        Self::DeleteNote,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListProjects => "list_projects",
            Self::ListErrorGroups => "list_error_groups",
            Self::GetErrorGroup => "get_error_group",
            Self::ListReports => "list_reports",
            Self::GetReport => "get_report",
            Self::GetStatistics => "get_statistics",
            Self::SearchErrors => "search_errors",
            Self::ListReleases => "list_releases",
            Self::ListReleaseArtifacts => "list_release_artifacts",
            Self::GetSourcemapStatus => "get_sourcemap_status",
            Self::ResolveErrorGroup => "resolve_error_group",
            Self::UnresolveErrorGroup => "unresolve_error_group",
            Self::MuteErrorGroup => "mute_error_group",
            Self::UnmuteErrorGroup => "unmute_error_group",
            Self::AddNote => "add_note",
            Self::DeleteNote => "delete_note",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ListProjects => "List all projects accessible to the authenticated user",
            Self::ListErrorGroups => {
                "List deduplicated error groups with optional filtering by project, status, and date range"
            }
            Self::GetErrorGroup => {
                "Get detailed information about a specific error group including notes"
            }
            Self::ListReports => "List individual error occurrences with optional filtering",
            Self::GetReport => {
                "Get full details of a specific error report including stack trace, breadcrumbs, and context"
            }
            Self::GetStatistics => {
                "Get aggregated error statistics over time with optional project filtering"
            }
            Self::SearchErrors => "Full-text search across error types and messages",
            Self::ListReleases => "List all releases for a project with artifact counts",
            Self::ListReleaseArtifacts => "List uploaded artifacts for a release",
            Self::GetSourcemapStatus => "Check if a debug ID has sourcemaps available",
            Self::ResolveErrorGroup => "Mark an error group as resolved",
            Self::UnresolveErrorGroup => "Reopen a resolved error group",
            Self::MuteErrorGroup => "Mute an error group, optionally until a given time",
            Self::UnmuteErrorGroup => "Unmute a muted error group",
            Self::AddNote => "Add a note to an error group",
            Self::DeleteNote => "Delete one of your own notes from an error group",
        }
    }

    /// Whether the tool writes to the database.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::ResolveErrorGroup
                | Self::UnresolveErrorGroup
                | Self::MuteErrorGroup
                | Self::UnmuteErrorGroup
                | Self::AddNote
                | Self::DeleteNote
        )
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool '{0}'")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// Params for tools that take none; still rejects stray fields.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

/// Run `tool` with raw JSON params and return the reply document.
///
/// `null` params are treated as `{}`.
///
/// # Errors
///
/// Returns a [`StoreError`] when the storage engine fails; every business
/// outcome, including malformed params, is an `Ok` document.
pub fn call(store: &Store, ctx: &AuthContext, tool: Tool, params: Json) -> Result<Json, StoreError> {
    let params = if params.is_null() {
        Json::Object(serde_json::Map::new())
    } else {
        params
    };
    debug!(tool = tool.as_str(), user_id = ctx.user_id(), "dispatch");

    match tool {
        Tool::ListProjects => run(params, |_: &NoParams| projects::list_projects(store, ctx)),
        Tool::ListErrorGroups => run(params, |r| groups::list_error_groups(store, ctx, r)),
        Tool::GetErrorGroup => run(params, |r| groups::get_error_group(store, ctx, r)),
        Tool::ListReports => run(params, |r| reports::list_reports(store, ctx, r)),
        Tool::GetReport => run(params, |r| reports::get_report(store, ctx, r)),
        Tool::GetStatistics => run(params, |r| statistics::get_statistics(store, ctx, r)),
        Tool::SearchErrors => run(params, |r| search::search_errors(store, ctx, r)),
        Tool::ListReleases => run(params, |r| releases::list_releases(store, ctx, r)),
        Tool::ListReleaseArtifacts => {
            run(params, |r| artifacts::list_release_artifacts(store, ctx, r))
        }
        Tool::GetSourcemapStatus => run(params, |r| artifacts::get_sourcemap_status(store, ctx, r)),
        Tool::ResolveErrorGroup => run(params, |r| lifecycle::resolve_error_group(store, ctx, r)),
        Tool::UnresolveErrorGroup => {
            run(params, |r| lifecycle::unresolve_error_group(store, ctx, r))
        }
        Tool::MuteErrorGroup => run(params, |r| lifecycle::mute_error_group(store, ctx, r)),
        Tool::UnmuteErrorGroup => run(params, |r| lifecycle::unmute_error_group(store, ctx, r)),
        Tool::AddNote => run(params, |r| notes::add_note(store, ctx, r)),
        Tool::DeleteNote => run(params, |r| notes::delete_note(store, ctx, r)),
    }
}

fn run<R, T, F>(params: Json, tool: F) -> Result<Json, StoreError>
where
    R: DeserializeOwned,
    T: Serialize,
    F: FnOnce(&R) -> ToolResult<T>,
{
    match serde_json::from_value::<R>(params) {
        Ok(request) => Ok(encode(&tool(&request)?)),
        Err(err) => {
            debug!(%err, "params rejected");
            Ok(encode(&Rejection::invalid_params(format!("Invalid params: {err}"))))
        }
    }
}

fn encode<T: Serialize>(body: &T) -> Json {
    serde_json::to_value(body).unwrap_or_else(|err| {
        serde_json::json!({ "error": format!("failed to encode reply: {err}") })
    })
}
