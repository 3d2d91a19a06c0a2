//! Release artifacts and source-map lookup by debug id.

use super::{check_limit, default_limit};
use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::{Page, QueryFilter};
use crate::error::{Rejection, ToolError, ToolResult, ValidationError, finish};
use crate::model::{ProjectId, ReleaseId};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListReleaseArtifacts {
    pub release_id: ReleaseId,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u64,
}

impl ListReleaseArtifacts {
    #[must_use]
    pub const fn new(release_id: ReleaseId) -> Self {
        Self {
            release_id,
            limit: default_limit(),
            offset: 0,
        }
    }

    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an out-of-range limit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_limit(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub id: i64,
    pub name: String,
    pub debug_id: Option<String>,
    /// From the attached blob; null when nothing is attached.
    pub byte_size: Option<i64>,
    pub content_type: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPage {
    pub total_count: u64,
    pub artifacts: Vec<ArtifactSummary>,
}

/// Page through the artifacts of one release the caller can see.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn list_release_artifacts(
    store: &Store,
    ctx: &AuthContext,
    request: &ListReleaseArtifacts,
) -> ToolResult<ArtifactPage> {
    finish(list(store, ctx, request))
}

fn list(
    store: &Store,
    ctx: &AuthContext,
    request: &ListReleaseArtifacts,
) -> Result<ArtifactPage, ToolError> {
    request.validate()?;

    let owner: Option<ProjectId> = store.query_one(
        "fetch_release_owner",
        "SELECT project_id FROM releases WHERE id = ?1",
        &[Value::Integer(request.release_id)],
        |row| row.get(0),
    )?;
    let owner = owner.ok_or_else(|| Rejection::not_found("Release"))?;
    ctx.projects.authorize(owner, "release")?;

    let release = [Value::Integer(request.release_id)];
    let total_count = store.count(
        "count_release_artifacts",
        "SELECT COUNT(*) FROM artifacts WHERE release_id = ?1",
        &release,
    )?;

    let mut params = release.to_vec();
    let page = Page::new(request.limit, request.offset);
    params.push(Value::Integer(i64::from(page.limit)));
    params.push(Value::Integer(i64::try_from(page.offset).unwrap_or(i64::MAX)));

    let artifacts = store.query_many(
        "list_release_artifacts",
        "SELECT a.id, a.name, a.debug_id, blob.byte_size, blob.content_type, a.created_at \
         FROM artifacts a \
         LEFT JOIN active_storage_attachments att \
           ON att.record_type = 'Artifact' AND att.record_id = a.id \
         LEFT JOIN active_storage_blobs blob ON blob.id = att.blob_id \
         WHERE a.release_id = ?1 \
         ORDER BY a.created_at DESC, a.id DESC LIMIT ?2 OFFSET ?3",
        &params,
        |row| {
            Ok(ArtifactSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                debug_id: row.get(2)?,
                byte_size: row.get(3)?,
                content_type: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )?;

    debug!(release_id = request.release_id, total_count, "list_release_artifacts");
    Ok(ArtifactPage {
        total_count,
        artifacts,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetSourcemapStatus {
    pub debug_id: String,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl GetSourcemapStatus {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a blank debug id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.debug_id.trim().is_empty() {
            return Err(ValidationError::new("debug_id", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcemapArtifact {
    pub id: i64,
    pub name: String,
    pub debug_id: String,
    pub release_version: String,
    pub release_id: ReleaseId,
    pub project_id: ProjectId,
    pub project_name: String,
}

/// `found: false` with a null artifact when nothing in scope matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcemapStatus {
    pub found: bool,
    pub artifact: Option<SourcemapArtifact>,
}

/// Look up an uploaded source map by its debug id.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if the query fails.
pub fn get_sourcemap_status(
    store: &Store,
    ctx: &AuthContext,
    request: &GetSourcemapStatus,
) -> ToolResult<SourcemapStatus> {
    finish(sourcemap(store, ctx, request))
}

fn sourcemap(
    store: &Store,
    ctx: &AuthContext,
    request: &GetSourcemapStatus,
) -> Result<SourcemapStatus, ToolError> {
    request.validate()?;

    let projects = ctx.projects.effective(request.project_id);
    if projects.is_empty() {
        return Ok(SourcemapStatus {
            found: false,
            artifact: None,
        });
    }

    let mut filter = QueryFilter::scoped("r.project_id", &projects);
    filter.eq("a.debug_id", request.debug_id.trim().to_string());

    let sql = format!(
        "SELECT a.id, a.name, a.debug_id, r.version, r.id, r.project_id, p.name \
         FROM artifacts a \
         JOIN releases r ON r.id = a.release_id \
         JOIN projects p ON p.id = r.project_id{} \
         ORDER BY a.created_at DESC, a.id DESC LIMIT 1",
        filter.where_clause()
    );

    let artifact = store.query_one("get_sourcemap_status", &sql, filter.params(), |row| {
        Ok(SourcemapArtifact {
            id: row.get(0)?,
            name: row.get(1)?,
            debug_id: row.get(2)?,
            release_version: row.get(3)?,
            release_id: row.get(4)?,
            project_id: row.get(5)?,
            project_name: row.get(6)?,
        })
    })?;

    Ok(SourcemapStatus {
        found: artifact.is_some(),
        artifact,
    })
}
