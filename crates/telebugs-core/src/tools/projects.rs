use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::QueryFilter;
use crate::error::{ToolError, ToolResult, finish};
use crate::model::{Platform, ProjectId};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub platform: Platform,
    pub timezone: Option<String>,
    pub error_groups_count: i64,
    pub reports_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

/// Every non-deleted project the caller is a member of, by name.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if the query fails.
pub fn list_projects(store: &Store, ctx: &AuthContext) -> ToolResult<ProjectList> {
    finish(list(store, ctx))
}

fn list(store: &Store, ctx: &AuthContext) -> Result<ProjectList, ToolError> {
    if ctx.projects.is_empty() {
        return Ok(ProjectList { projects: vec![] });
    }

    let mut filter = QueryFilter::scoped("p.id", &ctx.projects.ids());
    filter.raw("p.deleted_at IS NULL");

    let sql = format!(
        "SELECT p.id, p.name, p.platform, p.timezone, p.groups_count, p.reports_count, p.created_at \
         FROM projects p{} ORDER BY p.name, p.id",
        filter.where_clause()
    );

    let projects = store.query_many("list_projects", &sql, filter.params(), |row| {
        Ok(ProjectSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            platform: Platform::from_code(row.get(2)?),
            timezone: row.get(3)?,
            error_groups_count: row.get(4)?,
            reports_count: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    debug!(count = projects.len(), "list_projects");
    Ok(ProjectList { projects })
}
