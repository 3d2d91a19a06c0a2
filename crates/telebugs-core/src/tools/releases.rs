use super::{check_limit, default_limit};
use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::{Page, QueryFilter};
use crate::error::{ToolError, ToolResult, ValidationError, finish};
use crate::model::{ProjectId, ReleaseId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Releases need an explicit project; a non-member project is rejected
/// rather than widened to the caller's full scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListReleases {
    pub project_id: ProjectId,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u64,
}

impl ListReleases {
    #[must_use]
    pub const fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
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
pub struct ReleaseSummary {
    pub id: ReleaseId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub version: String,
    pub artifacts_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePage {
    pub total_count: u64,
    pub releases: Vec<ReleaseSummary>,
}

/// Page through one project's releases, newest first.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn list_releases(
    store: &Store,
    ctx: &AuthContext,
    request: &ListReleases,
) -> ToolResult<ReleasePage> {
    finish(list(store, ctx, request))
}

fn list(store: &Store, ctx: &AuthContext, request: &ListReleases) -> Result<ReleasePage, ToolError> {
    request.validate()?;
    ctx.projects.require(request.project_id)?;

    let filter = QueryFilter::scoped("r.project_id", &[request.project_id]);
    let where_clause = filter.where_clause();

    let total_count = store.count(
        "count_releases",
        &format!("SELECT COUNT(*) FROM releases r{where_clause}"),
        filter.params(),
    )?;

    let (page_clause, params) = filter.paged(Page::new(request.limit, request.offset));
    let sql = format!(
        "SELECT r.id, r.project_id, p.name, r.version, COUNT(a.id), r.created_at \
         FROM releases r \
         JOIN projects p ON p.id = r.project_id \
         LEFT JOIN artifacts a ON a.release_id = r.id{where_clause} \
         GROUP BY r.id \
         ORDER BY r.created_at DESC, r.id DESC{page_clause}"
    );

    let releases = store.query_many("list_releases", &sql, &params, |row| {
        Ok(ReleaseSummary {
            id: row.get(0)?,
            project_id: row.get(1)?,
            project_name: row.get(2)?,
            version: row.get(3)?,
            artifacts_count: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    debug!(
        project_id = request.project_id,
        total_count, "list_releases"
    );
    Ok(ReleasePage {
        total_count,
        releases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn seeded() -> Store {
        let store = fixtures::two_tenants();
        fixtures::release(&store, 1, 1, "1.0.0", "2024-01-01T00:00:00.000Z");
        fixtures::release(&store, 2, 1, "1.1.0", "2024-02-01T00:00:00.000Z");
        fixtures::release(&store, 3, 2, "9.9.9", "2024-02-01T00:00:00.000Z");
        fixtures::artifact(&store, 1, 2, "app.js.map", Some("dbg-1"));
        fixtures::artifact(&store, 2, 2, "vendor.js.map", None);
        store
    }

    #[test]
    fn lists_newest_first_with_artifact_counts() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let page = list_releases(&store, &ada, &ListReleases::new(1))
            .unwrap()
            .into_success()
            .unwrap();
        assert_eq!(page.total_count, 2);
        let rows: Vec<_> = page
            .releases
            .iter()
            .map(|r| (r.version.as_str(), r.artifacts_count))
            .collect();
        assert_eq!(rows, vec![("1.1.0", 2), ("1.0.0", 0)]);
        assert_eq!(page.releases[0].project_name, "api");
    }

    #[test]
    fn non_member_project_is_denied_not_widened() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let reply = list_releases(&store, &ada, &ListReleases::new(2)).unwrap();
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({ "error": "Access denied to this project" })
        );
    }

    #[test]
    fn pagination_window() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");
        let request = ListReleases {
            limit: 1,
            offset: 1,
            ..ListReleases::new(1)
        };

        let page = list_releases(&store, &ada, &request).unwrap().into_success().unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.releases.len(), 1);
        assert_eq!(page.releases[0].version, "1.0.0");
    }
}
