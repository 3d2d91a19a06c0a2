//! Report listing and single-report retrieval.

use super::assembly::{self, AssembledReport};
use super::{check_limit, check_optional_timestamp, default_limit, time_bound};
use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::{Page, QueryFilter};
use crate::error::{Rejection, ToolError, ToolResult, ValidationError, finish};
use crate::model::{GroupId, ProjectId, ReportId, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListReports {
    pub group_id: Option<GroupId>,
    pub project_id: Option<ProjectId>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

impl Default for ListReports {
    fn default() -> Self {
        Self {
            group_id: None,
            project_id: None,
            from: None,
            to: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ListReports {
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
pub struct ReportSummary {
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPage {
    pub total_count: u64,
    pub reports: Vec<ReportSummary>,
}

/// Page through reports in the caller's scope, newest first.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn list_reports(store: &Store, ctx: &AuthContext, request: &ListReports) -> ToolResult<ReportPage> {
    finish(list(store, ctx, request))
}

fn list(store: &Store, ctx: &AuthContext, request: &ListReports) -> Result<ReportPage, ToolError> {
    request.validate()?;

    let projects = ctx.projects.effective(request.project_id);
    if projects.is_empty() {
        return Ok(ReportPage {
            total_count: 0,
            reports: vec![],
        });
    }

    let mut filter = QueryFilter::scoped("r.project_id", &projects);
    if let Some(group_id) = request.group_id {
        filter.eq("r.group_id", group_id);
    }
    if let Some(from) = time_bound(request.from.as_deref()) {
        filter.at_least("r.occurred_at", from.to_string());
    }
    if let Some(to) = time_bound(request.to.as_deref()) {
        filter.at_most("r.occurred_at", to.to_string());
    }

    let where_clause = filter.where_clause();
    let total_count = store.count(
        "count_reports",
        &format!("SELECT COUNT(*) FROM reports r{where_clause}"),
        filter.params(),
    )?;

    let (page_clause, params) = filter.paged(Page::new(request.limit, request.offset));
    let sql = format!(
        "SELECT r.id, r.project_id, p.name, r.group_id, r.error_type, r.error_message, \
         r.culprit, r.environment, r.platform, r.release_version, r.server_name, \
         r.handled, r.severity, r.occurred_at \
         FROM reports r JOIN projects p ON p.id = r.project_id{where_clause} \
         ORDER BY r.occurred_at DESC, r.id DESC{page_clause}"
    );

    let reports = store.query_many("list_reports", &sql, &params, |row| {
        Ok(ReportSummary {
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
        })
    })?;

    debug!(total_count, returned = reports.len(), "list_reports");
    Ok(ReportPage {
        total_count,
        reports,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetReport {
    pub report_id: ReportId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub report: AssembledReport,
}

/// One report with its stack traces, breadcrumbs and metadata.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn get_report(store: &Store, ctx: &AuthContext, request: &GetReport) -> ToolResult<ReportView> {
    finish(get(store, ctx, request.report_id))
}

fn get(store: &Store, ctx: &AuthContext, report_id: ReportId) -> Result<ReportView, ToolError> {
    let header = assembly::fetch_header(store, report_id)?
        .ok_or_else(|| Rejection::not_found("Report"))?;
    ctx.projects.authorize(header.project_id, "report")?;

    let report = assembly::assemble(store, header)?;
    Ok(ReportView { report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn seeded() -> Store {
        let store = fixtures::two_tenants();
        fixtures::group(&store, 11, 1, "IOError", "disk full", "2024-03-05T00:00:00.000Z");
        fixtures::report(&store, 100, 10, "2024-03-01T10:00:00.000Z");
        fixtures::report(&store, 101, 10, "2024-03-02T10:00:00.000Z");
        fixtures::report(&store, 102, 11, "2024-03-05T00:00:00.000Z");
        fixtures::report(&store, 200, 20, "2024-03-06T00:00:00.000Z");
        store
    }

    fn ids(page: &ReportPage) -> Vec<ReportId> {
        page.reports.iter().map(|r| r.id).collect()
    }

    #[test]
    fn lists_newest_first_within_scope() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let page = list_reports(&store, &ada, &ListReports::default())
            .unwrap()
            .into_success()
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(ids(&page), vec![102, 101, 100]);
        assert_eq!(page.reports[0].severity, Severity::Error);
        assert_eq!(page.reports[0].release.as_deref(), Some("1.0.0"));
        assert_eq!(page.reports[0].handled, Some(false));
    }

    #[test]
    fn group_and_date_filters() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let request = ListReports {
            group_id: Some(10),
            from: Some("2024-03-02".to_string()),
            ..ListReports::default()
        };
        let page = list_reports(&store, &ada, &request)
            .unwrap()
            .into_success()
            .unwrap();
        assert_eq!(ids(&page), vec![101]);
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn padded_and_blank_date_bounds() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let request = ListReports {
            from: Some("  2024-03-02".to_string()),
            to: Some("2099-01-01 ".to_string()),
            ..ListReports::default()
        };
        let page = list_reports(&store, &ada, &request)
            .unwrap()
            .into_success()
            .unwrap();
        assert_eq!(ids(&page), vec![102, 101]);

        let request = ListReports {
            from: Some(String::new()),
            to: Some(String::new()),
            ..ListReports::default()
        };
        let page = list_reports(&store, &ada, &request)
            .unwrap()
            .into_success()
            .unwrap();
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn foreign_group_filter_returns_nothing() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let request = ListReports {
            group_id: Some(20),
            ..ListReports::default()
        };
        let page = list_reports(&store, &ada, &request)
            .unwrap()
            .into_success()
            .unwrap();
        assert!(page.reports.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn malformed_date_is_rejected() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let reply = list_reports(
            &store,
            &ada,
            &ListReports {
                to: Some("next tuesday".to_string()),
                ..ListReports::default()
            },
        )
        .unwrap();
        assert!(reply.rejection().unwrap().message().starts_with("Invalid to:"));
    }

    #[test]
    fn get_report_checks_existence_then_ownership() {
        let store = seeded();
        let ada = fixtures::ctx(&store, "key-ada");

        let reply = get_report(&store, &ada, &GetReport { report_id: 999 }).unwrap();
        assert_eq!(reply.rejection().unwrap().message(), "Report not found");

        let reply = get_report(&store, &ada, &GetReport { report_id: 200 }).unwrap();
        assert_eq!(
            reply.rejection().unwrap().message(),
            "Access denied to this report"
        );

        let view = get_report(&store, &ada, &GetReport { report_id: 100 })
            .unwrap()
            .into_success()
            .unwrap();
        assert_eq!(view.report.header.id, 100);
        assert_eq!(view.report.header.project_name, "api");
    }
}
