//! Report volume over time from the precomputed `report_aggregates` table.

use super::check_limit;
use crate::access::AuthContext;
use crate::db::Store;
use crate::db::filter::QueryFilter;
use crate::error::{ToolError, ToolResult, ValidationError, finish};
use crate::model::{GroupId, Period, ProjectId};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_PERIODS: u32 = 30;
pub const TOP_GROUPS_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetStatistics {
    pub project_id: Option<ProjectId>,
    pub period: Period,
    /// Most recent periods to include.
    pub limit: u32,
}

impl Default for GetStatistics {
    fn default() -> Self {
        Self {
            project_id: None,
            period: Period::default(),
            limit: DEFAULT_PERIODS,
        }
    }
}

impl GetStatistics {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an out-of-range limit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_limit(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodBucket {
    pub period_key: String,
    pub report_count: i64,
    pub error_group_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopErrorGroup {
    pub group_id: GroupId,
    pub error_type: String,
    pub error_message: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub period: Period,
    pub total_reports: i64,
    pub unique_error_groups: u64,
    /// Oldest first.
    pub periods: Vec<PeriodBucket>,
    pub top_error_groups: Vec<TopErrorGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsView {
    pub statistics: Statistics,
}

/// Period time series and top groups for the caller's scope.
///
/// The series covers the `limit` most recent period keys and is returned
/// oldest first. `total_reports` sums that window.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if a query fails.
pub fn get_statistics(
    store: &Store,
    ctx: &AuthContext,
    request: &GetStatistics,
) -> ToolResult<StatisticsView> {
    finish(compute(store, ctx, request))
}

fn compute(
    store: &Store,
    ctx: &AuthContext,
    request: &GetStatistics,
) -> Result<StatisticsView, ToolError> {
    request.validate()?;

    let mut statistics = Statistics {
        period: request.period,
        total_reports: 0,
        unique_error_groups: 0,
        periods: vec![],
        top_error_groups: vec![],
    };

    let projects = ctx.projects.effective(request.project_id);
    if projects.is_empty() {
        return Ok(StatisticsView { statistics });
    }

    let mut filter = QueryFilter::scoped("ra.project_id", &projects);
    filter.eq("ra.period_type", request.period.period_type());
    let where_clause = filter.where_clause();

    let mut params = filter.params().to_vec();
    params.push(Value::Integer(i64::from(request.limit)));
    let limit_slot = params.len();

    let mut periods = store.query_many(
        "statistics_periods",
        &format!(
            "SELECT ra.period_key, SUM(ra.count), COUNT(DISTINCT ra.group_id) \
             FROM report_aggregates ra{where_clause} \
             GROUP BY ra.period_key ORDER BY ra.period_key DESC LIMIT ?{limit_slot}"
        ),
        &params,
        |row| {
            Ok(PeriodBucket {
                period_key: row.get(0)?,
                report_count: row.get(1)?,
                error_group_count: row.get(2)?,
            })
        },
    )?;
    periods.reverse();

    let mut params = filter.params().to_vec();
    params.push(Value::Integer(i64::from(TOP_GROUPS_LIMIT)));
    let limit_slot = params.len();

    statistics.top_error_groups = store.query_many(
        "statistics_top_groups",
        &format!(
            "SELECT ra.group_id, g.error_type, g.error_message, SUM(ra.count) AS total \
             FROM report_aggregates ra JOIN groups g ON g.id = ra.group_id{where_clause} \
             GROUP BY ra.group_id ORDER BY total DESC, ra.group_id DESC LIMIT ?{limit_slot}"
        ),
        &params,
        |row| {
            Ok(TopErrorGroup {
                group_id: row.get(0)?,
                error_type: row.get(1)?,
                error_message: row.get(2)?,
                count: row.get(3)?,
            })
        },
    )?;

    statistics.unique_error_groups = store.count(
        "statistics_unique_groups",
        &format!("SELECT COUNT(DISTINCT ra.group_id) FROM report_aggregates ra{where_clause}"),
        filter.params(),
    )?;
    statistics.total_reports = periods.iter().map(|p| p.report_count).sum();
    statistics.periods = periods;

    debug!(
        period = %request.period,
        periods = statistics.periods.len(),
        "get_statistics"
    );
    Ok(StatisticsView { statistics })
}
