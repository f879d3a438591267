//! Dashboard rollup endpoints
//!
//! Every endpoint takes `window` (`30_day`, `30-day`, `30`...; default 30 day).
//! Listings also take `tiers` (comma list), `limit` and `offset`.

use axum::{
    extract::{Query, State},
    Json,
};
use carerisk_common::PredictionWindow;
use serde::Deserialize;

use super::ApiError;
use crate::aggregation::{
    self, parse_tier_set, DepartmentAnalytics, DepartmentSummary, MemberQuery, MemberRecord,
    RoiFinancialImpact, TierCount, TierFinancials, TierStatistics, TrendPoint, WindowSummary,
};
use crate::pagination::{Page, Paging, DEPARTMENT_PAGE_SIZE, MEMBER_PAGE_SIZE, PRIORITY_LIMIT};
use crate::AppState;

/// Query parameters shared by dashboard endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub window: Option<String>,
    pub tiers: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub department: Option<String>,
}

impl DashboardQuery {
    fn window(&self) -> Result<PredictionWindow, ApiError> {
        match self.window.as_deref().map(str::trim) {
            None | Some("") => Ok(PredictionWindow::default()),
            Some(raw) => raw
                .parse()
                .map_err(|e: carerisk_common::Error| ApiError::BadRequest(e.to_string())),
        }
    }
}

/// GET /api/dashboard/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<WindowSummary>, ApiError> {
    Ok(Json(aggregation::summary(&state.db, query.window()?).await?))
}

/// GET /api/dashboard/tiers
pub async fn get_tier_statistics(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<TierStatistics>>, ApiError> {
    Ok(Json(
        aggregation::tier_statistics(&state.db, query.window()?).await?,
    ))
}

/// GET /api/dashboard/departments
pub async fn get_department_summary(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<DepartmentSummary>>, ApiError> {
    Ok(Json(
        aggregation::department_summary(&state.db, query.window()?).await?,
    ))
}

/// GET /api/dashboard/priority
pub async fn get_priority_members(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<MemberRecord>>, ApiError> {
    let limit = query.limit.unwrap_or(PRIORITY_LIMIT);
    Ok(Json(
        aggregation::priority_members(&state.db, query.window()?, limit).await?,
    ))
}

/// GET /api/dashboard/trends
pub async fn get_trends(State(state): State<AppState>) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    Ok(Json(aggregation::trend(&state.db).await?))
}

/// GET /api/dashboard/members
pub async fn get_members(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Page<MemberRecord>>, ApiError> {
    let paging = Paging::new(query.limit, query.offset, MEMBER_PAGE_SIZE);
    let member_query = MemberQuery::new(query.window()?, paging)
        .with_tiers(parse_tier_set(query.tiers.as_deref())?);

    Ok(Json(aggregation::list_members(&state.db, &member_query).await?))
}

/// GET /api/dashboard/department-members
pub async fn get_department_members(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Page<MemberRecord>>, ApiError> {
    let department = query
        .department
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("department parameter is required".to_string()))?;
    let paging = Paging::new(query.limit, query.offset, DEPARTMENT_PAGE_SIZE);

    Ok(Json(
        aggregation::list_department_members(
            &state.db,
            department,
            query.window()?,
            parse_tier_set(query.tiers.as_deref())?,
            paging,
        )
        .await?,
    ))
}

/// GET /api/dashboard/tier-counts
pub async fn get_tier_counts(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<TierCount>>, ApiError> {
    Ok(Json(aggregation::tier_counts(&state.db, query.window()?).await?))
}

/// GET /api/dashboard/tier-financials
pub async fn get_tier_financials(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<TierFinancials>>, ApiError> {
    Ok(Json(
        aggregation::tier_financials(&state.db, query.window()?).await?,
    ))
}

/// GET /api/dashboard/roi-financial-impact
pub async fn get_roi_financial_impact(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<RoiFinancialImpact>, ApiError> {
    Ok(Json(
        aggregation::roi_financial_impact(&state.db, query.window()?).await?,
    ))
}

/// GET /api/dashboard/department-analytics
pub async fn get_department_analytics(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<DepartmentAnalytics>>, ApiError> {
    Ok(Json(
        aggregation::department_analytics(&state.db, query.window()?).await?,
    ))
}
