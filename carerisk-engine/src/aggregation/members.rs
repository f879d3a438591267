//! Individually identified members
//!
//! The tier listing, the department listing and the priority ranking share
//! one row shape and one query builder. Filters are always bound parameters.

use super::error::{stored_tier, AggregationError};
use crate::pagination::{Page, Paging, MAX_LIMIT};
use carerisk_common::{PredictionWindow, RiskTier, RoiCategory};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use tracing::debug;

const MEMBER_COLUMNS: &str = r#"
    SELECT
        p.patient_id AS id,
        p.external_id AS external_id,
        p.age AS age,
        p.gender AS gender,
        p.annual_cost AS annual_cost,
        d.department_name AS department,
        d.department_code AS dept_code,
        pred.risk_score AS risk_score,
        pred.risk_tier AS risk_tier,
        pred.tier_label AS tier_label,
        fp.window_cost AS estimated_cost,
        fp.intervention_cost AS intervention_cost,
        fp.expected_savings AS expected_savings,
        fp.net_benefit AS net_benefit,
        fp.roi_percent AS roi_percent
    FROM patients p
    LEFT JOIN departments d ON d.department_id = p.department_id
    INNER JOIN predictions pred ON pred.patient_id = p.patient_id
    INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
"#;

/// One member with their prediction and projection for a window
///
/// Chronic condition lists belong to patient records and are not part of
/// this row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub annual_cost: f64,
    pub department: Option<String>,
    pub dept_code: Option<String>,
    pub risk_score: f64,
    pub risk_tier: RiskTier,
    pub tier_label: String,
    pub estimated_cost: f64,
    pub intervention_cost: f64,
    pub expected_savings: f64,
    pub net_benefit: f64,
    pub roi_percent: Option<f64>,
    pub roi_category: RoiCategory,
}

#[derive(Debug, FromRow)]
struct MemberRow {
    id: i64,
    external_id: String,
    age: Option<i64>,
    gender: Option<String>,
    annual_cost: f64,
    department: Option<String>,
    dept_code: Option<String>,
    risk_score: f64,
    risk_tier: i64,
    tier_label: String,
    estimated_cost: f64,
    intervention_cost: f64,
    expected_savings: f64,
    net_benefit: f64,
    roi_percent: Option<f64>,
}

impl TryFrom<MemberRow> for MemberRecord {
    type Error = AggregationError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(MemberRecord {
            id: row.id,
            name: format!("Patient {}", row.external_id),
            external_id: row.external_id,
            age: row.age,
            gender: row.gender,
            annual_cost: row.annual_cost,
            department: row.department,
            dept_code: row.dept_code,
            risk_score: row.risk_score,
            risk_tier: stored_tier(row.risk_tier)?,
            tier_label: row.tier_label,
            estimated_cost: row.estimated_cost,
            intervention_cost: row.intervention_cost,
            expected_savings: row.expected_savings,
            net_benefit: row.net_benefit,
            roi_percent: row.roi_percent,
            roi_category: RoiCategory::from_roi_percent(row.roi_percent),
        })
    }
}

/// Filters for a member listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberQuery {
    pub window: PredictionWindow,
    /// Exact tiers to include; empty means every tier
    pub tiers: BTreeSet<RiskTier>,
    /// Exact department name
    pub department: Option<String>,
    pub paging: Paging,
}

impl MemberQuery {
    pub fn new(window: PredictionWindow, paging: Paging) -> Self {
        Self {
            window,
            tiers: BTreeSet::new(),
            department: None,
            paging,
        }
    }

    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = RiskTier>) -> Self {
        self.tiers = tiers.into_iter().collect();
        self
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(MEMBER_COLUMNS);

        builder
            .push(" WHERE pred.prediction_window = ")
            .push_bind(self.window.as_key())
            .push(" AND p.is_active = 1 AND pred.is_active = 1");

        if let Some(department) = &self.department {
            builder
                .push(" AND d.department_name = ")
                .push_bind(department.clone());
        }

        if !self.tiers.is_empty() {
            builder.push(" AND pred.risk_tier IN (");
            let mut tiers = builder.separated(", ");
            for tier in &self.tiers {
                tiers.push_bind(tier.value());
            }
            tiers.push_unseparated(")");
        }

        builder
            .push(" ORDER BY pred.risk_score DESC, p.patient_id ASC LIMIT ")
            .push_bind(self.paging.limit)
            .push(" OFFSET ")
            .push_bind(self.paging.offset);

        builder
    }
}

/// Members matching `query`, highest risk score first
pub async fn list_members(
    pool: &SqlitePool,
    query: &MemberQuery,
) -> Result<Page<MemberRecord>, AggregationError> {
    let mut builder = query.build();
    let rows = builder
        .build_query_as::<MemberRow>()
        .fetch_all(pool)
        .await?;

    let members = rows
        .into_iter()
        .map(MemberRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        window = %query.window,
        tiers = ?query.tiers,
        department = ?query.department,
        rows = members.len(),
        "Listed members"
    );

    Ok(Page::new(query.paging, members))
}

/// Members of one named department
pub async fn list_department_members(
    pool: &SqlitePool,
    department: &str,
    window: PredictionWindow,
    tiers: BTreeSet<RiskTier>,
    paging: Paging,
) -> Result<Page<MemberRecord>, AggregationError> {
    if department.trim().is_empty() {
        return Err(AggregationError::InvalidInput(
            "department name is required".to_string(),
        ));
    }

    let query = MemberQuery::new(window, paging)
        .with_tiers(tiers)
        .in_department(department);
    list_members(pool, &query).await
}

/// High-risk members with positive ROI, largest net benefit first
pub async fn priority_members(
    pool: &SqlitePool,
    window: PredictionWindow,
    limit: i64,
) -> Result<Vec<MemberRecord>, AggregationError> {
    let rows = sqlx::query_as::<_, MemberRow>(&format!(
        "{} WHERE pred.prediction_window = ?
           AND p.is_active = 1
           AND pred.is_active = 1
           AND pred.risk_tier >= 4
           AND fp.roi_percent > 0
         ORDER BY fp.net_benefit DESC, p.patient_id ASC
         LIMIT ?",
        MEMBER_COLUMNS
    ))
    .bind(window.as_key())
    .bind(limit.clamp(1, MAX_LIMIT))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(MemberRecord::try_from).collect()
}
