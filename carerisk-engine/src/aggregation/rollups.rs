//! Window-scoped rollups
//!
//! Every query reads active patients joined to their active prediction for
//! the window and that prediction's financial projection. Sums use SQLite's
//! `TOTAL()` so an empty window yields `0.0` rather than `NULL`; every ratio
//! is computed afterwards with the guarded helpers in
//! [`carerisk_common::numeric`].

use super::error::{stored_tier, AggregationError};
use carerisk_common::numeric::{percent_of, percent_or_zero, round_to, PERCENT_PLACES, RISK_SCORE_PLACES};
use carerisk_common::{PredictionWindow, RiskTier};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

/// Member counts per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBreakdown {
    pub critical: i64,
    pub high: i64,
    pub moderate: i64,
    pub low: i64,
    pub normal: i64,
}

impl TierBreakdown {
    pub fn count(&self, tier: RiskTier) -> i64 {
        match tier {
            RiskTier::Critical => self.critical,
            RiskTier::High => self.high,
            RiskTier::Moderate => self.moderate,
            RiskTier::Low => self.low,
            RiskTier::Normal => self.normal,
        }
    }

    /// Members in high-risk tiers
    pub fn high_risk(&self) -> i64 {
        RiskTier::ALL
            .into_iter()
            .filter(RiskTier::is_high_risk)
            .map(|tier| self.count(tier))
            .sum()
    }
}

/// Headline numbers for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub window: PredictionWindow,
    pub total_members: i64,
    pub tier_counts: TierBreakdown,
    pub total_projected_cost: f64,
    pub total_intervention_cost: f64,
    pub total_potential_savings: f64,
    pub total_net_benefit: f64,
    /// Pooled ROI; 0 when no intervention cost was projected
    pub avg_roi_percent: f64,
    pub high_risk_count: i64,
    pub high_risk_percentage: f64,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    total_members: i64,
    tier5: i64,
    tier4: i64,
    tier3: i64,
    tier2: i64,
    tier1: i64,
    total_projected_cost: f64,
    total_intervention_cost: f64,
    total_potential_savings: f64,
    total_net_benefit: f64,
}

pub async fn summary(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<WindowSummary, AggregationError> {
    let row = sqlx::query_as::<_, SummaryRow>(
        r#"
        SELECT
            COUNT(DISTINCT p.patient_id) AS total_members,
            COUNT(CASE WHEN pred.risk_tier = 5 THEN 1 END) AS tier5,
            COUNT(CASE WHEN pred.risk_tier = 4 THEN 1 END) AS tier4,
            COUNT(CASE WHEN pred.risk_tier = 3 THEN 1 END) AS tier3,
            COUNT(CASE WHEN pred.risk_tier = 2 THEN 1 END) AS tier2,
            COUNT(CASE WHEN pred.risk_tier = 1 THEN 1 END) AS tier1,
            TOTAL(fp.window_cost) AS total_projected_cost,
            TOTAL(fp.intervention_cost) AS total_intervention_cost,
            TOTAL(fp.expected_savings) AS total_potential_savings,
            TOTAL(fp.net_benefit) AS total_net_benefit
        FROM patients p
        INNER JOIN predictions pred ON pred.patient_id = p.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        "#,
    )
    .bind(window.as_key())
    .fetch_one(pool)
    .await?;

    debug!(window = %window, members = row.total_members, "Computed window summary");

    let tier_counts = TierBreakdown {
        critical: row.tier5,
        high: row.tier4,
        moderate: row.tier3,
        low: row.tier2,
        normal: row.tier1,
    };
    let high_risk_count = tier_counts.high_risk();

    Ok(WindowSummary {
        window,
        total_members: row.total_members,
        tier_counts,
        total_projected_cost: row.total_projected_cost,
        total_intervention_cost: row.total_intervention_cost,
        total_potential_savings: row.total_potential_savings,
        total_net_benefit: row.total_net_benefit,
        avg_roi_percent: percent_or_zero(row.total_net_benefit, row.total_intervention_cost),
        high_risk_count,
        high_risk_percentage: percent_or_zero(high_risk_count as f64, row.total_members as f64),
    })
}

/// Per-tier statistics for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStatistics {
    pub risk_tier: RiskTier,
    pub tier_label: String,
    pub member_count: i64,
    pub avg_risk_score: f64,
    pub min_risk_score: f64,
    pub max_risk_score: f64,
    pub total_cost: f64,
    pub total_intervention_cost: f64,
    pub total_savings: f64,
    pub total_net_benefit: f64,
    /// Mean of the per-member ROI values; `None` when no member has one
    pub avg_roi: Option<f64>,
}

#[derive(Debug, FromRow)]
struct TierStatisticsRow {
    risk_tier: i64,
    member_count: i64,
    avg_risk_score: f64,
    min_risk_score: f64,
    max_risk_score: f64,
    total_cost: f64,
    total_intervention_cost: f64,
    total_savings: f64,
    total_net_benefit: f64,
    avg_roi: Option<f64>,
}

/// Tiers present in the window, highest first
pub async fn tier_statistics(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<Vec<TierStatistics>, AggregationError> {
    let rows = sqlx::query_as::<_, TierStatisticsRow>(
        r#"
        SELECT
            pred.risk_tier AS risk_tier,
            COUNT(*) AS member_count,
            AVG(pred.risk_score) AS avg_risk_score,
            MIN(pred.risk_score) AS min_risk_score,
            MAX(pred.risk_score) AS max_risk_score,
            TOTAL(fp.window_cost) AS total_cost,
            TOTAL(fp.intervention_cost) AS total_intervention_cost,
            TOTAL(fp.expected_savings) AS total_savings,
            TOTAL(fp.net_benefit) AS total_net_benefit,
            AVG(fp.roi_percent) AS avg_roi
        FROM predictions pred
        INNER JOIN patients p ON p.patient_id = pred.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        GROUP BY pred.risk_tier
        ORDER BY pred.risk_tier DESC
        "#,
    )
    .bind(window.as_key())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let tier = stored_tier(row.risk_tier)?;
            Ok(TierStatistics {
                risk_tier: tier,
                tier_label: tier.label().to_string(),
                member_count: row.member_count,
                avg_risk_score: round_to(row.avg_risk_score, RISK_SCORE_PLACES),
                min_risk_score: row.min_risk_score,
                max_risk_score: row.max_risk_score,
                total_cost: row.total_cost,
                total_intervention_cost: row.total_intervention_cost,
                total_savings: row.total_savings,
                total_net_benefit: row.total_net_benefit,
                avg_roi: row.avg_roi.map(|roi| round_to(roi, PERCENT_PLACES)),
            })
        })
        .collect()
}

/// Members of one department for one window
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub department_id: i64,
    pub department_code: String,
    pub department_name: String,
    pub specialty_type: Option<String>,
    pub total_members: i64,
    pub avg_risk_score: f64,
    pub high_risk_count: i64,
    pub total_potential_savings: f64,
    pub avg_roi: Option<f64>,
}

/// Departments with members in the window, most high-risk members first
pub async fn department_summary(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<Vec<DepartmentSummary>, AggregationError> {
    let rows = sqlx::query_as::<_, DepartmentSummary>(
        r#"
        SELECT
            d.department_id AS department_id,
            d.department_code AS department_code,
            d.department_name AS department_name,
            d.specialty_type AS specialty_type,
            COUNT(DISTINCT p.patient_id) AS total_members,
            AVG(pred.risk_score) AS avg_risk_score,
            COUNT(CASE WHEN pred.risk_tier >= 4 THEN 1 END) AS high_risk_count,
            TOTAL(fp.expected_savings) AS total_potential_savings,
            AVG(fp.roi_percent) AS avg_roi
        FROM departments d
        INNER JOIN patients p ON p.department_id = d.department_id
        INNER JOIN predictions pred ON pred.patient_id = p.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        GROUP BY d.department_id, d.department_code, d.department_name, d.specialty_type
        ORDER BY high_risk_count DESC, d.department_name ASC
        "#,
    )
    .bind(window.as_key())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| DepartmentSummary {
            avg_risk_score: round_to(row.avg_risk_score, RISK_SCORE_PLACES),
            avg_roi: row.avg_roi.map(|roi| round_to(roi, PERCENT_PLACES)),
            ..row
        })
        .collect())
}

/// Summary-style aggregates for one window of the trend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub window: PredictionWindow,
    pub window_label: String,
    pub days: u32,
    pub total_members: i64,
    /// 0 for a window with no members
    pub avg_risk_score: f64,
    pub high_risk_count: i64,
    pub total_cost: f64,
    pub total_intervention_cost: f64,
    pub total_savings: f64,
    pub total_net_benefit: f64,
    pub avg_roi_percent: f64,
}

impl TrendPoint {
    fn empty(window: PredictionWindow) -> Self {
        Self {
            window,
            window_label: window.label().to_string(),
            days: window.days(),
            total_members: 0,
            avg_risk_score: 0.0,
            high_risk_count: 0,
            total_cost: 0.0,
            total_intervention_cost: 0.0,
            total_savings: 0.0,
            total_net_benefit: 0.0,
            avg_roi_percent: 0.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct TrendRow {
    prediction_window: String,
    total_members: i64,
    avg_risk_score: Option<f64>,
    high_risk_count: i64,
    total_cost: f64,
    total_intervention_cost: f64,
    total_savings: f64,
    total_net_benefit: f64,
}

/// Exactly one point per window, ordered 30 → 60 → 90
pub async fn trend(pool: &SqlitePool) -> Result<Vec<TrendPoint>, AggregationError> {
    let rows = sqlx::query_as::<_, TrendRow>(
        r#"
        SELECT
            pred.prediction_window AS prediction_window,
            COUNT(DISTINCT p.patient_id) AS total_members,
            AVG(pred.risk_score) AS avg_risk_score,
            COUNT(CASE WHEN pred.risk_tier >= 4 THEN 1 END) AS high_risk_count,
            TOTAL(fp.window_cost) AS total_cost,
            TOTAL(fp.intervention_cost) AS total_intervention_cost,
            TOTAL(fp.expected_savings) AS total_savings,
            TOTAL(fp.net_benefit) AS total_net_benefit
        FROM patients p
        INNER JOIN predictions pred ON pred.patient_id = p.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE p.is_active = 1
          AND pred.is_active = 1
        GROUP BY pred.prediction_window
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut by_window = BTreeMap::new();
    for row in rows {
        let window: PredictionWindow = row
            .prediction_window
            .parse()
            .map_err(|e: carerisk_common::Error| AggregationError::InvalidRow(e.to_string()))?;
        by_window.insert(
            window,
            TrendPoint {
                total_members: row.total_members,
                avg_risk_score: row
                    .avg_risk_score
                    .map(|avg| round_to(avg, RISK_SCORE_PLACES))
                    .unwrap_or(0.0),
                high_risk_count: row.high_risk_count,
                total_cost: row.total_cost,
                total_intervention_cost: row.total_intervention_cost,
                total_savings: row.total_savings,
                total_net_benefit: row.total_net_benefit,
                avg_roi_percent: percent_or_zero(row.total_net_benefit, row.total_intervention_cost),
                ..TrendPoint::empty(window)
            },
        );
    }

    Ok(PredictionWindow::ALL
        .into_iter()
        .map(|window| by_window.remove(&window).unwrap_or_else(|| TrendPoint::empty(window)))
        .collect())
}

/// Member count and expected intervention success per tier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCount {
    pub risk_tier: RiskTier,
    pub patient_count: i64,
    /// Percentage, one decimal
    pub avg_success_rate: f64,
}

#[derive(Debug, FromRow)]
struct TierCountRow {
    risk_tier: i64,
    patient_count: i64,
    avg_success_rate: f64,
}

pub async fn tier_counts(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<Vec<TierCount>, AggregationError> {
    let rows = sqlx::query_as::<_, TierCountRow>(
        r#"
        SELECT
            pred.risk_tier AS risk_tier,
            COUNT(DISTINCT p.patient_id) AS patient_count,
            AVG(fp.success_rate) AS avg_success_rate
        FROM patients p
        INNER JOIN predictions pred ON pred.patient_id = p.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        GROUP BY pred.risk_tier
        ORDER BY pred.risk_tier DESC
        "#,
    )
    .bind(window.as_key())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(TierCount {
                risk_tier: stored_tier(row.risk_tier)?,
                patient_count: row.patient_count,
                avg_success_rate: round_to(row.avg_success_rate * 100.0, 1),
            })
        })
        .collect()
}

/// Financial breakdown of one tier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierFinancials {
    pub window: PredictionWindow,
    pub risk_tier: RiskTier,
    pub tier_name: String,
    pub patient_count: i64,
    pub avg_risk_score: f64,
    pub total_projected_cost: f64,
    pub total_intervention_cost: f64,
    pub total_expected_savings: f64,
    pub total_net_benefit: f64,
    /// Pooled over the tier; `None` when the tier projects no intervention cost
    pub tier_roi_percent: Option<f64>,
    /// Percentage, two decimals
    pub avg_success_rate: f64,
}

#[derive(Debug, FromRow)]
struct TierFinancialsRow {
    risk_tier: i64,
    patient_count: i64,
    avg_risk_score: f64,
    total_projected_cost: f64,
    total_intervention_cost: f64,
    total_expected_savings: f64,
    total_net_benefit: f64,
    avg_success_rate: f64,
}

/// Tiers present in the window, lowest first
pub async fn tier_financials(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<Vec<TierFinancials>, AggregationError> {
    let rows = sqlx::query_as::<_, TierFinancialsRow>(
        r#"
        SELECT
            pred.risk_tier AS risk_tier,
            COUNT(DISTINCT p.patient_id) AS patient_count,
            AVG(pred.risk_score) AS avg_risk_score,
            TOTAL(fp.window_cost) AS total_projected_cost,
            TOTAL(fp.intervention_cost) AS total_intervention_cost,
            TOTAL(fp.expected_savings) AS total_expected_savings,
            TOTAL(fp.net_benefit) AS total_net_benefit,
            AVG(fp.success_rate) AS avg_success_rate
        FROM patients p
        INNER JOIN predictions pred ON pred.patient_id = p.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        GROUP BY pred.risk_tier
        ORDER BY pred.risk_tier ASC
        "#,
    )
    .bind(window.as_key())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let tier = stored_tier(row.risk_tier)?;
            Ok(TierFinancials {
                window,
                risk_tier: tier,
                tier_name: tier.label().to_string(),
                patient_count: row.patient_count,
                avg_risk_score: round_to(row.avg_risk_score, RISK_SCORE_PLACES),
                total_projected_cost: row.total_projected_cost,
                total_intervention_cost: row.total_intervention_cost,
                total_expected_savings: row.total_expected_savings,
                total_net_benefit: row.total_net_benefit,
                tier_roi_percent: percent_of(row.total_net_benefit, row.total_intervention_cost)
                    .map(|roi| round_to(roi, PERCENT_PLACES)),
                avg_success_rate: round_to(row.avg_success_rate * 100.0, PERCENT_PLACES),
            })
        })
        .collect()
}

/// Costs with and without intervention for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiFinancialImpact {
    pub window: PredictionWindow,
    pub projected_costs: f64,
    pub intervention_costs: f64,
    pub total_savings: f64,
    /// Projected cost minus expected savings
    pub actual_costs: f64,
    pub savings_percentage: f64,
    pub high_risk_members: i64,
}

#[derive(Debug, FromRow)]
struct RoiImpactRow {
    projected_costs: f64,
    intervention_costs: f64,
    total_savings: f64,
    actual_costs: f64,
    high_risk_members: i64,
}

pub async fn roi_financial_impact(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<RoiFinancialImpact, AggregationError> {
    let row = sqlx::query_as::<_, RoiImpactRow>(
        r#"
        SELECT
            TOTAL(fp.window_cost) AS projected_costs,
            TOTAL(fp.intervention_cost) AS intervention_costs,
            TOTAL(fp.expected_savings) AS total_savings,
            TOTAL(fp.window_cost - fp.expected_savings) AS actual_costs,
            COUNT(CASE WHEN pred.risk_tier >= 4 THEN 1 END) AS high_risk_members
        FROM financial_projections fp
        INNER JOIN predictions pred ON pred.prediction_id = fp.prediction_id
        INNER JOIN patients p ON p.patient_id = pred.patient_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        "#,
    )
    .bind(window.as_key())
    .fetch_one(pool)
    .await?;

    Ok(RoiFinancialImpact {
        window,
        projected_costs: row.projected_costs,
        intervention_costs: row.intervention_costs,
        total_savings: row.total_savings,
        actual_costs: row.actual_costs,
        savings_percentage: percent_or_zero(row.total_savings, row.projected_costs),
        high_risk_members: row.high_risk_members,
    })
}

/// Tier mix and financials of one department
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentAnalytics {
    pub department_id: i64,
    pub department_code: String,
    pub department_name: String,
    pub specialty_type: Option<String>,
    pub total_patients: i64,
    pub tier_counts: TierBreakdown,
    pub critical_count: i64,
    pub high_count: i64,
    pub medium_count: i64,
    /// Tiers 1 and 2 together
    pub low_count: i64,
    pub avg_risk_score: f64,
    pub max_risk_score: f64,
    pub total_estimated_cost: f64,
    pub total_intervention_cost: f64,
    pub total_potential_savings: f64,
    pub total_net_benefit: f64,
    /// Pooled ROI; `None` when no intervention cost was projected
    pub avg_roi_percent: Option<f64>,
}

#[derive(Debug, FromRow)]
struct DepartmentAnalyticsRow {
    department_id: i64,
    department_code: String,
    department_name: String,
    specialty_type: Option<String>,
    total_patients: i64,
    tier5: i64,
    tier4: i64,
    tier3: i64,
    tier2: i64,
    tier1: i64,
    avg_risk_score: f64,
    max_risk_score: f64,
    total_estimated_cost: f64,
    total_intervention_cost: f64,
    total_potential_savings: f64,
    total_net_benefit: f64,
}

/// Departments with at least one member in the window, largest first
pub async fn department_analytics(
    pool: &SqlitePool,
    window: PredictionWindow,
) -> Result<Vec<DepartmentAnalytics>, AggregationError> {
    let rows = sqlx::query_as::<_, DepartmentAnalyticsRow>(
        r#"
        SELECT
            d.department_id AS department_id,
            d.department_code AS department_code,
            d.department_name AS department_name,
            d.specialty_type AS specialty_type,
            COUNT(DISTINCT p.patient_id) AS total_patients,
            COUNT(CASE WHEN pred.risk_tier = 5 THEN 1 END) AS tier5,
            COUNT(CASE WHEN pred.risk_tier = 4 THEN 1 END) AS tier4,
            COUNT(CASE WHEN pred.risk_tier = 3 THEN 1 END) AS tier3,
            COUNT(CASE WHEN pred.risk_tier = 2 THEN 1 END) AS tier2,
            COUNT(CASE WHEN pred.risk_tier = 1 THEN 1 END) AS tier1,
            AVG(pred.risk_score) AS avg_risk_score,
            MAX(pred.risk_score) AS max_risk_score,
            TOTAL(fp.window_cost) AS total_estimated_cost,
            TOTAL(fp.intervention_cost) AS total_intervention_cost,
            TOTAL(fp.expected_savings) AS total_potential_savings,
            TOTAL(fp.net_benefit) AS total_net_benefit
        FROM departments d
        INNER JOIN patients p ON p.department_id = d.department_id
        INNER JOIN predictions pred ON pred.patient_id = p.patient_id
        INNER JOIN financial_projections fp ON fp.prediction_id = pred.prediction_id
        WHERE pred.prediction_window = ?
          AND p.is_active = 1
          AND pred.is_active = 1
        GROUP BY d.department_id, d.department_code, d.department_name, d.specialty_type
        HAVING COUNT(DISTINCT p.patient_id) > 0
        ORDER BY total_patients DESC, d.department_name ASC
        "#,
    )
    .bind(window.as_key())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| DepartmentAnalytics {
            department_id: row.department_id,
            department_code: row.department_code,
            department_name: row.department_name,
            specialty_type: row.specialty_type,
            total_patients: row.total_patients,
            tier_counts: TierBreakdown {
                critical: row.tier5,
                high: row.tier4,
                moderate: row.tier3,
                low: row.tier2,
                normal: row.tier1,
            },
            critical_count: row.tier5,
            high_count: row.tier4,
            medium_count: row.tier3,
            low_count: row.tier2 + row.tier1,
            avg_risk_score: round_to(row.avg_risk_score, RISK_SCORE_PLACES),
            max_risk_score: row.max_risk_score,
            total_estimated_cost: row.total_estimated_cost,
            total_intervention_cost: row.total_intervention_cost,
            total_potential_savings: row.total_potential_savings,
            total_net_benefit: row.total_net_benefit,
            avg_roi_percent: percent_of(row.total_net_benefit, row.total_intervention_cost)
                .map(|roi| round_to(roi, PERCENT_PLACES)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_risk_counts_tiers_four_and_five() {
        let breakdown = TierBreakdown {
            critical: 2,
            high: 3,
            moderate: 7,
            low: 1,
            normal: 9,
        };
        assert_eq!(breakdown.high_risk(), 5);
        assert_eq!(breakdown.count(RiskTier::Moderate), 7);
        assert_eq!(TierBreakdown::default().high_risk(), 0);
    }
}
