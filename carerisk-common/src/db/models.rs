//! Persisted prediction rows
//!
//! The engine only reads these tables; rows are written by the model process.

use crate::domain::{FinancialProjection, PredictionWindow, RiskTier};
use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// One risk prediction for one (patient, window)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub patient_id: i64,
    pub window: PredictionWindow,
    pub risk_score: f64,
    pub risk_tier: RiskTier,
    pub tier_label: String,
    pub model_name: String,
    pub model_version: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PredictionRow {
    patient_id: i64,
    prediction_window: String,
    risk_score: f64,
    risk_tier: i64,
    tier_label: String,
    model_name: String,
    model_version: String,
}

impl TryFrom<PredictionRow> for Prediction {
    type Error = crate::Error;

    fn try_from(row: PredictionRow) -> Result<Self> {
        Ok(Prediction {
            patient_id: row.patient_id,
            window: row.prediction_window.parse()?,
            risk_score: row.risk_score,
            risk_tier: RiskTier::try_from(row.risk_tier)?,
            tier_label: row.tier_label,
            model_name: row.model_name,
            model_version: row.model_version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectionRow {
    patient_id: i64,
    prediction_window: String,
    risk_tier: i64,
    window_cost: f64,
    intervention_cost: f64,
    success_rate: f64,
    expected_savings: f64,
}

impl TryFrom<ProjectionRow> for FinancialProjection {
    type Error = crate::Error;

    /// Derived fields are recomputed so the net benefit and ROI invariants
    /// hold for every projection handed out, whatever the writer stored.
    fn try_from(row: ProjectionRow) -> Result<Self> {
        Ok(FinancialProjection::new(
            row.patient_id,
            row.prediction_window.parse()?,
            RiskTier::try_from(row.risk_tier)?,
            row.window_cost,
            row.intervention_cost,
            row.success_rate,
            row.expected_savings,
        ))
    }
}

/// Active predictions for a patient, ordered 30 → 60 → 90
pub async fn load_active_predictions(pool: &SqlitePool, patient_id: i64) -> Result<Vec<Prediction>> {
    let rows = sqlx::query_as::<_, PredictionRow>(
        r#"
        SELECT patient_id, prediction_window, risk_score, risk_tier,
               tier_label, model_name, model_version
        FROM predictions
        WHERE patient_id = ?
          AND is_active = 1
        ORDER BY prediction_window ASC, prediction_id DESC
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Prediction::try_from).collect()
}

/// Financial projections attached to a patient's active predictions
pub async fn load_active_projections(
    pool: &SqlitePool,
    patient_id: i64,
) -> Result<Vec<FinancialProjection>> {
    let rows = sqlx::query_as::<_, ProjectionRow>(
        r#"
        SELECT fp.patient_id, fp.prediction_window, fp.risk_tier, fp.window_cost,
               fp.intervention_cost, fp.success_rate, fp.expected_savings
        FROM financial_projections fp
        INNER JOIN predictions pred ON fp.prediction_id = pred.prediction_id
        WHERE fp.patient_id = ?
          AND pred.is_active = 1
        ORDER BY fp.prediction_window ASC, fp.projection_id DESC
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(FinancialProjection::try_from).collect()
}
