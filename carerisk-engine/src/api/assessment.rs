//! Single-assessment prediction and stored prediction lookup

use axum::{
    extract::{Path, State},
    Json,
};
use carerisk_common::db::{load_active_predictions, load_active_projections, Prediction};
use carerisk_common::FinancialProjection;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;
use crate::bridge::PredictOptions;
use crate::transform::AssessmentResponse;
use crate::AppState;

/// POST /api/assessment/predict
///
/// Body is the nested assessment (`demographics`, `conditions`,
/// `utilization`) plus optional `patientId` and `saveToStore` (default true).
pub async fn predict_assessment(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "assessment must be a JSON object".to_string(),
        ));
    }

    let options = PredictOptions {
        patient_id: body
            .get("patientId")
            .and_then(Value::as_str)
            .map(str::to_string),
        save_to_store: body
            .get("saveToStore")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    };

    let response = state.bridge.predict(&body, options).await?;
    Ok(Json(response))
}

/// Stored predictions and projections for one patient
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPredictions {
    pub patient_id: i64,
    pub predictions: Vec<Prediction>,
    pub projections: Vec<FinancialProjection>,
}

/// GET /api/patients/:patient_id/predictions
pub async fn get_patient_predictions(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
) -> Result<Json<PatientPredictions>, ApiError> {
    let predictions = load_active_predictions(&state.db, patient_id).await?;
    if predictions.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No active predictions for patient {}",
            patient_id
        )));
    }
    let projections = load_active_projections(&state.db, patient_id).await?;

    Ok(Json(PatientPredictions {
        patient_id,
        predictions,
        projections,
    }))
}
