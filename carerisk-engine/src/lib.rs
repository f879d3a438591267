//! carerisk-engine library - risk prediction bridge and tier aggregation
//!
//! - [`transform`]: nested assessment ↔ flat model schema
//! - [`bridge`]: external risk model invocation
//! - [`aggregation`]: windowed financial rollups over the prediction store
//! - [`api`]: HTTP surface over the above

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod aggregation;
pub mod api;
pub mod bridge;
pub mod pagination;
pub mod transform;

use bridge::Bridge;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Prediction store (read by the engine, written by the model process)
    pub db: SqlitePool,
    pub bridge: Bridge,
}

impl AppState {
    pub fn new(db: SqlitePool, bridge: Bridge) -> Self {
        Self { db, bridge }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let dashboard = Router::new()
        .route("/summary", get(api::get_summary))
        .route("/tiers", get(api::get_tier_statistics))
        .route("/departments", get(api::get_department_summary))
        .route("/priority", get(api::get_priority_members))
        .route("/trends", get(api::get_trends))
        .route("/members", get(api::get_members))
        .route("/department-members", get(api::get_department_members))
        .route("/tier-counts", get(api::get_tier_counts))
        .route("/tier-financials", get(api::get_tier_financials))
        .route("/roi-financial-impact", get(api::get_roi_financial_impact))
        .route("/department-analytics", get(api::get_department_analytics));

    Router::new()
        .route("/api/assessment/predict", post(api::predict_assessment))
        .route(
            "/api/patients/:patient_id/predictions",
            get(api::get_patient_predictions),
        )
        .nest("/api/dashboard", dashboard)
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Dashboard front end is served from a different origin
        .layer(CorsLayer::permissive())
}
