//! HTTP API handlers for carerisk-engine

pub mod assessment;
pub mod dashboard;
pub mod error;
pub mod health;

pub use assessment::{get_patient_predictions, predict_assessment};
pub use dashboard::{
    get_department_analytics, get_department_members, get_department_summary, get_members,
    get_priority_members, get_roi_financial_impact, get_summary, get_tier_counts,
    get_tier_financials, get_tier_statistics, get_trends,
};
pub use error::ApiError;
pub use health::health_routes;
