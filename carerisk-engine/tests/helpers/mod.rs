//! Prediction store fixtures shared by the integration tests
//!
//! 30-day window (active rows):
//!
//! | patient | dept | score | tier | cost  | interv | savings | net   | roi    |
//! |---------|------|-------|------|-------|--------|---------|-------|--------|
//! | 1       | CARD | 0.92  | 5    | 10000 | 2000   | 5000    | 3000  | 150.00 |
//! | 2       | CARD | 0.81  | 4    | 6000  | 1500   | 2500    | 1000  | 66.67  |
//! | 3       | ONC  | 0.75  | 4    | 5000  | 1500   | 1000    | -500  | -33.33 |
//! | 4       | ONC  | 0.45  | 3    | 3000  | 800    | 1200    | 400   | 50.00  |
//! | 5       | -    | 0.20  | 1    | 1000  | 0      | 0       | 0     | null   |
//! | 7       | ONC  | 0.30  | 2    | 2000  | 500    | 600     | 100   | 20.00  |
//!
//! Patient 6 (CARD, tier 5) is inactive and patient 7 also has a superseded
//! tier-5 prediction; neither may appear in any rollup. The 60-day window
//! holds patients 1 and 2; the 90-day window is empty.
#![allow(dead_code)]

use carerisk_common::db::create_schema;
use carerisk_common::{FinancialProjection, PredictionWindow, RiskTier};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub const CARDIOLOGY: &str = "Cardiology";
pub const ONCOLOGY: &str = "Oncology";

/// Empty in-memory store with the full schema
pub async fn empty_pool() -> SqlitePool {
    // One connection: every connection to :memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    create_schema(&pool).await.expect("Should create schema");
    pool
}

/// In-memory store seeded with the fixture described above
pub async fn fixture_pool() -> SqlitePool {
    let pool = empty_pool().await;

    for (id, code, name, specialty) in [
        (1, "CARD", CARDIOLOGY, Some("Cardiac")),
        (2, "ONC", ONCOLOGY, None),
        (3, "GER", "Geriatrics", Some("Elder care")),
    ] {
        sqlx::query(
            "INSERT INTO departments (department_id, department_code, department_name, specialty_type)
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(code)
        .bind(name)
        .bind(specialty)
        .execute(&pool)
        .await
        .expect("Should insert department");
    }

    for (id, department, active) in [
        (1, Some(1), true),
        (2, Some(1), true),
        (3, Some(2), true),
        (4, Some(2), true),
        (5, None, true),
        (6, Some(1), false),
        (7, Some(2), true),
    ] {
        insert_patient(&pool, id, department, active).await;
    }

    let day30 = PredictionWindow::Day30;
    let member = |patient, score, tier, cost, interv, rate, savings| Member {
        patient_id: patient,
        window: day30,
        risk_score: score,
        tier,
        window_cost: cost,
        intervention_cost: interv,
        success_rate: rate,
        expected_savings: savings,
        active: true,
    };

    let rows = vec![
        member(1, 0.92, RiskTier::Critical, 10000.0, 2000.0, 0.35, 5000.0),
        member(2, 0.81, RiskTier::High, 6000.0, 1500.0, 0.30, 2500.0),
        member(3, 0.75, RiskTier::High, 5000.0, 1500.0, 0.30, 1000.0),
        member(4, 0.45, RiskTier::Moderate, 3000.0, 800.0, 0.25, 1200.0),
        member(5, 0.20, RiskTier::Normal, 1000.0, 0.0, 0.10, 0.0),
        member(6, 0.99, RiskTier::Critical, 50000.0, 2000.0, 0.35, 20000.0),
        Member {
            active: false,
            ..member(7, 0.97, RiskTier::Critical, 40000.0, 2000.0, 0.35, 15000.0)
        },
        member(7, 0.30, RiskTier::Low, 2000.0, 500.0, 0.20, 600.0),
        Member {
            window: PredictionWindow::Day60,
            ..member(1, 0.95, RiskTier::Critical, 20000.0, 2000.0, 0.35, 9000.0)
        },
        Member {
            window: PredictionWindow::Day60,
            ..member(2, 0.55, RiskTier::Moderate, 9000.0, 1000.0, 0.25, 1500.0)
        },
    ];

    for row in rows {
        insert_member(&pool, &row).await;
    }

    pool
}

async fn insert_patient(pool: &SqlitePool, id: i64, department: Option<i64>, active: bool) {
    sqlx::query(
        "INSERT INTO patients (patient_id, external_id, department_id, age, gender, annual_cost, is_active)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(format!("MBR{:04}", id))
    .bind(department)
    .bind(60 + id)
    .bind(if id % 2 == 0 { "female" } else { "male" })
    .bind(12000.0 + id as f64)
    .bind(active)
    .execute(pool)
    .await
    .expect("Should insert patient");
}

/// One prediction plus its financial projection
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub patient_id: i64,
    pub window: PredictionWindow,
    pub risk_score: f64,
    pub tier: RiskTier,
    pub window_cost: f64,
    pub intervention_cost: f64,
    pub success_rate: f64,
    pub expected_savings: f64,
    pub active: bool,
}

pub async fn insert_member(pool: &SqlitePool, member: &Member) {
    let prediction_id = sqlx::query(
        "INSERT INTO predictions (patient_id, prediction_window, risk_score, risk_tier,
                                  tier_label, model_name, model_version, is_active)
         VALUES (?, ?, ?, ?, ?, 'readmission_xgb', '2.1', ?)",
    )
    .bind(member.patient_id)
    .bind(member.window.as_key())
    .bind(member.risk_score)
    .bind(member.tier.value())
    .bind(member.tier.label())
    .bind(member.active)
    .execute(pool)
    .await
    .expect("Should insert prediction")
    .last_insert_rowid();

    let projection = FinancialProjection::new(
        member.patient_id,
        member.window,
        member.tier,
        member.window_cost,
        member.intervention_cost,
        member.success_rate,
        member.expected_savings,
    );

    sqlx::query(
        "INSERT INTO financial_projections (patient_id, prediction_id, prediction_window, risk_tier,
             window_cost, intervention_cost, success_rate, expected_savings, net_benefit,
             roi_percent, roi_category)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(member.patient_id)
    .bind(prediction_id)
    .bind(member.window.as_key())
    .bind(member.tier.value())
    .bind(projection.window_cost())
    .bind(projection.intervention_cost())
    .bind(projection.success_rate())
    .bind(projection.expected_savings())
    .bind(projection.net_benefit())
    .bind(projection.roi_percent())
    .bind(projection.roi_category().as_str())
    .execute(pool)
    .await
    .expect("Should insert financial projection");
}

/// Float comparison for aggregated values
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
