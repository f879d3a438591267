//! Tests for prediction store initialization and row loading

use carerisk_common::db::{init_database, load_active_predictions, load_active_projections};
use carerisk_common::{PredictionWindow, RiskTier, RoiCategory};
use std::path::PathBuf;

fn test_db_path(tag: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/carerisk-test-{}-{}.db", tag, std::process::id()))
}

fn cleanup(db_path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", db_path.display(), suffix));
    }
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let db_path = test_db_path("create");
    cleanup(&db_path);

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    let pool = result.unwrap();
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(
        tables,
        vec!["departments", "financial_projections", "patients", "predictions"]
    );

    pool.close().await;
    cleanup(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let db_path = test_db_path("existing");
    cleanup(&db_path);

    let pool1 = init_database(&db_path).await.expect("first open");
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    pool1.close().await;
    pool2.unwrap().close().await;
    cleanup(&db_path);
}

#[tokio::test]
async fn test_schema_rejects_out_of_range_tier() {
    let db_path = test_db_path("tier-check");
    cleanup(&db_path);
    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("INSERT INTO patients (patient_id, external_id) VALUES (1, 'P1')")
        .execute(&pool)
        .await
        .unwrap();

    let result = sqlx::query(
        "INSERT INTO predictions (patient_id, prediction_window, risk_score, risk_tier, tier_label, model_name, model_version)
         VALUES (1, '30_day', 0.5, 6, 'x', 'm', 'v')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "Tier 6 must violate the CHECK constraint");

    pool.close().await;
    cleanup(&db_path);
}

#[tokio::test]
async fn test_load_active_rows_skips_superseded_predictions() {
    let db_path = test_db_path("load");
    cleanup(&db_path);
    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("INSERT INTO patients (patient_id, external_id, annual_cost) VALUES (1, 'P1', 12000)")
        .execute(&pool)
        .await
        .unwrap();

    // Superseded prediction followed by the active one
    for (id, active, score, tier) in [(10, 0, 0.20, 2), (11, 1, 0.62, 4)] {
        sqlx::query(
            "INSERT INTO predictions (prediction_id, patient_id, prediction_window, risk_score, risk_tier, tier_label, model_name, model_version, is_active)
             VALUES (?, 1, '30_day', ?, ?, 'label', 'ExtraTreesClassifier', 'v1.0', ?)",
        )
        .bind(id)
        .bind(score)
        .bind(tier)
        .bind(active)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO financial_projections (patient_id, prediction_id, prediction_window, risk_tier, window_cost, intervention_cost, success_rate, expected_savings, net_benefit, roi_percent)
             VALUES (1, ?, '30_day', ?, 986.3, 1200, 0.4, 394.52, 0, 0)",
        )
        .bind(id)
        .bind(tier)
        .execute(&pool)
        .await
        .unwrap();
    }

    let predictions = load_active_predictions(&pool, 1).await.unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].window, PredictionWindow::Day30);
    assert_eq!(predictions[0].risk_tier, RiskTier::High);
    assert_eq!(predictions[0].model_name, "ExtraTreesClassifier");

    let projections = load_active_projections(&pool, 1).await.unwrap();
    assert_eq!(projections.len(), 1);
    let projection = &projections[0];
    // Stored net_benefit/roi_percent were wrong (0); derived values are recomputed
    assert_eq!(
        projection.net_benefit(),
        projection.expected_savings() - projection.intervention_cost()
    );
    assert_eq!(projection.roi_percent(), Some(-67.12));
    assert_eq!(projection.roi_category(), RoiCategory::NoRoi);

    pool.close().await;
    cleanup(&db_path);
}
