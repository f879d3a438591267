//! Prediction store initialization
//!
//! The schema is created idempotently so the engine can start against an
//! empty file as well as a store already populated by the model process.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the prediction store and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new prediction store: {}", db_path.display());
    } else {
        info!("Opened existing prediction store: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // Readers run alongside the model process writing new predictions
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index used by the engine
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_departments_table(pool).await?;
    create_patients_table(pool).await?;
    create_predictions_table(pool).await?;
    create_financial_projections_table(pool).await?;
    create_indexes(pool).await?;
    Ok(())
}

async fn create_departments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            department_id INTEGER PRIMARY KEY,
            department_code TEXT NOT NULL UNIQUE,
            department_name TEXT NOT NULL UNIQUE,
            specialty_type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_patients_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS patients (
            patient_id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL,
            department_id INTEGER REFERENCES departments(department_id),
            age INTEGER,
            gender TEXT,
            race TEXT,
            annual_cost REAL NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Predictions are superseded, never updated: a re-run inserts a new row and
/// the writer clears `is_active` on the old one.
async fn create_predictions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            prediction_id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients(patient_id),
            prediction_window TEXT NOT NULL
                CHECK (prediction_window IN ('30_day', '60_day', '90_day')),
            risk_score REAL NOT NULL CHECK (risk_score >= 0 AND risk_score <= 1),
            risk_tier INTEGER NOT NULL CHECK (risk_tier BETWEEN 1 AND 5),
            tier_label TEXT NOT NULL,
            model_name TEXT NOT NULL,
            model_version TEXT NOT NULL,
            prediction_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_financial_projections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS financial_projections (
            projection_id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients(patient_id),
            prediction_id INTEGER NOT NULL REFERENCES predictions(prediction_id),
            prediction_window TEXT NOT NULL
                CHECK (prediction_window IN ('30_day', '60_day', '90_day')),
            risk_tier INTEGER NOT NULL CHECK (risk_tier BETWEEN 1 AND 5),
            window_cost REAL NOT NULL DEFAULT 0,
            intervention_cost REAL NOT NULL DEFAULT 0,
            success_rate REAL NOT NULL DEFAULT 0,
            expected_savings REAL NOT NULL DEFAULT 0,
            net_benefit REAL NOT NULL DEFAULT 0,
            roi_percent REAL,
            roi_category TEXT NOT NULL DEFAULT 'NO_ROI',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_predictions_window_active
            ON predictions(prediction_window, is_active)",
        "CREATE INDEX IF NOT EXISTS idx_predictions_patient ON predictions(patient_id)",
        "CREATE INDEX IF NOT EXISTS idx_projections_prediction
            ON financial_projections(prediction_id)",
        "CREATE INDEX IF NOT EXISTS idx_patients_department ON patients(department_id)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
