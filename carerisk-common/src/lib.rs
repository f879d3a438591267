//! # CareRisk Common Library
//!
//! Shared code for the CareRisk engine including:
//! - Risk vocabulary (prediction windows, risk tiers, ROI categories)
//! - Financial projection invariants and guarded arithmetic
//! - Configuration loading
//! - Prediction store schema and row models

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod numeric;

pub use domain::{FinancialProjection, PredictionWindow, RiskTier, RoiCategory};
pub use error::{Error, Result};
