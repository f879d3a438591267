//! Risk vocabulary shared by the bridge and the aggregation engine
//!
//! Every prediction and financial projection is scoped to exactly one
//! [`PredictionWindow`] and carries one [`RiskTier`]. The tier is assigned by
//! the external model; nothing here recomputes it from a score.

use crate::numeric::{percent_of, round_to};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prediction horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PredictionWindow {
    Day30,
    Day60,
    Day90,
}

impl PredictionWindow {
    /// All windows in chronological order (30 → 60 → 90)
    pub const ALL: [PredictionWindow; 3] = [
        PredictionWindow::Day30,
        PredictionWindow::Day60,
        PredictionWindow::Day90,
    ];

    /// Key used by the prediction store and the model process (`30_day`)
    pub fn as_key(&self) -> &'static str {
        match self {
            PredictionWindow::Day30 => "30_day",
            PredictionWindow::Day60 => "60_day",
            PredictionWindow::Day90 => "90_day",
        }
    }

    /// Key used in API responses (`30-day`)
    pub fn api_key(&self) -> &'static str {
        match self {
            PredictionWindow::Day30 => "30-day",
            PredictionWindow::Day60 => "60-day",
            PredictionWindow::Day90 => "90-day",
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            PredictionWindow::Day30 => 30,
            PredictionWindow::Day60 => 60,
            PredictionWindow::Day90 => 90,
        }
    }

    /// Human readable span covered by the window
    pub fn label(&self) -> &'static str {
        match self {
            PredictionWindow::Day30 => "Month 1 (0-30 days)",
            PredictionWindow::Day60 => "Months 1-2 (0-60 days)",
            PredictionWindow::Day90 => "Months 1-3 (0-90 days)",
        }
    }
}

impl Default for PredictionWindow {
    fn default() -> Self {
        PredictionWindow::Day30
    }
}

impl fmt::Display for PredictionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for PredictionWindow {
    type Err = Error;

    /// Accepts `30_day`, `30-day`, `30day` and bare `30`
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let digits = normalized
            .trim_end_matches("day")
            .trim_end_matches(|c: char| c == '_' || c == '-');

        match digits {
            "30" => Ok(PredictionWindow::Day30),
            "60" => Ok(PredictionWindow::Day60),
            "90" => Ok(PredictionWindow::Day90),
            _ => Err(Error::InvalidInput(format!(
                "Unknown prediction window: {}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for PredictionWindow {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PredictionWindow> for String {
    fn from(window: PredictionWindow) -> Self {
        window.as_key().to_string()
    }
}

/// Ordinal risk bucket, 1 (lowest) to 5 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RiskTier {
    Normal = 1,
    Low = 2,
    Moderate = 3,
    High = 4,
    Critical = 5,
}

impl RiskTier {
    /// All tiers, lowest first
    pub const ALL: [RiskTier; 5] = [
        RiskTier::Normal,
        RiskTier::Low,
        RiskTier::Moderate,
        RiskTier::High,
        RiskTier::Critical,
    ];

    pub fn value(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Normal => "Normal",
            RiskTier::Low => "Low Risk",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::High => "High Risk",
            RiskTier::Critical => "Critical Risk",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskTier::Normal => {
                "Patient has low risk of readmission. Routine monitoring recommended."
            }
            RiskTier::Low => {
                "Patient has low-to-moderate risk. Basic preventive measures suggested."
            }
            RiskTier::Moderate => {
                "Patient has moderate risk. Proactive care coordination recommended."
            }
            RiskTier::High => "Patient has high risk. Intensive case management recommended.",
            RiskTier::Critical => "Patient has critical risk. Immediate intervention required.",
        }
    }

    /// Tiers 4 and 5 count as high risk in every rollup
    pub fn is_high_risk(&self) -> bool {
        *self >= RiskTier::High
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl TryFrom<i64> for RiskTier {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(RiskTier::Normal),
            2 => Ok(RiskTier::Low),
            3 => Ok(RiskTier::Moderate),
            4 => Ok(RiskTier::High),
            5 => Ok(RiskTier::Critical),
            other => Err(Error::InvalidInput(format!(
                "Risk tier out of range 1-5: {}",
                other
            ))),
        }
    }
}

impl From<RiskTier> for i64 {
    fn from(tier: RiskTier) -> Self {
        tier.value()
    }
}

impl FromStr for RiskTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Invalid risk tier: {}", s)))?;
        RiskTier::try_from(value)
    }
}

/// ROI bucket stored alongside each projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoiCategory {
    Excellent,
    Strong,
    Positive,
    NoRoi,
}

impl RoiCategory {
    /// Undefined ROI (zero intervention cost) falls into `NoRoi`
    pub fn from_roi_percent(roi_percent: Option<f64>) -> Self {
        match roi_percent {
            Some(roi) if roi > 75.0 => RoiCategory::Excellent,
            Some(roi) if roi >= 50.0 => RoiCategory::Strong,
            Some(roi) if roi > 0.0 => RoiCategory::Positive,
            _ => RoiCategory::NoRoi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoiCategory::Excellent => "EXCELLENT",
            RoiCategory::Strong => "STRONG",
            RoiCategory::Positive => "POSITIVE",
            RoiCategory::NoRoi => "NO_ROI",
        }
    }
}

/// Financial outcome of intervening on one patient over one window
///
/// Fields are private so the two derived values cannot drift:
/// `net_benefit == expected_savings - intervention_cost`, and `roi_percent`
/// is `None` exactly when `intervention_cost == 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProjection {
    patient_id: i64,
    window: PredictionWindow,
    risk_tier: RiskTier,
    window_cost: f64,
    intervention_cost: f64,
    success_rate: f64,
    expected_savings: f64,
    net_benefit: f64,
    roi_percent: Option<f64>,
    roi_category: RoiCategory,
}

impl FinancialProjection {
    pub fn new(
        patient_id: i64,
        window: PredictionWindow,
        risk_tier: RiskTier,
        window_cost: f64,
        intervention_cost: f64,
        success_rate: f64,
        expected_savings: f64,
    ) -> Self {
        let net_benefit = expected_savings - intervention_cost;
        let roi_percent = percent_of(net_benefit, intervention_cost).map(|roi| round_to(roi, 2));

        Self {
            patient_id,
            window,
            risk_tier,
            window_cost,
            intervention_cost,
            success_rate,
            expected_savings,
            net_benefit,
            roi_percent,
            roi_category: RoiCategory::from_roi_percent(roi_percent),
        }
    }

    pub fn patient_id(&self) -> i64 {
        self.patient_id
    }

    pub fn window(&self) -> PredictionWindow {
        self.window
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.risk_tier
    }

    pub fn window_cost(&self) -> f64 {
        self.window_cost
    }

    pub fn intervention_cost(&self) -> f64 {
        self.intervention_cost
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub fn expected_savings(&self) -> f64 {
        self.expected_savings
    }

    pub fn net_benefit(&self) -> f64 {
        self.net_benefit
    }

    pub fn roi_percent(&self) -> Option<f64> {
        self.roi_percent
    }

    pub fn roi_category(&self) -> RoiCategory {
        self.roi_category
    }
}
