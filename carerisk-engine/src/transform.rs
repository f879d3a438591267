//! Canonical schema transformer
//!
//! Maps the nested clinical assessment submitted by callers onto the flat
//! 19-field input the risk model expects, and maps the model's flat
//! per-window output back onto the nested API response. No I/O happens here.
//!
//! The forward direction is total: any JSON value (including `{}` or a
//! non-object) produces a complete [`CanonicalAssessmentInput`], because every
//! field has a fallback.

use carerisk_common::{PredictionWindow, RiskTier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Age used when the submitted value is missing or not numeric
pub const DEFAULT_AGE: i64 = 65;

/// Race code used when the submitted value is missing or not numeric
pub const DEFAULT_RACE: i64 = 1;

/// Sentinel meaning "no prior admission on record"
pub const NO_PRIOR_ADMISSION_DAYS: f64 = 999.0;

/// Two-way gender code understood by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Gender {
    Male = 1,
    Female = 2,
}

impl Gender {
    /// `"male"` (any case) is 1; every other value, including absence, is 2
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some(s) if s.trim().eq_ignore_ascii_case("male") => Gender::Male,
            _ => Gender::Female,
        }
    }
}

impl From<Gender> for u8 {
    fn from(gender: Gender) -> Self {
        gender as u8
    }
}

impl TryFrom<u8> for Gender {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Gender::Male),
            2 => Ok(Gender::Female),
            other => Err(format!("invalid gender code {}", other)),
        }
    }
}

/// Chronic condition flags, each 0 or 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicConditions {
    pub has_alzheimers: u8,
    pub has_chf: u8,
    pub has_ckd: u8,
    pub has_cancer: u8,
    pub has_copd: u8,
    pub has_depression: u8,
    pub has_diabetes: u8,
    pub has_ischemic_heart: u8,
    pub has_ra_oa: u8,
    pub has_stroke: u8,
    pub has_esrd: u8,
}

impl ChronicConditions {
    fn from_section(section: Option<&Value>) -> Self {
        let flag = |key: &str| u8::from(is_truthy(field(section, key)));

        Self {
            has_alzheimers: flag("has_alzheimers"),
            has_chf: flag("has_chf"),
            has_ckd: flag("has_ckd"),
            has_cancer: flag("has_cancer"),
            has_copd: flag("has_copd"),
            has_depression: flag("has_depression"),
            has_diabetes: flag("has_diabetes"),
            has_ischemic_heart: flag("has_ischemic_heart"),
            has_ra_oa: flag("has_ra_oa"),
            has_stroke: flag("has_stroke"),
            has_esrd: flag("has_esrd"),
        }
    }

    /// Number of flagged conditions
    pub fn count(&self) -> u32 {
        [
            self.has_alzheimers,
            self.has_chf,
            self.has_ckd,
            self.has_cancer,
            self.has_copd,
            self.has_depression,
            self.has_diabetes,
            self.has_ischemic_heart,
            self.has_ra_oa,
            self.has_stroke,
            self.has_esrd,
        ]
        .iter()
        .map(|&f| u32::from(f))
        .sum()
    }
}

/// Utilization counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub total_admissions: f64,
    pub total_hospital_days: f64,
    pub days_since_last_admission: f64,
    pub total_outpatient_visits: f64,
}

impl Default for Utilization {
    fn default() -> Self {
        Self {
            total_admissions: 0.0,
            total_hospital_days: 0.0,
            days_since_last_admission: NO_PRIOR_ADMISSION_DAYS,
            total_outpatient_visits: 0.0,
        }
    }
}

/// Flat 19-field model input
///
/// Serializes with the field names the model process reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAssessmentInput {
    pub age: i64,
    pub gender: Gender,
    pub race: i64,
    #[serde(rename = "total_annual_cost")]
    pub annual_cost: f64,
    #[serde(flatten)]
    pub conditions: ChronicConditions,
    #[serde(flatten)]
    pub utilization: Utilization,
}

impl CanonicalAssessmentInput {
    /// Forward transform: nested `{demographics, conditions, utilization}`
    /// into the flat model input. Never fails.
    pub fn from_assessment(assessment: &Value) -> Self {
        let demographics = assessment.get("demographics");
        let conditions = assessment.get("conditions");
        let utilization = assessment.get("utilization");

        // A parsed zero counts as missing, like an unset field
        let float_or = |key: &str, fallback: f64| {
            parse_float(field(utilization, key))
                .filter(|f| *f != 0.0)
                .unwrap_or(fallback)
        };
        let int_or = |key: &str, fallback: i64| {
            parse_int(field(demographics, key))
                .filter(|i| *i != 0)
                .unwrap_or(fallback)
        };

        Self {
            age: int_or("age", DEFAULT_AGE),
            gender: Gender::from_value(field(demographics, "gender")),
            race: int_or("race", DEFAULT_RACE),
            annual_cost: parse_float(field(demographics, "total_annual_cost")).unwrap_or(0.0),
            conditions: ChronicConditions::from_section(conditions),
            utilization: Utilization {
                total_admissions: float_or("total_admissions", 0.0),
                total_hospital_days: float_or("total_hospital_days", 0.0),
                days_since_last_admission: float_or(
                    "days_since_last_admission",
                    NO_PRIOR_ADMISSION_DAYS,
                ),
                total_outpatient_visits: float_or("total_outpatient_visits", 0.0),
            },
        }
    }
}

fn field<'a>(section: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    section.and_then(|s| s.get(key))
}

/// Integer from a JSON number or the leading integer of a string (`"70 yrs"` → 70)
fn parse_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let sign_len = usize::from(s.starts_with(|c: char| c == '+' || c == '-'));
            let digits_end = s[sign_len..]
                .find(|c: char| !c.is_ascii_digit())
                .map_or(s.len(), |i| i + sign_len);
            if digits_end == sign_len {
                return None;
            }
            s[..digits_end].parse().ok()
        }
        _ => None,
    }
}

/// Float from a JSON number or the numeric prefix of a string (`"3 visits"` → 3)
fn parse_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let s = s.trim_start();
            let prefix = &s[..float_prefix_len(s)];
            if prefix.is_empty() {
                return None;
            }
            prefix.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Length of the leading decimal literal: sign, digits, optional fraction,
/// optional exponent. A dangling `.` or exponent marker is not part of it.
/// Single pass over the bytes.
fn float_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    end
}

/// Condition flag truthiness
///
/// Strings count as set unless empty, `"0"` or `"false"`; numbers unless zero.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Per-window risk prediction as emitted by the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelPrediction {
    pub risk_score: f64,
    pub tier: RiskTier,
    #[serde(default)]
    pub tier_label: String,
    #[serde(default)]
    pub description: String,
}

/// Per-window financial projection as emitted by the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelProjection {
    pub projected_cost: f64,
    pub intervention_cost: f64,
    pub expected_savings: f64,
    pub net_benefit: f64,
    #[serde(default)]
    pub roi_percent: Option<f64>,
    pub success_rate: f64,
    #[serde(default)]
    pub success_rate_range: String,
    #[serde(default)]
    pub label: String,
    pub days: u32,
}

/// Model output document exactly as decoded from stdout
///
/// Keys are the model's window keys (`30_day`). Unknown fields such as
/// `patient_data` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawModelOutput {
    #[serde(default)]
    pub patient_id_db: Option<i64>,
    pub predictions: BTreeMap<String, ModelPrediction>,
    pub projection: BTreeMap<String, ModelProjection>,
    #[serde(default)]
    pub explanations: Option<BTreeMap<String, Value>>,
}

/// Model output with all three windows present
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub patient_id_db: Option<i64>,
    pub windows: BTreeMap<PredictionWindow, (ModelPrediction, ModelProjection)>,
    pub explanations: Option<BTreeMap<String, Value>>,
}

impl ModelOutput {
    /// Check the window contract: every window must appear under both
    /// `predictions` and `projection`. Returns a description of the first
    /// violation found.
    pub fn from_raw(mut raw: RawModelOutput) -> Result<Self, String> {
        let mut windows = BTreeMap::new();

        for window in PredictionWindow::ALL {
            let prediction = raw
                .predictions
                .remove(window.as_key())
                .ok_or_else(|| format!("predictions missing window {}", window.as_key()))?;
            let projection = raw
                .projection
                .remove(window.as_key())
                .ok_or_else(|| format!("projection missing window {}", window.as_key()))?;
            windows.insert(window, (prediction, projection));
        }

        Ok(Self {
            patient_id_db: raw.patient_id_db,
            windows,
            explanations: raw.explanations,
        })
    }
}

/// One window of the API response; numbers are pre-formatted strings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowReport {
    /// Percentage, one decimal (`0.4231` → `"42.3"`)
    pub risk_score: String,
    pub risk_tier: RiskTier,
    pub tier_label: String,
    pub description: String,
    pub projected_cost: String,
    pub intervention_cost: String,
    pub expected_savings: String,
    pub net_benefit: String,
    /// `None` when the model reported no ROI (zero intervention cost)
    pub roi_percent: Option<String>,
    pub success_rate: String,
    pub success_rate_range: String,
    pub window: String,
    pub days: u32,
}

/// Nested API response for one assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub success: bool,
    pub request_id: String,
    pub patient_id_assigned: Option<i64>,
    pub predictions: BTreeMap<String, WindowReport>,
    /// `null` when the model computed none, as opposed to an empty map
    pub explanations: Option<BTreeMap<String, Value>>,
    pub message: String,
}

/// Rewrite a model window key (`30_day`) into API form (`30-day`)
pub fn api_window_key(key: &str) -> String {
    key.replacen('_', "-", 1)
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn percent_1dp(fraction: f64) -> String {
    format!("{:.1}", fraction * 100.0)
}

impl AssessmentResponse {
    /// Reverse transform: validated model output into the nested response
    pub fn from_model_output(output: ModelOutput, request_id: &str) -> Self {
        let predictions = output
            .windows
            .into_iter()
            .map(|(window, (prediction, projection))| {
                let tier = prediction.tier;
                let or_default = |text: String, default: &str| {
                    if text.trim().is_empty() {
                        default.to_string()
                    } else {
                        text
                    }
                };
                let report = WindowReport {
                    risk_score: percent_1dp(prediction.risk_score),
                    risk_tier: tier,
                    tier_label: or_default(prediction.tier_label, tier.label()),
                    description: or_default(prediction.description, tier.description()),
                    projected_cost: money(projection.projected_cost),
                    intervention_cost: money(projection.intervention_cost),
                    expected_savings: money(projection.expected_savings),
                    net_benefit: money(projection.net_benefit),
                    roi_percent: projection.roi_percent.map(|roi| format!("{:.1}", roi)),
                    success_rate: percent_1dp(projection.success_rate),
                    success_rate_range: projection.success_rate_range,
                    window: projection.label,
                    days: projection.days,
                };
                (window.api_key().to_string(), report)
            })
            .collect();

        let explanations = output.explanations.map(|explanations| {
            explanations
                .into_iter()
                .map(|(key, value)| (api_window_key(&key), value))
                .collect()
        });

        Self {
            success: true,
            request_id: request_id.to_string(),
            patient_id_assigned: output.patient_id_db,
            predictions,
            explanations,
            message: "Risk prediction completed successfully".to_string(),
        }
    }
}
