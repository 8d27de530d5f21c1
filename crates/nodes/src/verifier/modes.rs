//! The five verification modes the AI Verifier supports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    VamnVerify,
    LucaAnalyze,
    AnomalyDetect,
    FormatValidate,
    ThresholdCheck,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VamnVerify => "vamn_verify",
            Self::LucaAnalyze => "luca_analyze",
            Self::AnomalyDetect => "anomaly_detect",
            Self::FormatValidate => "format_validate",
            Self::ThresholdCheck => "threshold_check",
        }
    }
}

/// Result of a single verification check, local or remote. `confidence`
/// is always populated; the remaining fields are best-effort and mode
/// dependent (a local check rarely has `suggestions`, a remote one rarely
/// needs `anomalies`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub mode: String,
    pub passed: bool,
    pub confidence: f64,
    pub reason: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub anomalies: Vec<Value>,
    pub model: Option<String>,
    pub processing_time_ms: Option<i64>,
}

impl VerificationOutcome {
    /// Bare-bones outcome for a local check: no model, no timing, no
    /// suggestions or anomalies until the caller fills them in.
    pub fn local(mode: VerificationMode, passed: bool, confidence: f64) -> Self {
        Self {
            mode: mode.as_str().to_string(),
            passed,
            confidence,
            reason: None,
            suggestions: Vec::new(),
            anomalies: Vec::new(),
            model: None,
            processing_time_ms: None,
        }
    }
}

fn default_max_high_anomalies() -> usize {
    3
}

/// An inclusive numeric range; either bound may be absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExpectedRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Same shape as [`ExpectedRange`], kept as a distinct type because
/// `threshold_check` and `anomaly_detect` evolve independently even though
/// today they're both just a min/max pair.
pub type ThresholdRange = ExpectedRange;

/// Config for `anomaly_detect`: presence, sign, and range checks over the
/// output's fields, each violation contributing one anomaly entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyDetectConfig {
    #[serde(default, rename = "requiredFields")]
    pub required_fields: Vec<String>,
    #[serde(default, rename = "nonNegativeFields")]
    pub non_negative_fields: Vec<String>,
    #[serde(default, rename = "expectedRanges")]
    pub expected_ranges: HashMap<String, ExpectedRange>,
    #[serde(default = "default_max_high_anomalies", rename = "maxHighAnomalies")]
    pub max_high_anomalies: usize,
}

/// Checks `output` for missing required fields, negative values in fields
/// that must not go negative, and numeric fields outside their expected
/// range. Missing required fields and negative values are `critical`;
/// out-of-range values are `high`. Passes iff there are no criticals and
/// no more than `max_high_anomalies` highs. Confidence degrades by 0.1 per
/// anomaly, floored at 0.
pub fn anomaly_detect_local(output: &Value, config: &AnomalyDetectConfig) -> VerificationOutcome {
    let mut anomalies = Vec::new();

    for field in &config.required_fields {
        if output.get(field).map(Value::is_null).unwrap_or(true) {
            anomalies.push(serde_json::json!({
                "field": field,
                "severity": "critical",
                "reason": format!("required field `{field}` is missing"),
            }));
        }
    }

    for field in &config.non_negative_fields {
        if let Some(n) = output.get(field).and_then(Value::as_f64) {
            if n < 0.0 {
                anomalies.push(serde_json::json!({
                    "field": field,
                    "severity": "critical",
                    "reason": format!("field `{field}` is negative ({n})"),
                }));
            }
        }
    }

    for (field, range) in &config.expected_ranges {
        let Some(n) = output.get(field).and_then(Value::as_f64) else { continue };
        let below = range.min.map(|min| n < min).unwrap_or(false);
        let above = range.max.map(|max| n > max).unwrap_or(false);
        if below || above {
            anomalies.push(serde_json::json!({
                "field": field,
                "severity": "high",
                "reason": format!("field `{field}` value {n} is outside expected range {:?}..{:?}", range.min, range.max),
            }));
        }
    }

    let critical = anomalies.iter().filter(|a| a["severity"] == "critical").count();
    let high = anomalies.iter().filter(|a| a["severity"] == "high").count();
    let passed = critical == 0 && high <= config.max_high_anomalies;
    let confidence = (1.0 - 0.1 * anomalies.len() as f64).max(0.0);

    let reason = (!passed).then(|| format!("{critical} critical and {high} high-severity anomalies found"));

    VerificationOutcome { anomalies, reason, ..VerificationOutcome::local(VerificationMode::AnomalyDetect, passed, confidence) }
}

/// Validates a JSON value's shape against a minimal schema: required field
/// names and their expected JSON type tag (`"string"`, `"number"`,
/// `"boolean"`, `"array"`, `"object"`).
pub fn format_validate_local(output: &Value, required_fields: &[(String, String)]) -> VerificationOutcome {
    for (field, expected_type) in required_fields {
        let Some(actual) = output.get(field) else {
            let reason = Some(format!("missing required field `{field}`"));
            return VerificationOutcome { reason, ..VerificationOutcome::local(VerificationMode::FormatValidate, false, 0.0) };
        };

        let actual_type = match actual {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Null => "null",
        };

        if actual_type != expected_type {
            let reason = Some(format!("field `{field}` expected type `{expected_type}`, found `{actual_type}`"));
            return VerificationOutcome { reason, ..VerificationOutcome::local(VerificationMode::FormatValidate, false, 0.0) };
        }
    }

    VerificationOutcome::local(VerificationMode::FormatValidate, true, 1.0)
}

/// Checks each named field in `thresholds` against its configured min/max.
/// A field absent from `output` is skipped rather than treated as a
/// failure — `thresholds` only constrains fields that are present.
pub fn threshold_check_local(output: &Value, thresholds: &HashMap<String, ThresholdRange>) -> VerificationOutcome {
    let mut violations = Vec::new();

    for (field, range) in thresholds {
        let Some(n) = output.get(field).and_then(Value::as_f64) else { continue };
        if let Some(min) = range.min {
            if n < min {
                violations.push(format!("`{field}` = {n} is below minimum {min}"));
            }
        }
        if let Some(max) = range.max {
            if n > max {
                violations.push(format!("`{field}` = {n} is above maximum {max}"));
            }
        }
    }

    let passed = violations.is_empty();
    let confidence = if passed { 1.0 } else { (1.0 - 0.1 * violations.len() as f64).max(0.0) };
    let reason = (!passed).then(|| violations.join("; "));

    VerificationOutcome { reason, ..VerificationOutcome::local(VerificationMode::ThresholdCheck, passed, confidence) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anomaly_detect_flags_missing_required_field_as_critical() {
        let config = AnomalyDetectConfig { required_fields: vec!["vendor".into()], ..Default::default() };
        let outcome = anomaly_detect_local(&json!({"amount": 10}), &config);
        assert!(!outcome.passed);
        assert_eq!(outcome.anomalies[0]["severity"], "critical");
    }

    #[test]
    fn anomaly_detect_flags_negative_non_negative_field_as_critical() {
        let config = AnomalyDetectConfig { non_negative_fields: vec!["amount".into()], ..Default::default() };
        let outcome = anomaly_detect_local(&json!({"amount": -5}), &config);
        assert!(!outcome.passed);
    }

    #[test]
    fn anomaly_detect_tolerates_highs_up_to_the_configured_max() {
        let mut expected_ranges = HashMap::new();
        expected_ranges.insert("a".to_string(), ExpectedRange { min: Some(0.0), max: Some(10.0) });
        expected_ranges.insert("b".to_string(), ExpectedRange { min: Some(0.0), max: Some(10.0) });
        let config = AnomalyDetectConfig { expected_ranges, max_high_anomalies: 2, ..Default::default() };
        let outcome = anomaly_detect_local(&json!({"a": 50, "b": 50}), &config);
        assert!(outcome.passed);
        assert_eq!(outcome.anomalies.len(), 2);
    }

    #[test]
    fn anomaly_detect_fails_once_highs_exceed_the_max() {
        let mut expected_ranges = HashMap::new();
        expected_ranges.insert("a".to_string(), ExpectedRange { min: Some(0.0), max: Some(10.0) });
        let config = AnomalyDetectConfig { expected_ranges, max_high_anomalies: 0, ..Default::default() };
        let outcome = anomaly_detect_local(&json!({"a": 50}), &config);
        assert!(!outcome.passed);
    }

    #[test]
    fn anomaly_detect_confidence_degrades_per_anomaly() {
        let config = AnomalyDetectConfig { required_fields: vec!["a".into(), "b".into()], max_high_anomalies: 10, ..Default::default() };
        let outcome = anomaly_detect_local(&json!({}), &config);
        assert!((outcome.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn format_validate_catches_missing_field() {
        let outcome = format_validate_local(&json!({"amount": 10}), &[("vendor".to_string(), "string".to_string())]);
        assert!(!outcome.passed);
    }

    #[test]
    fn format_validate_passes_matching_shape() {
        let outcome = format_validate_local(&json!({"vendor": "acme"}), &[("vendor".to_string(), "string".to_string())]);
        assert!(outcome.passed);
        assert_eq!(outcome.confidence, 1.0);
    }

    #[test]
    fn threshold_check_flags_field_above_max() {
        let mut thresholds = HashMap::new();
        thresholds.insert("total".to_string(), ThresholdRange { min: None, max: Some(1000.0) });
        let outcome = threshold_check_local(&json!({"total": 5000}), &thresholds);
        assert!(!outcome.passed);
    }

    #[test]
    fn threshold_check_ignores_fields_not_present_in_output() {
        let mut thresholds = HashMap::new();
        thresholds.insert("total".to_string(), ThresholdRange { min: None, max: Some(1000.0) });
        let outcome = threshold_check_local(&json!({"other": 1}), &thresholds);
        assert!(outcome.passed);
    }

    #[test]
    fn threshold_check_passes_within_both_bounds() {
        let mut thresholds = HashMap::new();
        thresholds.insert("total".to_string(), ThresholdRange { min: Some(0.0), max: Some(1000.0) });
        let outcome = threshold_check_local(&json!({"total": 500}), &thresholds);
        assert!(outcome.passed);
    }
}
