//! HTTP client for the external VAMN and Luca verification services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::AiVerificationError;
use super::modes::{VerificationMode, VerificationOutcome};

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub vamn_url: String,
    pub luca_url: String,
    /// When `true`, a failed verification aborts the node as a fatal error.
    /// When `false`, a failure is logged and the outcome is attached to the
    /// node's output without stopping the execution.
    pub strict: bool,
}

/// `POST {vamn_url}/api/verify` request body.
#[derive(Debug, Serialize)]
struct VamnRequest<'a> {
    #[serde(rename = "type")]
    verification_type: &'a str,
    data: &'a Value,
    inputs: &'a Value,
    output: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct VamnResponse {
    verified: bool,
    confidence: f64,
    reason: Option<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    anomalies: Vec<Value>,
}

/// `POST {luca_url}/api/analyze` request body.
#[derive(Debug, Serialize)]
struct LucaRequest<'a> {
    #[serde(rename = "type")]
    analysis_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nodeType")]
    node_type: Option<&'a str>,
    data: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    historical: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "expectedFormat")]
    expected_format: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "financialRules")]
    financial_rules: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct LucaResponse {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    analysis: Option<bool>,
    confidence: f64,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    issues: Vec<Value>,
    score: Option<f64>,
}

impl LucaResponse {
    /// Luca reports success as either `valid` or `analysis` depending on
    /// the request type; treat either as the pass/fail signal.
    fn passed(&self) -> bool {
        self.valid.or(self.analysis).unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct AiVerifier {
    client: reqwest::Client,
    config: VerifierConfig,
}

impl AiVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    pub fn strict(&self) -> bool {
        self.config.strict
    }

    /// Verifies `output` (produced from `inputs`) against the VAMN
    /// verification service, per the node's `rules`/`context`/`options`.
    pub async fn vamn_verify(
        &self,
        node_type: &str,
        inputs: &Value,
        output: &Value,
        rules: Option<&Value>,
        context: Option<&Value>,
        options: Option<&Value>,
        tenant_id: Uuid,
        request_id: Uuid,
    ) -> Result<VerificationOutcome, AiVerificationError> {
        let url = format!("{}/api/verify", self.config.vamn_url.trim_end_matches('/'));
        let body = VamnRequest { verification_type: node_type, data: output, inputs, output, rules, context, options };

        let response = self
            .client
            .post(&url)
            .header("X-Tenant-ID", tenant_id.to_string())
            .header("X-Request-ID", request_id.to_string())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiVerificationError::Protocol(format!("vamn_verify service responded with {}", response.status())));
        }

        let body: VamnResponse =
            response.json().await.map_err(|e| AiVerificationError::Protocol(format!("invalid response body: {e}")))?;

        let outcome = VerificationOutcome {
            reason: body.reason,
            suggestions: body.suggestions,
            anomalies: body.anomalies,
            ..VerificationOutcome::local(VerificationMode::VamnVerify, body.verified, body.confidence)
        };

        self.enforce_strict(outcome)
    }

    /// Sends `data` to the Luca analysis service for the given analysis
    /// `analysis_type` (e.g. `"financial_statement"`, `"invoice"`).
    #[allow(clippy::too_many_arguments)]
    pub async fn luca_analyze(
        &self,
        analysis_type: &str,
        node_type: Option<&str>,
        data: &Value,
        historical: Option<&Value>,
        expected_format: Option<&Value>,
        financial_rules: Option<&Value>,
        options: Option<&Value>,
        tenant_id: Uuid,
        request_id: Uuid,
    ) -> Result<VerificationOutcome, AiVerificationError> {
        let url = format!("{}/api/analyze", self.config.luca_url.trim_end_matches('/'));
        let body = LucaRequest { analysis_type, node_type, data, historical, expected_format, financial_rules, options };

        let response = self
            .client
            .post(&url)
            .header("X-Tenant-ID", tenant_id.to_string())
            .header("X-Request-ID", request_id.to_string())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiVerificationError::Protocol(format!("luca_analyze service responded with {}", response.status())));
        }

        let body: LucaResponse =
            response.json().await.map_err(|e| AiVerificationError::Protocol(format!("invalid response body: {e}")))?;

        let outcome = VerificationOutcome {
            suggestions: body.recommendations,
            anomalies: body.issues,
            ..VerificationOutcome::local(VerificationMode::LucaAnalyze, body.passed(), body.score.unwrap_or(body.confidence))
        };

        self.enforce_strict(outcome)
    }

    fn enforce_strict(&self, outcome: VerificationOutcome) -> Result<VerificationOutcome, AiVerificationError> {
        if self.config.strict && !outcome.passed {
            return Err(AiVerificationError::Rejected {
                mode: outcome.mode.clone(),
                reason: outcome.reason.clone().unwrap_or_else(|| "no reason given".to_string()),
            });
        }
        Ok(outcome)
    }
}
