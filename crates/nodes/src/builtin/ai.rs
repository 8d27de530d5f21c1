//! AI node types: three wrap the verifier's VAMN/Luca/anomaly-detect modes
//! as first-class workflow steps; the remaining four (`ai_classify`,
//! `ai_extract`, `ai_predict`, `ai_query`) are generic AI-service calls that
//! post to a configured service URL and return its response verbatim —
//! no specific classification/extraction/prediction/query service is in
//! scope, so these are thin, documented passthroughs.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::builtin::common::require_str;
use crate::registry::NodeCategory;
use crate::traits::ExecutionContext;
use crate::verifier::{AiVerifier, AnomalyDetectConfig, VerifierConfig};
use crate::{NodeError, NodeHandler};

fn verifier_from_config(config: &Value) -> Result<AiVerifier, NodeError> {
    let vamn_url = require_str(config, "vamn_url").unwrap_or("").to_string();
    let luca_url = require_str(config, "luca_url").unwrap_or("").to_string();
    let strict = config.get("strict").and_then(Value::as_bool).unwrap_or(true);
    Ok(AiVerifier::new(VerifierConfig { vamn_url, luca_url, strict }))
}

fn outcome_to_value(outcome: crate::verifier::VerificationOutcome) -> Value {
    json!({
        "mode": outcome.mode,
        "passed": outcome.passed,
        "confidence": outcome.confidence,
        "reason": outcome.reason,
        "suggestions": outcome.suggestions,
        "anomalies": outcome.anomalies,
        "model": outcome.model,
        "processingTimeMs": outcome.processing_time_ms,
    })
}

fn map_verification_error(err: crate::verifier::AiVerificationError) -> NodeError {
    use crate::verifier::AiVerificationError::*;
    match err {
        Transport(e) => NodeError::Retryable(format!("verification service unreachable: {e}")),
        Protocol(msg) => NodeError::Retryable(msg),
        Rejected { mode, reason } => NodeError::Fatal(format!("{mode} rejected the payload: {reason}")),
    }
}

pub struct AiVamnVerifyNode;

#[async_trait]
impl NodeHandler for AiVamnVerifyNode {
    fn node_type(&self) -> &'static str {
        "ai_vamn_verify"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Ai
    }

    fn description(&self) -> &'static str {
        "verifies node output against the VAMN verification service"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        require_str(config, "vamn_url").map(|_| ())
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let verifier = verifier_from_config(config)?;
        let node_type = config.get("node_type").and_then(Value::as_str).unwrap_or(self.node_type());
        let outcome = verifier
            .vamn_verify(
                node_type,
                &inputs,
                &inputs,
                config.get("rules"),
                config.get("context"),
                config.get("options"),
                ctx.tenant_id,
                ctx.execution_id,
            )
            .await
            .map_err(map_verification_error)?;
        Ok(outcome_to_value(outcome))
    }
}

pub struct AiLucaAnalyzeNode;

#[async_trait]
impl NodeHandler for AiLucaAnalyzeNode {
    fn node_type(&self) -> &'static str {
        "ai_luca_analyze"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Ai
    }

    fn description(&self) -> &'static str {
        "analyzes node output via the Luca analysis service"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        require_str(config, "luca_url").map(|_| ())
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let verifier = verifier_from_config(config)?;
        let analysis_type = config.get("analysis_type").and_then(Value::as_str).unwrap_or("general");
        let node_type = config.get("node_type").and_then(Value::as_str);
        let outcome = verifier
            .luca_analyze(
                analysis_type,
                node_type,
                &inputs,
                config.get("historical"),
                config.get("expected_format"),
                config.get("financial_rules"),
                config.get("options"),
                ctx.tenant_id,
                ctx.execution_id,
            )
            .await
            .map_err(map_verification_error)?;
        Ok(outcome_to_value(outcome))
    }
}

pub struct AiAnomalyDetectNode;

#[async_trait]
impl NodeHandler for AiAnomalyDetectNode {
    fn node_type(&self) -> &'static str {
        "ai_anomaly_detect"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Ai
    }

    fn description(&self) -> &'static str {
        "flags statistical outliers against a configured baseline"
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let detect_config: AnomalyDetectConfig = serde_json::from_value(config.clone())
            .map_err(|e| NodeError::Fatal(format!("invalid anomaly_detect config: {e}")))?;

        let outcome = crate::verifier::anomaly_detect_local(&inputs, &detect_config);
        let strict = config.get("strict").and_then(Value::as_bool).unwrap_or(false);
        if strict && !outcome.passed {
            return Err(NodeError::Fatal(outcome.reason.clone().unwrap_or_else(|| "anomaly detected".to_string())));
        }
        Ok(outcome_to_value(outcome))
    }
}

macro_rules! generic_ai_node {
    ($struct_name:ident, $node_type:literal, $description:literal) => {
        pub struct $struct_name {
            client: reqwest::Client,
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self { client: reqwest::Client::new() }
            }
        }

        impl Default for $struct_name {
            fn default() -> Self {
                Self::new()
            }
        }

        #[async_trait]
        impl NodeHandler for $struct_name {
            fn node_type(&self) -> &'static str {
                $node_type
            }

            fn category(&self) -> NodeCategory {
                NodeCategory::Ai
            }

            fn description(&self) -> &'static str {
                $description
            }

            fn validate(&self, config: &Value) -> Result<(), NodeError> {
                require_str(config, "service_url").map(|_| ())
            }

            async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
                let url = require_str(config, "service_url")?;
                let response = self
                    .client
                    .post(url)
                    .header("X-Tenant-ID", ctx.tenant_id.to_string())
                    .header("X-Request-ID", ctx.execution_id.to_string())
                    .json(&inputs)
                    .send()
                    .await
                    .map_err(|e| NodeError::Retryable(format!("{} request failed: {e}", $node_type)))?;

                if !response.status().is_success() {
                    return Err(NodeError::Retryable(format!("{} service returned {}", $node_type, response.status())));
                }

                response.json::<Value>().await
                    .map_err(|e| NodeError::Retryable(format!("invalid response from {}: {e}", $node_type)))
            }
        }
    };
}

generic_ai_node!(AiClassifyNode, "ai_classify", "classifies node output via a configured AI service");
generic_ai_node!(AiExtractNode, "ai_extract", "extracts structured fields via a configured AI service");
generic_ai_node!(AiPredictNode, "ai_predict", "produces a prediction via a configured AI service");
generic_ai_node!(AiQueryNode, "ai_query", "answers a natural-language query via a configured AI service");

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            workflow_id: Uuid::nil(),
            execution_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            input: Value::Null,
            secrets: Default::default(),
            variables: Default::default(),
            node_outputs: Default::default(),
            db_pool: None,
        }
    }

    #[tokio::test]
    async fn anomaly_detect_node_passes_non_strict_by_default() {
        let node = AiAnomalyDetectNode;
        let out = node
            .execute(json!({"amount": -5}), &json!({"nonNegativeFields": ["amount"]}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["passed"], json!(false));
    }

    #[tokio::test]
    async fn anomaly_detect_node_fails_fatally_in_strict_mode() {
        let node = AiAnomalyDetectNode;
        let err = node
            .execute(json!({"amount": -5}), &json!({"nonNegativeFields": ["amount"], "strict": true}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Fatal(_)));
    }
}
