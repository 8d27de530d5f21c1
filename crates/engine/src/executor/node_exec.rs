//! Single-node execution: timeout race, optional AI verification gate, and
//! retry with exponential back-off.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use nodes::verifier::{anomaly_detect_local, format_validate_local, threshold_check_local, AnomalyDetectConfig, ThresholdRange};
use nodes::{ExecutionContext, NodeError, NodeHandler};

use crate::models::RetryPolicy;
use crate::EngineError;

/// Outcome of running one node to completion (after retries).
pub struct NodeOutcome {
    pub output: Value,
    pub attempts: u32,
    pub duration_ms: i64,
}

/// A node's `aiVerification` config. Only the three locally-computable
/// modes (`anomaly_detect`, `format_validate`, `threshold_check`) are
/// available through this generic post-execution gate — `vamn_verify` and
/// `luca_analyze` require a network round-trip and tenant/request
/// correlation, so those are exposed only through the dedicated
/// `ai_vamn_verify`/`ai_luca_analyze` node types.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum VerifyConfig {
    AnomalyDetect {
        #[serde(default, rename = "strictMode")]
        strict_mode: bool,
        #[serde(flatten)]
        config: AnomalyDetectConfig,
    },
    FormatValidate {
        #[serde(default, rename = "strictMode")]
        strict_mode: bool,
        #[serde(default, rename = "requiredFields")]
        required_fields: Vec<(String, String)>,
    },
    ThresholdCheck {
        #[serde(default, rename = "strictMode")]
        strict_mode: bool,
        #[serde(default)]
        thresholds: HashMap<String, ThresholdRange>,
    },
}

impl VerifyConfig {
    fn strict_mode(&self) -> bool {
        match self {
            Self::AnomalyDetect { strict_mode, .. } => *strict_mode,
            Self::FormatValidate { strict_mode, .. } => *strict_mode,
            Self::ThresholdCheck { strict_mode, .. } => *strict_mode,
        }
    }
}

fn verify_output(node_id: &str, ai_verification: Option<&Value>, output: &Value) -> Result<(), EngineError> {
    let Some(raw) = ai_verification else { return Ok(()) };
    let Ok(cfg) = serde_json::from_value::<VerifyConfig>(raw.clone()) else {
        warn!(node_id, "node has unparseable aiVerification config; skipping");
        return Ok(());
    };

    let outcome = match &cfg {
        VerifyConfig::AnomalyDetect { config, .. } => anomaly_detect_local(output, config),
        VerifyConfig::FormatValidate { required_fields, .. } => format_validate_local(output, required_fields),
        VerifyConfig::ThresholdCheck { thresholds, .. } => threshold_check_local(output, thresholds),
    };

    if !outcome.passed && cfg.strict_mode() {
        return Err(EngineError::VerificationRejected {
            node_id: node_id.to_string(),
            message: outcome.reason.unwrap_or_else(|| "verification failed".to_string()),
        });
    }

    Ok(())
}

/// Execute `handler` against `inputs`, retrying `NodeError::Retryable`
/// failures per `policy`, racing each attempt against `timeout`, and
/// applying `ai_verification` (if any) to the final output.
///
/// `cancel` is polled between attempts; a cancellation mid-flight surfaces
/// as [`EngineError::Cancelled`] (caller supplies the execution ID).
#[allow(clippy::too_many_arguments)]
pub async fn execute_node_with_retry(
    handler: &dyn NodeHandler,
    node_id: &str,
    inputs: Value,
    config: &Value,
    ai_verification: Option<&Value>,
    ctx: &ExecutionContext,
    policy: &RetryPolicy,
    timeout: Duration,
    cancel: &mut watch::Receiver<bool>,
) -> Result<NodeOutcome, EngineError> {
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if *cancel.borrow() {
            return Err(EngineError::Cancelled(ctx.execution_id));
        }

        let result = tokio::time::timeout(timeout, handler.execute(inputs.clone(), config, ctx)).await;

        match result {
            Err(_elapsed) => {
                return Err(EngineError::NodeTimeout { node_id: node_id.to_string(), timeout_ms: timeout.as_millis() as u64 });
            }
            Ok(Ok(output)) => {
                verify_output(node_id, ai_verification, &output)?;
                return Ok(NodeOutcome { output, attempts: attempt, duration_ms: started.elapsed().as_millis() as i64 });
            }
            Ok(Err(NodeError::Fatal(message))) => {
                return Err(EngineError::NodeFatal { node_id: node_id.to_string(), message });
            }
            Ok(Err(NodeError::Retryable(message))) => {
                if attempt > policy.max_retries {
                    return Err(EngineError::NodeRetryExhausted { node_id: node_id.to_string(), message });
                }

                let delay_ms = (policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(attempt as i32 - 1))
                    .min(policy.max_delay_ms as f64) as u64;
                warn!(node_id, attempt, delay_ms, "node failed retryably, backing off: {message}");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::mock::MockHandler;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            workflow_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            input: Value::Null,
            secrets: Default::default(),
            variables: Default::default(),
            node_outputs: Default::default(),
            db_pool: None,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let handler = MockHandler::returning("n1", json!({"ok": true}));
        let (_tx, mut cancel) = watch::channel(false);
        let policy = RetryPolicy::default();

        let outcome = execute_node_with_retry(
            &handler,
            "n1",
            Value::Null,
            &Value::Null,
            None,
            &ctx(),
            &policy,
            Duration::from_secs(1),
            &mut cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.output["ok"], json!(true));
    }

    #[tokio::test]
    async fn fatal_error_never_retries() {
        let handler = MockHandler::failing_fatal("n1", "nope");
        let (_tx, mut cancel) = watch::channel(false);
        let policy = RetryPolicy::default();

        let err = execute_node_with_retry(
            &handler,
            "n1",
            Value::Null,
            &Value::Null,
            None,
            &ctx(),
            &policy,
            Duration::from_secs(1),
            &mut cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::NodeFatal { .. }));
        assert_eq!(handler.call_count(), 1);
    }

    #[tokio::test]
    async fn retryable_error_exhausts_after_max_retries() {
        let handler = MockHandler::failing_retryable("n1", "flaky");
        let (_tx, mut cancel) = watch::channel(false);
        let policy = RetryPolicy { max_retries: 2, initial_delay_ms: 1, backoff_multiplier: 1.0, max_delay_ms: 10 };

        let err = execute_node_with_retry(
            &handler,
            "n1",
            Value::Null,
            &Value::Null,
            None,
            &ctx(),
            &policy,
            Duration::from_secs(1),
            &mut cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::NodeRetryExhausted { .. }));
        assert_eq!(handler.call_count(), 3);
    }

    #[tokio::test]
    async fn strict_verification_failure_rejects_successful_output() {
        let handler = MockHandler::returning("n1", json!({"total": 5000}));
        let (_tx, mut cancel) = watch::channel(false);
        let policy = RetryPolicy::default();
        let ai_verification = json!({
            "type": "threshold_check",
            "strictMode": true,
            "thresholds": {"total": {"max": 1000}},
        });

        let err = execute_node_with_retry(
            &handler,
            "n1",
            Value::Null,
            &Value::Null,
            Some(&ai_verification),
            &ctx(),
            &policy,
            Duration::from_secs(1),
            &mut cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::VerificationRejected { .. }));
    }

    #[tokio::test]
    async fn non_strict_verification_failure_lets_output_through() {
        let handler = MockHandler::returning("n1", json!({"total": 5000}));
        let (_tx, mut cancel) = watch::channel(false);
        let policy = RetryPolicy::default();
        let ai_verification = json!({
            "type": "threshold_check",
            "thresholds": {"total": {"max": 1000}},
        });

        let outcome = execute_node_with_retry(
            &handler,
            "n1",
            Value::Null,
            &Value::Null,
            Some(&ai_verification),
            &ctx(),
            &policy,
            Duration::from_secs(1),
            &mut cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome.output["total"], json!(5000));
    }
}
