//! Control-flow node types: `condition`, `loop`, `merge`, `delay`, `human_approval`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::builtin::common::{expr_context, require_str, str_or};
use crate::registry::NodeCategory;
use crate::traits::ExecutionContext;
use crate::{expr, NodeError, NodeHandler};

/// Evaluates a boolean expression and returns `{ "matched": bool }` for the
/// engine's edge router to branch on.
pub struct ConditionNode;

#[async_trait]
impl NodeHandler for ConditionNode {
    fn node_type(&self) -> &'static str {
        "condition"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Control
    }

    fn description(&self) -> &'static str {
        "branches the workflow based on a boolean expression"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        let expression = require_str(config, "expression")?;
        expr::validate(expression).map_err(NodeError::from)
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let expression = require_str(config, "expression")?;
        let result = expr::evaluate(expression, &expr_context(&inputs, ctx))?;
        let matched = !matches!(result, Value::Null | Value::Bool(false));
        Ok(json!({ "matched": matched, "input": inputs }))
    }
}

/// Evaluates an array-valued expression; downstream fan-out over the result
/// is the engine's responsibility, this handler only resolves the items.
pub struct LoopNode;

#[async_trait]
impl NodeHandler for LoopNode {
    fn node_type(&self) -> &'static str {
        "loop"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Control
    }

    fn description(&self) -> &'static str {
        "resolves an array expression for downstream iteration"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        let expression = require_str(config, "items_expression")?;
        expr::validate(expression).map_err(NodeError::from)
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let expression = require_str(config, "items_expression")?;
        let items = expr::evaluate(expression, &expr_context(&inputs, ctx))?;
        let items = match items {
            Value::Array(items) => items,
            other => return Err(NodeError::Fatal(format!("loop items_expression did not resolve to an array: {other}"))),
        };

        let max_iterations = config.get("max_iterations").and_then(Value::as_u64).unwrap_or(1000) as usize;
        if items.len() > max_iterations {
            return Err(NodeError::Fatal(format!(
                "loop produced {} items, exceeding max_iterations {max_iterations}",
                items.len()
            )));
        }

        Ok(json!({ "items": items, "count": items.len() }))
    }
}

/// Combines multiple upstream branches. The engine collects sibling inputs
/// into a JSON array before invoking this handler.
pub struct MergeNode;

#[async_trait]
impl NodeHandler for MergeNode {
    fn node_type(&self) -> &'static str {
        "merge"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Control
    }

    fn description(&self) -> &'static str {
        "combines multiple upstream branch outputs into one value"
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let strategy = str_or(config, "strategy", "concat");
        let branches = match inputs {
            Value::Array(items) => items,
            other => vec![other],
        };

        let merged = match strategy {
            "concat" => Value::Array(branches),
            "first" => branches.into_iter().next().unwrap_or(Value::Null),
            "last" => branches.into_iter().last().unwrap_or(Value::Null),
            "combine_object" => {
                let mut map = serde_json::Map::new();
                for branch in branches {
                    if let Value::Object(obj) = branch {
                        map.extend(obj);
                    }
                }
                Value::Object(map)
            }
            other => return Err(NodeError::Fatal(format!("unknown merge strategy `{other}`"))),
        };

        Ok(merged)
    }
}

/// Pauses execution for a fixed duration before passing its input through
/// unchanged.
pub struct DelayNode;

#[async_trait]
impl NodeHandler for DelayNode {
    fn node_type(&self) -> &'static str {
        "delay"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Control
    }

    fn description(&self) -> &'static str {
        "waits for a fixed duration before continuing"
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let duration_ms = config.get("duration_ms").and_then(Value::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        Ok(inputs)
    }
}

/// Marks a point in the workflow that requires human sign-off.
///
/// The engine intercepts this node type before dispatch: it creates a
/// `PendingApproval` row and suspends the execution rather than calling
/// `execute`. This handler only exists so the type is registered (for
/// config validation and the node catalog) and so direct unit tests that
/// bypass the suspension path still get well-defined pass-through behaviour.
pub struct HumanApprovalNode;

#[async_trait]
impl NodeHandler for HumanApprovalNode {
    fn node_type(&self) -> &'static str {
        "human_approval"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Control
    }

    fn description(&self) -> &'static str {
        "suspends the execution until a human approves or rejects it"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        require_str(config, "message").map(|_| ())
    }

    async fn execute(&self, inputs: Value, _config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        Ok(inputs)
    }
}

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
    async fn condition_reports_match_when_truthy() {
        let node = ConditionNode;
        let out = node
            .execute(json!({"amount": 100}), &json!({"expression": "$variables.input.amount > 50"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["matched"], json!(true));
    }

    #[tokio::test]
    async fn condition_reports_no_match_when_falsy() {
        let node = ConditionNode;
        let out = node
            .execute(json!({"amount": 10}), &json!({"expression": "$variables.input.amount > 50"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["matched"], json!(false));
    }

    #[tokio::test]
    async fn merge_combine_object_unions_fields() {
        let node = MergeNode;
        let out = node
            .execute(
                json!([{"a": 1}, {"b": 2}]),
                &json!({"strategy": "combine_object"}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn loop_rejects_non_array_expression_result() {
        let node = LoopNode;
        let err = node
            .execute(json!({}), &json!({"items_expression": "1"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Fatal(_)));
    }

    #[tokio::test]
    async fn delay_passes_input_through() {
        let node = DelayNode;
        let out = node.execute(json!({"x": 1}), &json!({"duration_ms": 1}), &ctx()).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }
}
