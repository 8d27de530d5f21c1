//! Data-shaping node types: `transform`, `filter`, `aggregate`, `set_variable`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::builtin::common::{expr_context, require_str};
use crate::registry::NodeCategory;
use crate::traits::ExecutionContext;
use crate::{expr, NodeError, NodeHandler};

/// Produces a new JSON object by evaluating a map of field -> expression.
pub struct TransformNode;

#[async_trait]
impl NodeHandler for TransformNode {
    fn node_type(&self) -> &'static str {
        "transform"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Data
    }

    fn description(&self) -> &'static str {
        "maps input fields to a new shape via per-field expressions"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        let mappings = config.get("mappings").and_then(Value::as_object)
            .ok_or_else(|| NodeError::Fatal("transform requires a `mappings` object".into()))?;
        for expression in mappings.values() {
            let expression = expression.as_str()
                .ok_or_else(|| NodeError::Fatal("transform mapping values must be expression strings".into()))?;
            expr::validate(expression).map_err(NodeError::from)?;
        }
        Ok(())
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let mappings = config.get("mappings").and_then(Value::as_object)
            .ok_or_else(|| NodeError::Fatal("transform requires a `mappings` object".into()))?;
        let expr_ctx = expr_context(&inputs, ctx);

        let mut out = serde_json::Map::with_capacity(mappings.len());
        for (field, expression) in mappings {
            let expression = expression.as_str()
                .ok_or_else(|| NodeError::Fatal("transform mapping values must be expression strings".into()))?;
            let value = expr::evaluate(expression, &expr_ctx)?;
            out.insert(field.clone(), value);
        }
        Ok(Value::Object(out))
    }
}

/// Keeps array elements for which a predicate expression is truthy. Each
/// element is bound as `$variables.input.item` during evaluation.
pub struct FilterNode;

#[async_trait]
impl NodeHandler for FilterNode {
    fn node_type(&self) -> &'static str {
        "filter"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Data
    }

    fn description(&self) -> &'static str {
        "keeps array elements matching a predicate expression"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        expr::validate(require_str(config, "expression")?).map_err(NodeError::from)
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let expression = require_str(config, "expression")?;
        let items = inputs.as_array()
            .ok_or_else(|| NodeError::Fatal("filter requires an array input".into()))?
            .clone();

        let mut kept = Vec::new();
        for item in items {
            let mut expr_ctx = expr_context(&json!({"item": item}), ctx);
            expr_ctx.variables.insert("item".to_string(), item.clone());
            let result = expr::evaluate(expression, &expr_ctx)?;
            if !matches!(result, Value::Null | Value::Bool(false)) {
                kept.push(item);
            }
        }
        Ok(Value::Array(kept))
    }
}

/// Reduces an array input to a single numeric value.
pub struct AggregateNode;

#[async_trait]
impl NodeHandler for AggregateNode {
    fn node_type(&self) -> &'static str {
        "aggregate"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Data
    }

    fn description(&self) -> &'static str {
        "reduces an array input to a single sum, average, min, max, or count"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        let op = require_str(config, "operation")?;
        match op {
            "sum" | "avg" | "min" | "max" | "count" => Ok(()),
            other => Err(NodeError::Fatal(format!("unknown aggregate operation `{other}`"))),
        }
    }

    async fn execute(&self, inputs: Value, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let operation = require_str(config, "operation")?;
        let field = config.get("field").and_then(Value::as_str);
        let items = inputs.as_array()
            .ok_or_else(|| NodeError::Fatal("aggregate requires an array input".into()))?;

        if operation == "count" {
            return Ok(json!({ "result": items.len() }));
        }

        let numbers: Vec<f64> = items
            .iter()
            .map(|item| {
                let value = match field {
                    Some(f) => item.get(f).cloned().unwrap_or(Value::Null),
                    None => item.clone(),
                };
                value.as_f64().ok_or_else(|| NodeError::Fatal(format!("non-numeric element in aggregate input: {value}")))
            })
            .collect::<Result<_, _>>()?;

        let result = match operation {
            "sum" => numbers.iter().sum::<f64>(),
            "avg" => {
                if numbers.is_empty() {
                    return Err(NodeError::Fatal("cannot average an empty array".into()));
                }
                numbers.iter().sum::<f64>() / numbers.len() as f64
            }
            "min" => numbers.iter().cloned().fold(f64::INFINITY, f64::min),
            "max" => numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            _ => unreachable!("validated above"),
        };

        Ok(json!({ "result": result }))
    }
}

/// Evaluates an expression and surfaces it for the engine to fold into the
/// execution's workflow-scoped variables for later nodes.
pub struct SetVariableNode;

#[async_trait]
impl NodeHandler for SetVariableNode {
    fn node_type(&self) -> &'static str {
        "set_variable"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Data
    }

    fn description(&self) -> &'static str {
        "assigns an expression's result to a named workflow variable"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        require_str(config, "name")?;
        expr::validate(require_str(config, "expression")?).map_err(NodeError::from)
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let name = require_str(config, "name")?;
        let expression = require_str(config, "expression")?;
        let value = expr::evaluate(expression, &expr_context(&inputs, ctx))?;
        Ok(json!({ "variable": name, "value": value }))
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
    async fn transform_evaluates_each_mapping() {
        let node = TransformNode;
        let out = node
            .execute(
                json!({"amount": 200, "rate": 0.18}),
                &json!({"mappings": {"tax": "$variables.input.amount * $variables.input.rate"}}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["tax"], json!(36.0));
    }

    #[tokio::test]
    async fn filter_keeps_matching_items() {
        let node = FilterNode;
        let out = node
            .execute(json!([1, 5, 10, 2]), &json!({"expression": "$variables.item > 3"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out, json!([5, 10]));
    }

    #[tokio::test]
    async fn aggregate_sum_over_field() {
        let node = AggregateNode;
        let out = node
            .execute(
                json!([{"amount": 10}, {"amount": 15}]),
                &json!({"operation": "sum", "field": "amount"}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["result"], json!(25.0));
    }

    #[tokio::test]
    async fn aggregate_rejects_unknown_operation_at_validation() {
        let node = AggregateNode;
        assert!(node.validate(&json!({"operation": "median"})).is_err());
    }

    #[tokio::test]
    async fn set_variable_surfaces_name_and_value() {
        let node = SetVariableNode;
        let out = node
            .execute(json!({}), &json!({"name": "threshold", "expression": "10 + 5"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out, json!({"variable": "threshold", "value": 15.0}));
    }
}
