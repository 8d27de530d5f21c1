//! Shared helpers used across built-in node implementations.

use serde_json::Value;

use crate::expr::ExpressionContext;
use crate::traits::ExecutionContext;
use crate::NodeError;

/// Builds the [`ExpressionContext`] a built-in node evaluates its configured
/// expressions against: workflow variables plus the node's own incoming
/// `inputs` (reachable as `$variables.input.*`) and every upstream node's
/// recorded output.
///
/// Process environment variables are deliberately NOT exposed here — `$env`
/// resolves to nothing unless a caller populates it explicitly, since
/// workflow definitions are admin-authored and should not get ambient
/// access to the host's environment.
pub fn expr_context(inputs: &Value, ctx: &ExecutionContext) -> ExpressionContext {
    let mut variables = ctx.variables.clone();
    variables.insert("input".to_string(), inputs.clone());
    ExpressionContext {
        variables,
        node_outputs: ctx.node_outputs.clone(),
        env: std::collections::HashMap::new(),
    }
}

/// Reads a required string field out of a node's config object.
pub fn require_str<'a>(config: &'a Value, field: &str) -> Result<&'a str, NodeError> {
    config
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::Fatal(format!("missing required config field `{field}`")))
}

/// Reads an optional string field, returning `default` when absent.
pub fn str_or<'a>(config: &'a Value, field: &str, default: &'a str) -> &'a str {
    config.get(field).and_then(Value::as_str).unwrap_or(default)
}
