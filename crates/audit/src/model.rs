//! The audit entry shape and the sensitive-key sanitizer.
//!
//! These are *persistence-adjacent* models — they carry just enough
//! structure to be chain-hashed and queried. Domain types live in `engine`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Keys whose value is replaced with `***REDACTED***` before persistence,
/// matched case-insensitively as a substring of the key name.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "apikey",
    "authorization",
    "credit_card",
    "ssn",
    "pan",
    "cvv",
    "pin",
];

const REDACTED: &str = "***REDACTED***";

/// Recursively walk `value`, replacing the value of any object key whose
/// lowercased form contains one of [`SENSITIVE_KEYS`] with [`REDACTED`].
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let lower = k.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    out.insert(k.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(k.clone(), sanitize(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

/// A fields caller supplies when logging a new event. Timestamp and hash
/// chain fields are computed by [`crate::logger::AuditLogger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub execution_id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub tenant_id: Option<String>,
    pub event: String,
    pub node_id: Option<String>,
    pub node_name: Option<String>,
    pub node_type: Option<String>,
    pub duration_ms: Option<i64>,
    pub data: Option<Value>,
    pub actor_id: Option<String>,
    pub ip_address: Option<String>,
}

impl NewAuditEntry {
    /// Build a minimal entry for `execution_id` / `event`; everything else
    /// defaults to `None`.
    pub fn new(execution_id: Uuid, event: impl Into<String>) -> Self {
        Self {
            execution_id,
            workflow_id: None,
            tenant_id: None,
            event: event.into(),
            node_id: None,
            node_name: None,
            node_type: None,
            duration_ms: None,
            data: None,
            actor_id: None,
            ip_address: None,
        }
    }

    pub fn with_workflow(mut self, workflow_id: Uuid) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_node(mut self, id: impl Into<String>, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self.node_name = Some(name.into());
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_duration_ms(mut self, ms: i64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Whether this event forces an immediate flush (§4.5: events whose
    /// name contains "failed" or "error").
    pub fn forces_flush(&self) -> bool {
        self.event.contains("failed") || self.event.contains("error")
    }
}

/// An immutable, chain-hashed audit record as persisted in `audit_log`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub execution_id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub tenant_id: Option<String>,
    pub event: String,
    pub node_id: Option<String>,
    pub node_name: Option<String>,
    pub node_type: Option<String>,
    pub duration_ms: Option<i64>,
    pub sanitized_data: Option<Value>,
    pub actor_id: Option<String>,
    pub ip_address: Option<String>,
    pub previous_hash: String,
    pub hash: String,
}

/// Filter + pagination for [`crate::sink::AuditSink::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub execution_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub tenant_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub event: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitizes_top_level_sensitive_key() {
        let v = json!({"password": "hunter2", "name": "alice"});
        let out = sanitize(&v);
        assert_eq!(out["password"], json!(REDACTED));
        assert_eq!(out["name"], json!("alice"));
    }

    #[test]
    fn sanitizes_nested_and_array_values() {
        let v = json!({
            "payload": {"api_key": "xyz", "nested": {"CREDIT_CARD": "4111"}},
            "items": [{"ssn": "123-45-6789"}, {"ok": 1}],
        });
        let out = sanitize(&v);
        assert_eq!(out["payload"]["api_key"], json!(REDACTED));
        assert_eq!(out["payload"]["nested"]["CREDIT_CARD"], json!(REDACTED));
        assert_eq!(out["items"][0]["ssn"], json!(REDACTED));
        assert_eq!(out["items"][1]["ok"], json!(1));
    }

    #[test]
    fn leaves_non_sensitive_data_untouched() {
        let v = json!({"total": 42, "currency": "USD"});
        assert_eq!(sanitize(&v), v);
    }
}
