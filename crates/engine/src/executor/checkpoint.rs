//! Checkpoint shape persisted to `workflow_executions.checkpoint`, letting
//! an execution resume after a human-approval suspension or a process
//! restart without re-running already-completed nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Node IDs that have already produced a terminal (success) result.
    pub completed: Vec<String>,
    /// Node IDs that failed but were routed down a `$error` edge, kept
    /// separate from `completed` so resume logic doesn't re-dispatch them.
    pub failed_handled: Vec<String>,
    pub node_outputs: HashMap<String, Value>,
    pub variables: HashMap<String, Value>,
}

impl Checkpoint {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("Checkpoint always serializes")
    }

    pub fn from_json(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_json() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.completed.push("a".to_string());
        checkpoint.node_outputs.insert("a".to_string(), json!({"x": 1}));

        let restored = Checkpoint::from_json(&checkpoint.to_json());
        assert_eq!(restored.completed, vec!["a".to_string()]);
        assert_eq!(restored.node_outputs["a"], json!({"x": 1}));
    }

    #[test]
    fn missing_or_malformed_json_yields_empty_checkpoint() {
        let restored = Checkpoint::from_json(&Value::Null);
        assert!(restored.completed.is_empty());
    }
}
