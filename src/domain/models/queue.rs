use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A work item received from the external queue, in canonical form.
///
/// `raw` is kept so acknowledgements can hand the original item back to
/// the queue untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    pub domain: String,
    pub payload: Value,
    pub raw: Value,
}

impl QueueItem {
    /// Normalize an arbitrary queue item.
    ///
    /// Objects take `id`, `type` (default `"unknown"`), `domain` (default
    /// `"backend"`) and `payload` (default: the whole item). Anything else
    /// becomes an unknown item whose payload is the value itself.
    pub fn normalize(raw: Value) -> Self {
        let Value::Object(map) = &raw else {
            return Self {
                id: None,
                kind: "unknown".to_string(),
                domain: "backend".to_string(),
                payload: raw.clone(),
                raw,
            };
        };

        let text = |key: &str, default: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        Self {
            id: map.get("id").filter(|id| !id.is_null()).cloned(),
            kind: text("type", "unknown"),
            domain: text("domain", "backend"),
            payload: map
                .get("payload")
                .filter(|payload| !payload.is_null())
                .cloned()
                .unwrap_or_else(|| raw.clone()),
            raw: raw.clone(),
        }
    }

    /// Identity used in logs: the id when present, else the type.
    pub fn identity(&self) -> String {
        match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => format!("<{}>", self.kind),
        }
    }

    /// `payload.task` when it is a string.
    pub fn task_text(&self) -> Option<&str> {
        self.payload.get("task").and_then(Value::as_str)
    }
}
