//! Development task model.
//!
//! A task is either a plain text instruction or a structured JSON object with
//! a title/prompt and free-form fields. Stages that need structured access
//! work on a [`NormalizedTask`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of development work handed to a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Task {
    /// Plain text instruction.
    Text(String),
    /// Structured object with a title/prompt and arbitrary extra fields.
    Structured(Map<String, Value>),
}

impl Task {
    /// Build a structured task from a title and prompt.
    pub fn structured(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::String(title.into()));
        map.insert("prompt".to_string(), Value::String(prompt.into()));
        Self::Structured(map)
    }

    /// Attach a field, promoting a text task to a structured one.
    pub fn with_field(self, key: impl Into<String>, value: Value) -> Self {
        let mut map = match self {
            Self::Structured(map) => map,
            Self::Text(text) => {
                let mut map = Map::new();
                map.insert("title".to_string(), Value::String(text));
                map
            }
        };
        map.insert(key.into(), value);
        Self::Structured(map)
    }

    /// Normalize into the structured shape stages consume.
    pub fn normalize(&self) -> NormalizedTask {
        match self {
            Self::Text(text) => NormalizedTask {
                title: text.clone(),
                prompt: text.clone(),
                acceptance: Vec::new(),
                risks: Vec::new(),
                artifacts: Vec::new(),
                fields: Map::new(),
            },
            Self::Structured(map) => {
                let title = text_field(map, &["title", "name", "summary"])
                    .unwrap_or_else(|| "Task".to_string());
                let prompt =
                    text_field(map, &["prompt", "description"]).unwrap_or_else(|| title.clone());
                let acceptance = list_field(map, &["acceptance", "acceptanceCriteria", "done"]);
                let risks = list_field(map, &["risks"]);
                let artifacts = list_field(map, &["artifacts"]);

                let fields = map
                    .iter()
                    .filter(|(key, _)| {
                        !matches!(
                            key.as_str(),
                            "title" | "prompt" | "acceptance" | "risks" | "artifacts"
                        )
                    })
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();

                NormalizedTask {
                    title,
                    prompt,
                    acceptance,
                    risks,
                    artifacts,
                    fields,
                }
            }
        }
    }

    /// The prompt text a production action should act on.
    pub fn prompt(&self) -> String {
        self.normalize().prompt
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Task {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Task {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Task {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => Self::Structured(map),
            Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Task in its canonical structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTask {
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub acceptance: Vec<Value>,
    #[serde(default)]
    pub risks: Vec<Value>,
    #[serde(default)]
    pub artifacts: Vec<Value>,
    /// Every other field of the original task, untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    })
}

fn list_field(map: &Map<String, Value>, keys: &[&str]) -> Vec<Value> {
    keys.iter()
        .find_map(|key| match map.get(*key) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items.clone()),
            Some(other) => Some(vec![other.clone()]),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_task_normalizes_to_title_and_prompt() {
        let task = Task::from("fix the login bug");
        let normalized = task.normalize();
        assert_eq!(normalized.title, "fix the login bug");
        assert_eq!(normalized.prompt, "fix the login bug");
        assert!(normalized.acceptance.is_empty());
    }

    #[test]
    fn test_structured_task_uses_fallback_keys() {
        let task = Task::from(json!({
            "name": "Add export",
            "description": "Export reports as CSV",
            "acceptanceCriteria": ["csv has header"],
            "ticket": "DEV-12"
        }));
        let normalized = task.normalize();
        assert_eq!(normalized.title, "Add export");
        assert_eq!(normalized.prompt, "Export reports as CSV");
        assert_eq!(normalized.acceptance, vec![json!("csv has header")]);
        assert_eq!(normalized.fields.get("ticket"), Some(&json!("DEV-12")));
    }

    #[test]
    fn test_structured_task_without_title_defaults() {
        let normalized = Task::from(json!({"priority": 1})).normalize();
        assert_eq!(normalized.title, "Task");
        assert_eq!(normalized.prompt, "Task");
    }

    #[test]
    fn test_scalar_value_becomes_text() {
        assert_eq!(Task::from(json!(42)), Task::Text("42".to_string()));
    }

    #[test]
    fn test_with_field_promotes_text() {
        let task = Task::from("diagnose").with_field("repro", json!("steps"));
        let normalized = task.normalize();
        assert_eq!(normalized.title, "diagnose");
        assert_eq!(normalized.fields.get("repro"), Some(&json!("steps")));
    }
}
