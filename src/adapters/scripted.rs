//! In-process judge with canned answers.
//!
//! Answers are matched by prompt substring, in registration order; unmatched
//! prompts get the fallback. Every call is recorded, which makes the judge
//! usable both for dry runs and as a test double.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::Judge;

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeCall {
    pub prompt: String,
    pub context: Value,
}

struct Rule {
    needle: String,
    answers: VecDeque<Value>,
    /// Reused once `answers` runs dry.
    last: Value,
}

pub struct ScriptedJudge {
    rules: Mutex<Vec<Rule>>,
    fallback: Option<Value>,
    calls: Mutex<Vec<JudgeCall>>,
}

impl Default for ScriptedJudge {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedJudge {
    /// A judge that answers every unmatched prompt with its own text.
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, answer: Value) -> Self {
        self.fallback = Some(answer);
        self
    }

    /// Answer prompts containing `needle` with `answer`.
    pub fn on(self, needle: impl Into<String>, answer: Value) -> Self {
        self.on_sequence(needle, vec![answer])
    }

    /// Answer successive matching prompts from `answers`; the last one repeats.
    pub fn on_sequence(self, needle: impl Into<String>, answers: Vec<Value>) -> Self {
        let last = answers.last().cloned().unwrap_or(Value::Null);
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                needle: needle.into(),
                answers: answers.into(),
                last,
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<JudgeCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Prompts of every recorded call, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.prompt).collect()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, prompt: &str, context: Value) -> DomainResult<Value> {
        self.calls
            .lock()
            .map_err(|_| DomainError::Judge("call log poisoned".into()))?
            .push(JudgeCall {
                prompt: prompt.to_string(),
                context,
            });

        let mut rules = self
            .rules
            .lock()
            .map_err(|_| DomainError::Judge("rules poisoned".into()))?;
        if let Some(rule) = rules.iter_mut().find(|rule| prompt.contains(&rule.needle)) {
            return Ok(rule.answers.pop_front().unwrap_or_else(|| rule.last.clone()));
        }

        Ok(self
            .fallback
            .clone()
            .unwrap_or_else(|| Value::String(prompt.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sequence_then_repeat() {
        let judge = ScriptedJudge::new().on_sequence("Score", vec![json!(0.1), json!(0.5)]);
        assert_eq!(judge.judge("Score it", Value::Null).await.unwrap(), json!(0.1));
        assert_eq!(judge.judge("Score it", Value::Null).await.unwrap(), json!(0.5));
        assert_eq!(judge.judge("Score it", Value::Null).await.unwrap(), json!(0.5));
        assert_eq!(judge.judge("other", Value::Null).await.unwrap(), json!("other"));
        assert_eq!(judge.count_matching("Score"), 3);
    }
}
