use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::quality::QualityReport;

/// Result of one develop invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Whatever the production action returned.
    pub output: Value,
    /// Present when the result passed through a quality gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

impl Work {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            quality: None,
        }
    }

    pub fn with_quality(mut self, report: QualityReport) -> Self {
        self.quality = Some(report);
        self
    }

    /// False only when a gate ran and gave up below threshold.
    pub fn is_accepted(&self) -> bool {
        self.quality.as_ref().map_or(true, QualityReport::is_accepted)
    }
}

impl From<Value> for Work {
    fn from(output: Value) -> Self {
        Self::new(output)
    }
}
