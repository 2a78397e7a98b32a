use crate::batching::{Batch, Truncation};
use crate::config::{Config, PartialFailurePolicy};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Position of a batch in the multi-batch protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// The only batch: evaluated directly, without continuation instructions
    Single,

    /// Any batch but the last: read and remember, no scoring yet
    Analyze,

    /// The last batch: score everything seen so far
    Final,
}

impl Stage {
    /// Stage of the 1-based batch `index` out of `total`
    pub fn for_position(index: usize, total: usize) -> Self {
        if total <= 1 {
            Stage::Single
        } else if index >= total {
            Stage::Final
        } else {
            Stage::Analyze
        }
    }

    /// Whether failure of this batch leaves nothing to fall back on
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Single | Stage::Final)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Single => write!(f, "single"),
            Stage::Analyze => write!(f, "analyze"),
            Stage::Final => write!(f, "final"),
        }
    }
}

/// Ordered batches produced for one run
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub batches: Vec<Batch>,

    /// Budget the batches were cut to
    pub budget: usize,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    /// Serializable overview (no file content)
    pub fn summaries(&self) -> Vec<BatchSummary> {
        let total = self.len();
        self.batches
            .iter()
            .enumerate()
            .map(|(i, batch)| BatchSummary {
                batch_index: i + 1,
                stage: Stage::for_position(i + 1, total),
                size: batch.size(),
                oversized: batch.size() > self.budget,
                files: batch.paths(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_index: usize,
    pub stage: Stage,
    pub size: usize,
    pub oversized: bool,
    pub files: Vec<String>,
}

/// Pipeline knobs resolved from configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Partition budget in serialized bytes
    pub budget: usize,

    /// Per-file truncation; `None` keeps files whole
    pub truncation: Option<Truncation>,

    /// Pause between consecutive batches
    pub batch_cooldown: Duration,

    pub permissive: bool,
    pub partial_failure_policy: PartialFailurePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        let truncation = &config.pipeline.truncation;
        Self {
            budget: config.effective_budget(),
            truncation: truncation.enabled.then_some(Truncation {
                max_chars: truncation.max_file_chars,
                head_ratio: truncation.head_ratio,
            }),
            batch_cooldown: config.batch_cooldown(),
            permissive: config.pipeline.permissive,
            partial_failure_policy: config.pipeline.partial_failure_policy,
        }
    }
}
