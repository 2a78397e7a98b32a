//! Conductor Planner
//!
//! Turns an evaluation request into a `BatchPlan`: score every file, rank by
//! relevance, truncate long files if configured, then partition into batches.
//! No model calls happen here.

use crate::batching::{partition, Truncation};
use crate::conductor::types::BatchPlan;
use crate::scoring::{RelevanceScorer, ScoringContext};
use sdk::errors::EngineError;
use sdk::types::{EvaluationRequest, ScoredFile};
use tracing::{debug, info};

pub struct Planner {
    budget: usize,
    truncation: Option<Truncation>,
}

impl Planner {
    pub fn new(budget: usize, truncation: Option<Truncation>) -> Self {
        Self { budget, truncation }
    }

    /// Score and rank the request's files, most relevant first.
    ///
    /// Ties keep the request's file order.
    pub fn rank(&self, request: &EvaluationRequest) -> Vec<ScoredFile> {
        let scorer = RelevanceScorer::new(&ScoringContext::from(request));
        let mut scored = scorer.score_all(&request.files);
        scored.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        scored
    }

    /// Build the batch plan for a request
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidRequest` when the request has no files.
    pub fn plan(&self, request: &EvaluationRequest) -> Result<BatchPlan, EngineError> {
        if request.files.is_empty() {
            return Err(EngineError::InvalidRequest(
                "request contains no files to evaluate".to_string(),
            ));
        }

        let mut ranked = self.rank(request);

        if let Some(truncation) = &self.truncation {
            let mut truncated = 0;
            for file in &mut ranked {
                if let std::borrow::Cow::Owned(shortened) = truncation.apply(&file.content) {
                    file.content = shortened;
                    truncated += 1;
                }
            }
            if truncated > 0 {
                debug!(
                    "Truncated {} files to {} characters",
                    truncated, truncation.max_chars
                );
            }
        }

        let batches = partition(ranked, self.budget);
        let plan = BatchPlan {
            batches,
            budget: self.budget,
        };

        info!(
            "Planned {} files into {} batches (budget {} bytes)",
            plan.file_count(),
            plan.len(),
            self.budget
        );

        Ok(plan)
    }
}
