//! Conductor Executor
//!
//! Drives a `BatchPlan` through the model one batch at a time. Batches run
//! strictly in order because each call carries the memory built by the
//! batches before it.
//!
//! Per batch:
//! 1. Build the call for the batch's stage (single, analyze or final)
//! 2. Call the model through the router (retries and endpoint failover)
//! 3. On success, interpret the text, record the paths and, for non-final
//!    batches, carry insights forward
//! 4. On failure of a non-final batch, record it and move on; on failure of
//!    the last batch, fail the run unless running permissively

use crate::conductor::context::ContextAssembler;
use crate::conductor::memory::{extract_insights, PipelineContext};
use crate::conductor::types::{BatchPlan, Stage};
use crate::llm::extract;
use crate::llm::router::{EndpointSelector, LLMRouter};
use crate::llm::LLMError;
use sdk::errors::EngineError;
use sdk::types::{BatchOutcome, EvaluationRequest, EvaluationResult, Verdict};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What the executor hands to the reconciler
#[derive(Debug, Clone)]
pub struct Execution {
    pub context: PipelineContext,

    /// Result of the last batch: its own result, or the permissive placeholder
    pub last_result: Option<EvaluationResult>,
}

/// Runs batches against the model
pub struct Executor {
    router: Arc<LLMRouter>,
    cooldown: Duration,
    permissive: bool,
}

impl Executor {
    pub fn new(router: Arc<LLMRouter>, cooldown: Duration, permissive: bool) -> Self {
        Self {
            router,
            cooldown,
            permissive,
        }
    }

    /// Execute every batch of the plan in order
    ///
    /// # Errors
    ///
    /// Returns `EngineError::FatalPipelineFailure` when the last batch exhausts
    /// its retries outside permissive mode.
    pub async fn run(
        &self,
        request: &EvaluationRequest,
        plan: &BatchPlan,
        selector: &mut EndpointSelector,
    ) -> Result<Execution, EngineError> {
        let assembler = ContextAssembler::new(request);
        let total = plan.len();
        let mut context = PipelineContext::new();
        let mut last_result = None;

        for (i, batch) in plan.batches.iter().enumerate() {
            let index = i + 1;
            let stage = Stage::for_position(index, total);

            if i > 0 && !self.cooldown.is_zero() {
                tokio::time::sleep(self.cooldown).await;
            }

            info!(
                batch = index,
                total,
                stage = %stage,
                files = batch.len(),
                "Evaluating batch {}/{}",
                index,
                total
            );

            let call = assembler.batch_call(batch, stage, index, total, &context);
            let paths = batch.paths();
            let start = Instant::now();

            match self.router.call(selector, &call).await {
                Ok(text) => {
                    let result = extract::interpret(&text);
                    debug!(
                        "Batch {}/{} answered in {:.1}s (structured: {})",
                        index,
                        total,
                        start.elapsed().as_secs_f64(),
                        result.verdict().is_some()
                    );

                    context.record_processed(&paths);
                    // Analysis answers carry findings without an assessment
                    if stage == Stage::Analyze {
                        if let Some(findings) = result.findings() {
                            context.add_insights(extract_insights(&findings));
                        }
                    }

                    last_result = Some(result.clone());
                    context.push_outcome(BatchOutcome::succeeded(index, total, result, paths));
                }
                Err(e) if stage.is_terminal() => {
                    context.push_outcome(BatchOutcome::failed(index, total, paths, e.to_string()));

                    if !self.permissive {
                        error!("Final batch {}/{} failed: {}", index, total, e);
                        return Err(EngineError::FatalPipelineFailure {
                            batch_index: index,
                            total_batches: total,
                            cause: e.to_string(),
                        });
                    }

                    warn!(
                        "Final batch {}/{} failed, substituting placeholder verdict: {}",
                        index, total, e
                    );
                    last_result = Some(EvaluationResult::Verdict(placeholder_verdict(
                        index, total, &e,
                    )));
                }
                Err(e) => {
                    warn!(
                        "Batch {}/{} failed after retries, continuing: {}",
                        index, total, e
                    );
                    context.push_outcome(BatchOutcome::failed(index, total, paths, e.to_string()));
                    last_result = None;
                }
            }
        }

        Ok(Execution {
            context,
            last_result,
        })
    }
}

/// Stand-in verdict for a failed final batch in permissive mode
fn placeholder_verdict(index: usize, total: usize, error: &LLMError) -> Verdict {
    Verdict::new(
        0.0,
        Vec::new(),
        format!(
            "Evaluation incomplete: batch {} of {} could not be evaluated ({})",
            index, total, error
        ),
        vec!["Retry the evaluation once the model backend is reachable".to_string()],
    )
}
