//! Conductor System
//!
//! Runs one evaluation end to end: plan the batches, execute them in order
//! against the model, reconcile the per-batch results and apply the
//! partial-failure policy.
//!
//! # Example
//!
//! ```no_run
//! use repojudge_engine::conductor::Conductor;
//! use repojudge_engine::config::Config;
//! use repojudge_engine::llm::openai::OpenAIProvider;
//! use sdk::types::{EvaluationRequest, SourceFile};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! let conductor = Conductor::from_config(&config, Arc::new(OpenAIProvider::new()));
//!
//! let request = EvaluationRequest {
//!     current_task: "Add a checkout page".to_string(),
//!     evidence: "Checkout button submits the order".to_string(),
//!     files: vec![SourceFile::new("src/pages/checkout.tsx", "...")],
//!     ..Default::default()
//! };
//!
//! let result = conductor.evaluate(&request).await?;
//! println!("{:?}", result.verdict.assessment());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod executor;
pub mod memory;
pub mod planner;
pub mod reconciler;
pub mod types;

pub use context::ContextAssembler;
pub use executor::{Execution, Executor};
pub use memory::PipelineContext;
pub use planner::Planner;
pub use reconciler::{Reconciler, Reconciliation};
pub use types::{BatchPlan, BatchSummary, PipelineSettings, Stage};

use crate::config::{Config, PartialFailurePolicy};
use crate::llm::router::LLMRouter;
use crate::llm::LLMProvider;
use chrono::Utc;
use sdk::errors::EngineError;
use sdk::types::{EvaluationRequest, EvaluationResult, EvaluationRunResult};
use std::sync::Arc;
use tracing::{error, info, Instrument};

/// Evaluation pipeline facade
///
/// Holds no per-run state, so one instance can serve concurrent runs. Each
/// run gets its own endpoint selector and pipeline context.
pub struct Conductor {
    router: Arc<LLMRouter>,
    planner: Planner,
    executor: Executor,
    reconciler: Reconciler,
    partial_failure_policy: PartialFailurePolicy,
}

impl Conductor {
    pub fn new(router: Arc<LLMRouter>, settings: PipelineSettings) -> Self {
        Self {
            planner: Planner::new(settings.budget, settings.truncation),
            executor: Executor::new(
                Arc::clone(&router),
                settings.batch_cooldown,
                settings.permissive,
            ),
            reconciler: Reconciler::new(Arc::clone(&router)),
            partial_failure_policy: settings.partial_failure_policy,
            router,
        }
    }

    /// Wire a conductor from configuration and a model backend
    pub fn from_config(config: &Config, provider: Arc<dyn LLMProvider>) -> Self {
        let router = LLMRouter::new(provider, config.model_config(), config.retry_policy());
        Self::new(Arc::new(router), PipelineSettings::from_config(config))
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Evaluate a request and return the final verdict with per-batch outcomes
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when the request has no files
    /// - `FatalPipelineFailure` when the last batch fails outside permissive mode
    /// - `NoBatchSucceeded` when no batch produced a result
    pub async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationRunResult, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("evaluation", run_id = %run_id);

        self.evaluate_run(request, run_id).instrument(span).await
    }

    async fn evaluate_run(
        &self,
        request: &EvaluationRequest,
        run_id: String,
    ) -> Result<EvaluationRunResult, EngineError> {
        let started_at = Utc::now();
        info!("Starting evaluation of {} files", request.files.len());

        let plan = self.planner.plan(request)?;
        let total = plan.len();
        let mut selector = self.router.selector();

        let execution = self.executor.run(request, &plan, &mut selector).await?;

        if execution.context.succeeded_batches() == 0 {
            error!("None of the {} batches produced a result", total);
            return Err(EngineError::NoBatchSucceeded {
                total_batches: total,
            });
        }

        let reconciliation = self
            .reconciler
            .reconcile(
                request,
                &execution.context,
                execution.last_result,
                &mut selector,
            )
            .await;

        let verdict = reconciliation
            .result
            .ok_or(EngineError::NoBatchSucceeded {
                total_batches: total,
            })?;

        let succeeded = execution.context.succeeded_batches();
        let verdict = apply_partial_failure_policy(
            self.partial_failure_policy,
            verdict,
            succeeded,
            total,
        );

        let finished_at = Utc::now();
        info!(
            "Evaluation finished: {}/{} batches succeeded, reconciled: {}, assessment: {:?}",
            succeeded,
            total,
            reconciliation.reconciled,
            verdict.assessment()
        );

        Ok(EvaluationRunResult {
            run_id,
            verdict,
            batch_count: total,
            per_batch_outcomes: execution.context.into_batch_results(),
            reconciled: reconciliation.reconciled,
            started_at,
            finished_at,
        })
    }
}

/// Scale a structured verdict by the share of batches that succeeded
pub fn apply_partial_failure_policy(
    policy: PartialFailurePolicy,
    result: EvaluationResult,
    succeeded: usize,
    total: usize,
) -> EvaluationResult {
    match (policy, &result) {
        (PartialFailurePolicy::Penalize, EvaluationResult::Verdict(verdict))
            if total > 0 && succeeded < total =>
        {
            let factor = succeeded as f64 / total as f64;
            EvaluationResult::Verdict(verdict.with_assessment(verdict.assessment * factor))
        }
        _ => result,
    }
}
