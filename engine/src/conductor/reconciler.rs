//! Reconciler
//!
//! Merges the per-batch results of a multi-batch run into one verdict with
//! a final model call. The call carries summaries and paths only, never file
//! content. Reconciliation never fails a run: if the call fails, the last
//! batch's own result stands.

use crate::conductor::context::ContextAssembler;
use crate::conductor::memory::PipelineContext;
use crate::llm::extract;
use crate::llm::router::{EndpointSelector, LLMRouter};
use sdk::types::{EvaluationRequest, EvaluationResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of the reconciliation step
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub result: Option<EvaluationResult>,

    /// Whether the result came from a reconciliation call
    pub reconciled: bool,
}

pub struct Reconciler {
    router: Arc<LLMRouter>,
}

impl Reconciler {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    /// Produce the run's final result
    ///
    /// A single-batch run returns `last_result` untouched without a call. An
    /// unstructured reconciliation answer only replaces a fallback that is
    /// itself unstructured.
    pub async fn reconcile(
        &self,
        request: &EvaluationRequest,
        context: &PipelineContext,
        last_result: Option<EvaluationResult>,
        selector: &mut EndpointSelector,
    ) -> Reconciliation {
        let fallback = Reconciliation {
            result: last_result,
            reconciled: false,
        };

        if context.batch_results().len() <= 1 || context.succeeded_batches() == 0 {
            return fallback;
        }

        info!(
            "Reconciling {} batches ({} failed)",
            context.batch_results().len(),
            context.failed_batches()
        );

        let call = ContextAssembler::new(request).reconcile_call(context);
        match self.router.call(selector, &call).await {
            Ok(text) => {
                let merged = extract::interpret(&text);
                let fallback_structured = fallback
                    .result
                    .as_ref()
                    .is_some_and(|r| r.verdict().is_some());

                if merged.verdict().is_none() && fallback_structured {
                    warn!("Reconciliation answer was not a verdict, keeping last batch result");
                    return fallback;
                }

                Reconciliation {
                    result: Some(merged),
                    reconciled: true,
                }
            }
            Err(e) => {
                warn!("Reconciliation failed, keeping last batch result: {}", e);
                fallback
            }
        }
    }
}
