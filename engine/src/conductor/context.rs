//! Context Assembler
//!
//! Builds the instruction and JSON payload for every model call of a run.
//! The continuation instruction depends on the batch's position, and later
//! batches carry the processed paths and key insights gathered so far, which
//! is how the pipeline gives a stateless backend a memory of earlier batches.

use crate::batching::{Batch, FilePayload};
use crate::conductor::memory::PipelineContext;
use crate::conductor::types::Stage;
use crate::llm::EvaluationCall;
use sdk::types::EvaluationRequest;
use serde_json::{json, Value};

/// System instruction shared by every call of a run
pub const SYSTEM_INSTRUCTION: &str = "You are a strict code reviewer grading a repository \
against a task. The user message is a JSON object with the project description, the task \
list, the current task, the evidence criteria, a repository summary and source files. \
When asked to score, reply with only a JSON object of the form \
{\"assessment\": <number between 0 and 1>, \"checkpoints\": [{\"requirement\": string, \
\"status\": \"passed\" | \"partial\" | \"failed\", \"details\": string}], \"summary\": string, \
\"improvements\": [string]}. Base every checkpoint on code you have actually seen.";

const FIRST_BATCH_INSTRUCTION: &str = "This is batch 1 of {total}. Read these files and \
remember what they implement. Do not score yet; reply with a JSON object whose summary \
describes what you found.";

const MIDDLE_BATCH_INSTRUCTION: &str = "This is batch {index} of {total}. Continue reading. \
`batchContext.previouslyProcessedFiles` lists the files you already saw and \
`batchContext.keyInsights` holds up to 5 findings from them. Still do not score; reply with \
a JSON object whose summary describes what these files add.";

const FINAL_BATCH_INSTRUCTION: &str = "This is the final batch ({index} of {total}). Now \
score comprehensively, using every file you have seen across all batches, not just this \
one. `batchContext.previouslyProcessedFiles` and `batchContext.keyInsights` describe the \
earlier batches.";

const RECONCILE_INSTRUCTION: &str = "The repository was evaluated in {total} batches. \
`reconciliation.batchSummaries` holds the findings of every batch that completed and \
`reconciliation.processedFiles` lists every file that was read. Produce a single \
comprehensive verdict that considers all batches together.";

/// Builds model calls for one evaluation request
pub struct ContextAssembler<'a> {
    request: &'a EvaluationRequest,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(request: &'a EvaluationRequest) -> Self {
        Self { request }
    }

    /// Continuation instruction for a batch, `None` for a single-batch run
    pub fn instruction(stage: Stage, index: usize, total: usize) -> Option<String> {
        let template = match stage {
            Stage::Single => return None,
            Stage::Analyze if index <= 1 => FIRST_BATCH_INSTRUCTION,
            Stage::Analyze => MIDDLE_BATCH_INSTRUCTION,
            Stage::Final => FINAL_BATCH_INSTRUCTION,
        };
        Some(
            template
                .replace("{index}", &index.to_string())
                .replace("{total}", &total.to_string()),
        )
    }

    /// Call for one batch
    ///
    /// A single-batch run sends the request as is. Multi-batch runs merge the
    /// continuation instruction into `currentTask` and attach `batchContext`.
    pub fn batch_call(
        &self,
        batch: &Batch,
        stage: Stage,
        index: usize,
        total: usize,
        context: &PipelineContext,
    ) -> EvaluationCall {
        let files: Vec<FilePayload<'_>> = batch.files().iter().map(FilePayload::from).collect();
        let instruction = Self::instruction(stage, index, total);

        let mut payload = self.base_payload(instruction.as_deref());
        payload["files"] = json!(files);

        if let Some(instruction) = instruction {
            // The first batch has nothing to carry forward
            let (previous, insights): (&[String], &[String]) = if index <= 1 {
                (&[], &[])
            } else {
                (context.processed_paths(), context.key_insights())
            };
            payload["batchContext"] = json!({
                "batchIndex": index,
                "totalBatches": total,
                "stage": stage,
                "instruction": instruction,
                "previouslyProcessedFiles": previous,
                "keyInsights": insights,
            });
        }

        EvaluationCall::new(SYSTEM_INSTRUCTION, payload)
    }

    /// Call merging all batch results; carries no file content
    pub fn reconcile_call(&self, context: &PipelineContext) -> EvaluationCall {
        let total = context.batch_results().len();
        let instruction = RECONCILE_INSTRUCTION.replace("{total}", &total.to_string());

        let summaries: Vec<Value> = context
            .batch_results()
            .iter()
            .filter(|outcome| outcome.success)
            .filter_map(|outcome| {
                let result = outcome.verdict.as_ref()?;
                Some(json!({
                    "batchIndex": outcome.batch_index,
                    "assessment": result.assessment(),
                    "summary": result.summary(),
                }))
            })
            .collect();

        let mut payload = self.base_payload(Some(&instruction));
        payload["reconciliation"] = json!({
            "totalBatches": total,
            "failedBatches": context.failed_batches(),
            "processedFiles": context.processed_paths(),
            "batchSummaries": summaries,
        });

        EvaluationCall::new(SYSTEM_INSTRUCTION, payload)
    }

    fn base_payload(&self, instruction: Option<&str>) -> Value {
        let request = self.request;
        let current_task = match instruction {
            Some(instruction) => format!("{}\n\n{}", request.current_task, instruction),
            None => request.current_task.clone(),
        };

        json!({
            "projectDetail": request.project_detail,
            "tasks": request.tasks,
            "currentTask": current_task,
            "evidence": request.evidence,
            "repoSummary": request.repo_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batching::partition;
    use sdk::types::{BatchOutcome, EvaluationResult, ScoredFile, Verdict};

    fn request() -> EvaluationRequest {
        EvaluationRequest {
            project_detail: "Shop".to_string(),
            tasks: vec!["Cart".to_string(), "Checkout".to_string()],
            current_task: "Checkout".to_string(),
            evidence: "Stripe integration".to_string(),
            repo_summary: "Next.js app".to_string(),
            files: vec![],
        }
    }

    fn batch() -> Batch {
        partition(vec![ScoredFile::new("src/pay.ts", "stripe()", 0.9)], 10_000)
            .pop()
            .unwrap()
    }

    #[test]
    fn test_single_batch_has_no_continuation() {
        let request = request();
        let assembler = ContextAssembler::new(&request);
        let call = assembler.batch_call(&batch(), Stage::Single, 1, 1, &PipelineContext::new());

        assert_eq!(call.payload["currentTask"], "Checkout");
        assert!(call.payload.get("batchContext").is_none());
        assert_eq!(call.payload["files"][0]["path"], "src/pay.ts");
        assert_eq!(call.payload["files"][0]["content"], "stripe()");
        assert_eq!(call.system_instruction, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_instructions_by_position() {
        let first = ContextAssembler::instruction(Stage::Analyze, 1, 3).unwrap();
        assert!(first.contains("Do not score yet"));

        let middle = ContextAssembler::instruction(Stage::Analyze, 2, 3).unwrap();
        assert!(middle.contains("batch 2 of 3"));
        assert!(middle.contains("Still do not score"));

        let last = ContextAssembler::instruction(Stage::Final, 3, 3).unwrap();
        assert!(last.contains("score comprehensively"));
        assert!(ContextAssembler::instruction(Stage::Single, 1, 1).is_none());
    }

    #[test]
    fn test_later_batches_carry_memory() {
        let request = request();
        let assembler = ContextAssembler::new(&request);
        let mut context = PipelineContext::new();
        context.record_processed(&["src/cart.ts".to_string()]);
        context.add_insights(vec!["Cart: passed".to_string()]);

        let call = assembler.batch_call(&batch(), Stage::Analyze, 2, 3, &context);
        let batch_context = &call.payload["batchContext"];
        assert_eq!(batch_context["batchIndex"], 2);
        assert_eq!(batch_context["stage"], "analyze");
        assert_eq!(batch_context["previouslyProcessedFiles"][0], "src/cart.ts");
        assert_eq!(batch_context["keyInsights"][0], "Cart: passed");

        let task = call.payload["currentTask"].as_str().unwrap();
        assert!(task.starts_with("Checkout\n\n"));
        assert!(task.contains("Continue reading"));
    }

    #[test]
    fn test_reconcile_call_has_no_file_content() {
        let request = request();
        let assembler = ContextAssembler::new(&request);
        let mut context = PipelineContext::new();
        context.record_processed(&["a.ts".to_string(), "b.ts".to_string()]);
        context.push_outcome(BatchOutcome::succeeded(
            1,
            3,
            EvaluationResult::Verdict(Verdict::new(0.0, vec![], "saw the cart", vec![])),
            vec!["a.ts".to_string()],
        ));
        context.push_outcome(BatchOutcome::failed(2, 3, vec!["x.ts".to_string()], "timeout"));
        context.push_outcome(BatchOutcome::succeeded(
            3,
            3,
            EvaluationResult::Verdict(Verdict::new(0.7, vec![], "checkout works", vec![])),
            vec!["b.ts".to_string()],
        ));

        let call = assembler.reconcile_call(&context);
        assert!(call.payload.get("files").is_none());

        let reconciliation = &call.payload["reconciliation"];
        assert_eq!(reconciliation["totalBatches"], 3);
        assert_eq!(reconciliation["failedBatches"], 1);
        assert_eq!(reconciliation["processedFiles"], json!(["a.ts", "b.ts"]));

        let summaries = reconciliation["batchSummaries"].as_array().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0]["summary"], "saw the cart");
        assert_eq!(summaries[1]["batchIndex"], 3);
    }
}
