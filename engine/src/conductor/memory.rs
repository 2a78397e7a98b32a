//! Pipeline memory
//!
//! The model keeps no state between calls. Continuity across batches comes
//! from `PipelineContext`: the paths already read and a handful of short
//! insights are re-sent with every later batch.

use sdk::types::{BatchOutcome, Verdict};
use std::collections::HashSet;

/// Most insights ever carried forward
pub const MAX_INSIGHTS: usize = 5;

/// Checkpoint insights taken from one verdict
const MAX_CHECKPOINT_INSIGHTS: usize = 3;

/// Summary fragments taken from one verdict
const MAX_SUMMARY_INSIGHTS: usize = 2;

/// Summary fragments this short carry no information
const MIN_FRAGMENT_CHARS: usize = 10;

/// Mutable state threaded through one run
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    processed_paths: Vec<String>,
    seen: HashSet<String>,
    key_insights: Vec<String>,
    batch_results: Vec<BatchOutcome>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every successfully evaluated file, in evaluation order
    pub fn processed_paths(&self) -> &[String] {
        &self.processed_paths
    }

    pub fn key_insights(&self) -> &[String] {
        &self.key_insights
    }

    pub fn batch_results(&self) -> &[BatchOutcome] {
        &self.batch_results
    }

    pub fn into_batch_results(self) -> Vec<BatchOutcome> {
        self.batch_results
    }

    pub fn succeeded_batches(&self) -> usize {
        self.batch_results.iter().filter(|o| o.success).count()
    }

    pub fn failed_batches(&self) -> usize {
        self.batch_results.len() - self.succeeded_batches()
    }

    /// Append paths, skipping any already recorded
    pub fn record_processed(&mut self, paths: &[String]) {
        for path in paths {
            if self.seen.insert(path.clone()) {
                self.processed_paths.push(path.clone());
            }
        }
    }

    /// Append insights, then keep only the first `MAX_INSIGHTS` ever collected.
    ///
    /// Later insights are dropped once the list is full, so the earliest
    /// five persist for the whole run.
    pub fn add_insights(&mut self, insights: Vec<String>) {
        self.key_insights.extend(insights);
        if self.key_insights.len() > MAX_INSIGHTS {
            self.key_insights.truncate(MAX_INSIGHTS);
        }
    }

    pub fn push_outcome(&mut self, outcome: BatchOutcome) {
        self.batch_results.push(outcome);
    }
}

/// Condense a verdict into carry-forward insights.
///
/// Up to three `"<requirement>: <status>"` lines from checkpoints that have
/// both a status and details, then up to two summary fragments longer than
/// ten characters.
pub fn extract_insights(verdict: &Verdict) -> Vec<String> {
    let mut insights: Vec<String> = verdict
        .checkpoints
        .iter()
        .filter(|c| !c.status.trim().is_empty() && !c.details.trim().is_empty())
        .take(MAX_CHECKPOINT_INSIGHTS)
        .map(|c| format!("{}: {}", c.requirement, c.status))
        .collect();

    insights.extend(
        verdict
            .summary
            .split(['|', ',', ';', '.'])
            .map(str::trim)
            .filter(|fragment| fragment.chars().count() > MIN_FRAGMENT_CHARS)
            .take(MAX_SUMMARY_INSIGHTS)
            .map(String::from),
    );

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::Checkpoint;

    fn checkpoint(requirement: &str, status: &str, details: &str) -> Checkpoint {
        Checkpoint {
            requirement: requirement.to_string(),
            status: status.to_string(),
            details: details.to_string(),
        }
    }

    #[test]
    fn test_extract_insights_from_checkpoints_and_summary() {
        let verdict = Verdict::new(
            0.5,
            vec![
                checkpoint("Login form", "passed", "LoginForm.tsx renders inputs"),
                checkpoint("Validation", "failed", ""),
                checkpoint("Session", "partial", "cookie set, no expiry"),
                checkpoint("Logout", "passed", "button in header"),
                checkpoint("Reset", "missing", "no route"),
            ],
            "Auth flow is wired up. Tests are missing; short. Styling incomplete",
            vec![],
        );

        let insights = extract_insights(&verdict);
        assert_eq!(
            insights,
            vec![
                "Login form: passed",
                "Session: partial",
                "Logout: passed",
                "Auth flow is wired up",
                "Tests are missing",
            ]
        );
    }

    #[test]
    fn test_extract_insights_empty_verdict() {
        let verdict = Verdict::new(0.0, vec![], "", vec![]);
        assert!(extract_insights(&verdict).is_empty());
    }

    #[test]
    fn test_insights_keep_first_five() {
        let mut context = PipelineContext::new();
        context.add_insights((1..=3).map(|i| format!("first-{}", i)).collect());
        context.add_insights((1..=4).map(|i| format!("second-{}", i)).collect());

        assert_eq!(context.key_insights().len(), MAX_INSIGHTS);
        assert_eq!(context.key_insights()[0], "first-1");
        assert_eq!(context.key_insights()[4], "second-2");

        context.add_insights(vec!["late".to_string()]);
        assert!(!context.key_insights().contains(&"late".to_string()));
    }

    #[test]
    fn test_processed_paths_are_an_ordered_set() {
        let mut context = PipelineContext::new();
        context.record_processed(&["b.ts".to_string(), "a.ts".to_string()]);
        context.record_processed(&["a.ts".to_string(), "c.ts".to_string()]);
        assert_eq!(context.processed_paths(), &["b.ts", "a.ts", "c.ts"]);
    }

    #[test]
    fn test_outcome_counts() {
        let mut context = PipelineContext::new();
        context.push_outcome(BatchOutcome::failed(1, 2, vec![], "timeout"));
        context.push_outcome(BatchOutcome::succeeded(
            2,
            2,
            sdk::types::EvaluationResult::Verdict(Verdict::new(1.0, vec![], "", vec![])),
            vec![],
        ));
        assert_eq!(context.succeeded_batches(), 1);
        assert_eq!(context.failed_batches(), 1);
    }
}
