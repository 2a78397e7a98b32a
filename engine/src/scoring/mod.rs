//! Relevance scoring
//!
//! Assigns every candidate file a score in [0, 1] describing how relevant it
//! is to the task being graded. Text from the evaluation context is split
//! into tokens; each token found in a file's path or content adds weight,
//! with evidence text counting the most. Fixed bonuses reward path shapes
//! that usually hold application code.
//!
//! Scoring is deterministic: the same file and context always produce the
//! same score.

use regex::{Regex, RegexBuilder};
use sdk::types::{EvaluationRequest, ScoredFile, SourceFile};

/// Content matches counted per token
const MAX_OCCURRENCES: usize = 10;

/// Sibling tasks considered, after excluding the current task
const MAX_OTHER_TASKS: usize = 5;

/// Path and per-occurrence content weight for one context field
#[derive(Debug, Clone, Copy, PartialEq)]
struct FieldWeight {
    path: f64,
    content: f64,
}

const EVIDENCE: FieldWeight = FieldWeight {
    path: 0.40,
    content: 0.10,
};
const CURRENT_TASK: FieldWeight = FieldWeight {
    path: 0.20,
    content: 0.05,
};
const OTHER_TASK: FieldWeight = FieldWeight {
    path: 0.10,
    content: 0.03,
};
const PROJECT: FieldWeight = FieldWeight {
    path: 0.05,
    content: 0.02,
};

/// Everything the scorer reads from the evaluation context
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    pub current_task: String,
    pub tasks: Vec<String>,
    pub project_detail: String,
    pub evidence: String,
}

impl From<&EvaluationRequest> for ScoringContext {
    fn from(request: &EvaluationRequest) -> Self {
        Self {
            current_task: request.current_task.clone(),
            tasks: request.tasks.clone(),
            project_detail: request.project_detail.clone(),
            evidence: request.evidence.clone(),
        }
    }
}

/// A context token with its weights and compiled matcher
#[derive(Debug)]
struct WeightedToken {
    token: String,
    weight: FieldWeight,

    /// `None` when the matcher could not be built; the path check still applies
    pattern: Option<Regex>,
}

/// Scores files against one evaluation context
///
/// Tokens and their matchers are built once in `new`, so scoring a large
/// file set does not recompile patterns per file.
///
/// # Example
///
/// ```
/// use repojudge_engine::scoring::{RelevanceScorer, ScoringContext};
///
/// let context = ScoringContext {
///     evidence: "login form validation".to_string(),
///     ..Default::default()
/// };
/// let scorer = RelevanceScorer::new(&context);
///
/// let score = scorer.score("src/components/LoginForm.tsx", "export function LoginForm() {}");
/// assert!(score > 0.5);
/// assert!(score <= 1.0);
/// ```
#[derive(Debug)]
pub struct RelevanceScorer {
    tokens: Vec<WeightedToken>,
}

impl RelevanceScorer {
    pub fn new(context: &ScoringContext) -> Self {
        let mut tokens = Vec::new();

        push_tokens(&mut tokens, &context.evidence, EVIDENCE);
        push_tokens(&mut tokens, &context.current_task, CURRENT_TASK);
        for task in context
            .tasks
            .iter()
            .filter(|task| **task != context.current_task)
            .take(MAX_OTHER_TASKS)
        {
            push_tokens(&mut tokens, task, OTHER_TASK);
        }
        push_tokens(&mut tokens, &context.project_detail, PROJECT);

        Self { tokens }
    }

    /// Score one file; the result is always within [0, 1]
    pub fn score(&self, path: &str, content: &str) -> f64 {
        let lower_path = path.to_lowercase();
        let mut total = 0.0;

        for token in &self.tokens {
            if lower_path.contains(&token.token) {
                total += token.weight.path;
            }
            if let Some(pattern) = &token.pattern {
                let occurrences = pattern.find_iter(content).take(MAX_OCCURRENCES).count();
                total += token.weight.content * occurrences as f64;
            }
        }

        total += path_bonus(&lower_path);
        total.clamp(0.0, 1.0)
    }

    /// Score every file, keeping input order
    pub fn score_all(&self, files: &[SourceFile]) -> Vec<ScoredFile> {
        files
            .iter()
            .map(|file| {
                let relevance = self.score(&file.path, &file.content);
                ScoredFile::new(file.path.clone(), file.content.clone(), relevance)
            })
            .collect()
    }
}

/// Whitespace tokens longer than three characters, lowercased.
/// Repeated tokens are kept and count once per repetition.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| token.chars().count() > 3)
}

fn push_tokens(tokens: &mut Vec<WeightedToken>, text: &str, weight: FieldWeight) {
    for token in tokenize(text) {
        let pattern = RegexBuilder::new(&regex::escape(&token))
            .case_insensitive(true)
            .build();
        if let Err(e) = &pattern {
            tracing::debug!("Skipping content match for token '{}': {}", token, e);
        }
        tokens.push(WeightedToken {
            token,
            weight,
            pattern: pattern.ok(),
        });
    }
}

/// Fixed bonuses for path shapes (expects a lowercased path)
fn path_bonus(path: &str) -> f64 {
    let mut bonus = 0.0;

    if path.ends_with(".ts") || path.ends_with(".tsx") {
        bonus += 0.10;
    } else if path.ends_with(".js") || path.ends_with(".jsx") {
        bonus += 0.08;
    }

    if path.contains("/api/") {
        bonus += 0.15;
    }
    if path.contains("/components/") {
        bonus += 0.10;
    }
    if path.contains("/pages/") || path.contains("/app/") {
        bonus += 0.10;
    }
    if path.contains("/lib/") || path.contains("/utils/") {
        bonus += 0.10;
    }

    bonus
}
