//! Evaluation data model
//!
//! Types exchanged between the pipeline stages and with callers:
//! the request coming in, the files flowing through scoring and batching,
//! and the verdicts and per-batch outcomes coming out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A candidate file as supplied by the caller, before scoring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path using `/` separators
    pub path: String,

    /// Source text
    #[serde(default)]
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A file with its relevance score attached
///
/// Created once by the planner and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredFile {
    pub path: String,
    pub content: String,

    /// Relevance to the current task, always within [0, 1]
    pub relevance: f64,
}

impl ScoredFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>, relevance: f64) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            relevance: relevance.clamp(0.0, 1.0),
        }
    }

    /// Directory part of the path (everything before the last `/`)
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

/// Everything one evaluation run needs from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub project_detail: String,

    #[serde(deserialize_with = "lenient_strings")]
    pub tasks: Vec<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub current_task: String,

    #[serde(deserialize_with = "lenient_string")]
    pub evidence: String,

    #[serde(deserialize_with = "lenient_string")]
    pub repo_summary: String,

    pub files: Vec<SourceFile>,
}

/// Non-string values (null, numbers, objects) read as an empty string
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Keeps the string entries of an array; anything else reads as empty
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// One graded requirement inside a verdict
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Checkpoint {
    pub requirement: String,
    pub status: String,
    pub details: String,
}

/// The structured grading result
///
/// Immutable once built: adjustments produce a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    /// Overall score in [0, 1]
    pub assessment: f64,

    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub improvements: Vec<String>,
}

impl Verdict {
    pub fn new(
        assessment: f64,
        checkpoints: Vec<Checkpoint>,
        summary: impl Into<String>,
        improvements: Vec<String>,
    ) -> Self {
        Self {
            assessment: clamp_assessment(assessment),
            checkpoints,
            summary: summary.into(),
            improvements,
        }
    }

    /// Build a verdict from a recovered JSON value.
    ///
    /// Requires an object with a numeric `assessment` (numbers encoded as
    /// strings are accepted). Other fields fall back to empty values when
    /// missing or mistyped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let assessment = parse_assessment(value.as_object()?.get("assessment")?)?;
        Self::from_object(value, assessment)
    }

    /// Read the findings of an analysis-only answer.
    ///
    /// Like `from_value`, but an object without a usable `assessment` is
    /// accepted with an assessment of 0. Used for batches that are told not
    /// to score yet.
    pub fn from_partial_value(value: &Value) -> Option<Self> {
        let assessment = value
            .get("assessment")
            .and_then(parse_assessment)
            .unwrap_or(0.0);
        Self::from_object(value, assessment)
    }

    fn from_object(value: &Value, assessment: f64) -> Option<Self> {
        let object = value.as_object()?;

        let checkpoints = object
            .get("checkpoints")
            .and_then(|c| c.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<Checkpoint>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let summary = object
            .get("summary")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();

        let improvements = object
            .get("improvements")
            .and_then(|i| i.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self::new(assessment, checkpoints, summary, improvements))
    }

    /// Return a copy of this verdict with a different assessment
    pub fn with_assessment(&self, assessment: f64) -> Self {
        Self {
            assessment: clamp_assessment(assessment),
            ..self.clone()
        }
    }
}

fn parse_assessment(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn clamp_assessment(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Raw model text that could not be interpreted as a verdict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnstructuredResult {
    pub text_content: String,

    /// True when JSON was recovered but did not have the verdict shape
    pub is_json_format: bool,

    pub message: String,

    /// The JSON that was recovered, when it lacked the verdict shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered: Option<Value>,
}

impl UnstructuredResult {
    /// The recovered object's `summary` field, if it has one
    pub fn recovered_summary(&self) -> Option<&str> {
        self.recovered.as_ref()?.get("summary")?.as_str()
    }
}

/// Outcome of interpreting one model response
///
/// Resolved once, when the response text is parsed, and passed along as is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationResult {
    Verdict(Verdict),
    Unstructured(UnstructuredResult),
}

impl EvaluationResult {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            EvaluationResult::Verdict(v) => Some(v),
            EvaluationResult::Unstructured(_) => None,
        }
    }

    /// Summary text used when this result is handed to a later call
    ///
    /// Unstructured results fall back to their raw text unless the recovered
    /// JSON carries a `summary`.
    pub fn summary(&self) -> &str {
        match self {
            EvaluationResult::Verdict(v) => &v.summary,
            EvaluationResult::Unstructured(u) => {
                u.recovered_summary().unwrap_or(&u.text_content)
            }
        }
    }

    /// Findings of this result, whether or not it was scored
    ///
    /// A verdict is returned as is. Recovered JSON without an assessment is
    /// read leniently, so analysis-only answers still yield their summary
    /// and checkpoints.
    pub fn findings(&self) -> Option<Verdict> {
        match self {
            EvaluationResult::Verdict(v) => Some(v.clone()),
            EvaluationResult::Unstructured(u) => {
                u.recovered.as_ref().and_then(Verdict::from_partial_value)
            }
        }
    }

    pub fn assessment(&self) -> Option<f64> {
        self.verdict().map(|v| v.assessment)
    }
}

/// Record of one batch passing through the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// 1-based position of the batch
    pub batch_index: usize,
    pub total_batches: usize,
    pub verdict: Option<EvaluationResult>,
    pub processed_files: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn succeeded(
        batch_index: usize,
        total_batches: usize,
        result: EvaluationResult,
        processed_files: Vec<String>,
    ) -> Self {
        Self {
            batch_index,
            total_batches,
            verdict: Some(result),
            processed_files,
            success: true,
            error: None,
        }
    }

    pub fn failed(
        batch_index: usize,
        total_batches: usize,
        processed_files: Vec<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            batch_index,
            total_batches,
            verdict: None,
            processed_files,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Final product of one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRunResult {
    pub run_id: String,
    pub verdict: EvaluationResult,
    pub batch_count: usize,
    pub per_batch_outcomes: Vec<BatchOutcome>,

    /// Whether a reconciliation call produced the verdict
    pub reconciled: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl EvaluationRunResult {
    pub fn failed_batches(&self) -> usize {
        self.per_batch_outcomes.iter().filter(|o| !o.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_directory_of_nested_and_root_files() {
        let nested = ScoredFile::new("src/api/users.ts", "", 0.5);
        assert_eq!(nested.directory(), "src/api");

        let root = ScoredFile::new("README.md", "", 0.5);
        assert_eq!(root.directory(), "");
    }

    #[test]
    fn test_scored_file_clamps_relevance() {
        assert_eq!(ScoredFile::new("a", "", 3.0).relevance, 1.0);
        assert_eq!(ScoredFile::new("a", "", -1.0).relevance, 0.0);
    }

    #[test]
    fn test_verdict_from_minimal_value() {
        let verdict = Verdict::from_value(&json!({"assessment": 0.8})).unwrap();
        assert_eq!(verdict.assessment, 0.8);
        assert!(verdict.checkpoints.is_empty());
        assert!(verdict.summary.is_empty());
        assert!(verdict.improvements.is_empty());
    }

    #[test]
    fn test_verdict_from_full_value() {
        let value = json!({
            "assessment": "0.65",
            "checkpoints": [
                {"requirement": "Login form", "status": "passed", "details": "found in LoginForm.tsx"},
                "not a checkpoint"
            ],
            "summary": "Mostly done.",
            "improvements": ["Add tests", 42]
        });

        let verdict = Verdict::from_value(&value).unwrap();
        assert_eq!(verdict.assessment, 0.65);
        assert_eq!(verdict.checkpoints.len(), 1);
        assert_eq!(verdict.checkpoints[0].status, "passed");
        assert_eq!(verdict.improvements, vec!["Add tests".to_string()]);
    }

    #[test]
    fn test_verdict_requires_assessment() {
        assert!(Verdict::from_value(&json!({"summary": "no score"})).is_none());
        assert!(Verdict::from_value(&json!({"assessment": [1]})).is_none());
        assert!(Verdict::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_verdict_assessment_is_clamped() {
        let verdict = Verdict::from_value(&json!({"assessment": 7})).unwrap();
        assert_eq!(verdict.assessment, 1.0);

        let lowered = verdict.with_assessment(-0.2);
        assert_eq!(lowered.assessment, 0.0);
        assert_eq!(verdict.assessment, 1.0);
    }

    #[test]
    fn test_evaluation_result_serialization_is_tagged() {
        let result = EvaluationResult::Unstructured(UnstructuredResult {
            text_content: "not json at all".to_string(),
            is_json_format: false,
            message: "no JSON found".to_string(),
            recovered: None,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "unstructured");
        assert_eq!(json["textContent"], "not json at all");
        assert_eq!(json["isJsonFormat"], false);
    }

    #[test]
    fn test_request_defaults_missing_fields() {
        let request: EvaluationRequest =
            serde_json::from_str(r#"{"currentTask": "Build login", "files": [{"path": "a.ts"}]}"#)
                .unwrap();
        assert_eq!(request.current_task, "Build login");
        assert!(request.tasks.is_empty());
        assert_eq!(request.files[0].content, "");
    }

    #[test]
    fn test_request_coerces_malformed_text_fields() {
        let request: EvaluationRequest = serde_json::from_str(
            r#"{
                "projectDetail": 42,
                "tasks": ["Cart", 7, null, "Checkout"],
                "currentTask": {"title": "Cart"},
                "evidence": null,
                "repoSummary": false,
                "files": [{"path": "a.ts", "content": "x"}]
            }"#,
        )
        .unwrap();

        assert_eq!(request.project_detail, "");
        assert_eq!(request.tasks, vec!["Cart".to_string(), "Checkout".to_string()]);
        assert_eq!(request.current_task, "");
        assert_eq!(request.evidence, "");
        assert_eq!(request.repo_summary, "");
        assert_eq!(request.files.len(), 1);

        let request: EvaluationRequest =
            serde_json::from_str(r#"{"tasks": "Cart", "files": []}"#).unwrap();
        assert!(request.tasks.is_empty());
    }

    #[test]
    fn test_analysis_answer_keeps_findings() {
        let value = json!({
            "summary": "Cart total logic lives in cart module",
            "checkpoints": [{"requirement": "Cart total", "status": "passed", "details": "cart.ts"}]
        });
        assert!(Verdict::from_value(&value).is_none());

        let result = EvaluationResult::Unstructured(UnstructuredResult {
            text_content: value.to_string(),
            is_json_format: true,
            message: "no assessment".to_string(),
            recovered: Some(value),
        });

        assert_eq!(result.summary(), "Cart total logic lives in cart module");
        let findings = result.findings().unwrap();
        assert_eq!(findings.assessment, 0.0);
        assert_eq!(findings.checkpoints.len(), 1);
        assert!(result.assessment().is_none());
    }

    #[test]
    fn test_plain_text_has_no_findings() {
        let result = EvaluationResult::Unstructured(UnstructuredResult {
            text_content: "not json at all".to_string(),
            is_json_format: false,
            message: "no JSON found".to_string(),
            recovered: None,
        });
        assert_eq!(result.summary(), "not json at all");
        assert!(result.findings().is_none());
    }
}
