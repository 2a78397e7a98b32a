//! RepoJudge SDK
//!
//! Shared types and error definitions for RepoJudge components.
//! This crate is used by the engine and by anything that consumes
//! evaluation results (persistence layers, UIs).

/// Error types and handling
pub mod errors;

/// Evaluation data model
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, JudgeErrorExt};
pub use types::{
    BatchOutcome, Checkpoint, EvaluationRequest, EvaluationResult, EvaluationRunResult,
    ScoredFile, SourceFile, UnstructuredResult, Verdict,
};
