//! RepoJudge Engine Library
//!
//! This library provides the evaluation pipeline: relevance scoring, batch
//! partitioning, multi-batch orchestration against an LLM backend and
//! reconciliation of the per-batch results. It is used by both the main
//! binary and integration tests.

/// Configuration management module
pub mod config;

/// Telemetry and Observability
pub mod telemetry;

/// Relevance scoring module
pub mod scoring;

/// Batch partitioning and per-file truncation
pub mod batching;

/// LLM provider abstraction layer
pub mod llm;

/// Conductor orchestration module
pub mod conductor;

/// Local repository loader
pub mod loader;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
