//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - evaluate: Run the full pipeline against the model backend
//! - plan: Show the batch plan without calling the model
//! - score: Rank files by relevance
//! - config show / path: Inspect configuration

use anyhow::{Context, Result};
use sdk::errors::{EngineError, JudgeErrorExt};
use sdk::types::{EvaluationRequest, EvaluationResult, EvaluationRunResult};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::cli::RequestArgs;
use crate::conductor::{Conductor, Planner, PipelineSettings};
use crate::config::Config;
use crate::llm::openai::OpenAIProvider;
use crate::loader::load_directory;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Attach the user hint to an engine error
fn with_hint(error: EngineError) -> anyhow::Error {
    let hint = error.user_hint().to_string();
    anyhow::Error::new(error).context(hint)
}

/// Read the request file and, with `--repo`, replace its files from disk
pub fn load_request(input: &RequestArgs) -> Result<EvaluationRequest> {
    let text = std::fs::read_to_string(&input.request)
        .with_context(|| format!("Failed to read request file {}", input.request.display()))?;
    let mut request: EvaluationRequest = serde_json::from_str(&text)
        .with_context(|| format!("Invalid request JSON in {}", input.request.display()))?;

    if let Some(repo) = &input.repo {
        request.files = load_directory(repo).map_err(with_hint)?;
        tracing::info!("Loaded {} files from {}", request.files.len(), repo.display());
    }

    Ok(request)
}

/// Run the full evaluation pipeline
pub async fn handle_evaluate(
    input: &RequestArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let request = load_request(input)?;
    let conductor = Conductor::from_config(config, Arc::new(OpenAIProvider::new()));

    let result = conductor.evaluate(&request).await.map_err(with_hint)?;

    match format {
        OutputFormat::Text => print_run_result(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

fn print_run_result(result: &EvaluationRunResult) {
    println!("Run ID: {}", result.run_id);
    println!(
        "Batches: {} ({} failed){}",
        result.batch_count,
        result.failed_batches(),
        if result.reconciled { ", reconciled" } else { "" }
    );
    println!(
        "Duration: {:.1}s",
        (result.finished_at - result.started_at).num_milliseconds() as f64 / 1000.0
    );

    if result.batch_count > 1 {
        println!();
        for outcome in &result.per_batch_outcomes {
            let status = if outcome.success { "ok" } else { "FAILED" };
            print!(
                "  Batch {}/{}: {} ({} files)",
                outcome.batch_index,
                outcome.total_batches,
                status,
                outcome.processed_files.len()
            );
            match &outcome.error {
                Some(error) => println!(" - {}", error),
                None => println!(),
            }
        }
    }

    println!();
    match &result.verdict {
        EvaluationResult::Verdict(verdict) => {
            println!("Assessment: {:.0}%", verdict.assessment * 100.0);
            if !verdict.summary.is_empty() {
                println!("Summary: {}", verdict.summary);
            }
            if !verdict.checkpoints.is_empty() {
                println!();
                println!("Checkpoints:");
                for checkpoint in &verdict.checkpoints {
                    println!("  [{}] {}", checkpoint.status, checkpoint.requirement);
                    if !checkpoint.details.is_empty() {
                        println!("      {}", checkpoint.details);
                    }
                }
            }
            if !verdict.improvements.is_empty() {
                println!();
                println!("Improvements:");
                for improvement in &verdict.improvements {
                    println!("  - {}", improvement);
                }
            }
        }
        EvaluationResult::Unstructured(unstructured) => {
            println!("Unstructured response: {}", unstructured.message);
            println!();
            println!("{}", unstructured.text_content);
        }
    }
}

/// Show the batch plan without calling the model
pub fn handle_plan(input: &RequestArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let request = load_request(input)?;
    let settings = PipelineSettings::from_config(config);
    let planner = Planner::new(settings.budget, settings.truncation);

    let plan = planner.plan(&request).map_err(with_hint)?;
    let summaries = plan.summaries();

    match format {
        OutputFormat::Text => {
            println!(
                "{} files in {} batches (budget {} bytes)",
                plan.file_count(),
                plan.len(),
                plan.budget
            );
            for summary in &summaries {
                println!();
                println!(
                    "Batch {} [{}] {} bytes{}",
                    summary.batch_index,
                    summary.stage,
                    summary.size,
                    if summary.oversized { " (oversized)" } else { "" }
                );
                for path in &summary.files {
                    println!("  {}", path);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "budget": plan.budget,
                "fileCount": plan.file_count(),
                "batches": summaries,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Rank files by relevance
pub fn handle_score(
    input: &RequestArgs,
    top: usize,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let request = load_request(input)?;
    let settings = PipelineSettings::from_config(config);
    let planner = Planner::new(settings.budget, settings.truncation);

    let ranked = planner.rank(&request);
    let shown = ranked.iter().take(top);

    match format {
        OutputFormat::Text => {
            if ranked.is_empty() {
                println!("No files to score");
                return Ok(());
            }
            println!("Top {} of {} files:", top.min(ranked.len()), ranked.len());
            for file in shown {
                println!("  {:.2}  {}", file.relevance, file.path);
            }
        }
        OutputFormat::Json => {
            let files: Vec<_> = shown
                .map(|f| json!({"path": f.path, "relevance": f.relevance}))
                .collect();
            let output = json!({
                "files": files,
                "total": ranked.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(config).context("Failed to render config")?;
            println!("{}", text);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Print the configuration file path in use
pub fn handle_config_path(custom: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match custom {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path().map_err(with_hint)?,
    };

    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!("{}", json!({ "path": path })),
    }
    Ok(())
}
