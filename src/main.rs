// Agentic RAG - command-line entry point

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use agentic_rag::models::knowledge::{QueryRequest, QueryResponse};
use agentic_rag::models::response::{CommandResponse, ComponentHealth, HealthResponse};
use agentic_rag::services::knowledge::chunk_text;
use agentic_rag::services::knowledge::loaders::load_document;
use agentic_rag::{AppConfig, AppResult, ConfigService, RetrievalPipeline};
use agentic_rag_llm::{create_provider, LlmProvider};

#[derive(Parser, Debug)]
#[command(
    name = "agentic-rag",
    version,
    about = "Chunk, embed and search documents with two-stage reranking"
)]
struct Cli {
    /// Configuration file. Defaults to ~/.agentic-rag/config.json
    #[arg(long, global = true, env = "AGENTIC_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest files or directories and report what was indexed
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ingest documents, then run one or more queries against them
    Search {
        /// Document or directory to ingest first (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Results per query. Defaults to rag.default_top_k
        #[arg(long)]
        top_k: Option<usize>,

        /// Rerank with the LLM agent instead of the relevance scorer
        #[arg(long)]
        agent: bool,

        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Print the chunk windows of one document
    Chunk {
        #[arg(long, default_value_t = 600)]
        size: usize,

        #[arg(long, default_value_t = 120)]
        overlap: usize,

        path: PathBuf,
    },
    /// Check that the configured backends respond
    Health,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_env("AGENTIC_RAG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so stdout stays machine-readable
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let service = match path {
        Some(path) => ConfigService::from_path(path),
        None => ConfigService::new(),
    }
    .context("failed to load configuration")?;
    tracing::debug!(path = %service.config_path().display(), "configuration loaded");
    Ok(service.get_config().clone())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_search(
    pipeline: &RetrievalPipeline,
    docs: &[PathBuf],
    top_k: usize,
    agent: bool,
    queries: Vec<String>,
) -> AppResult<Vec<QueryResponse>> {
    pipeline.ingest_paths(docs).await?;

    let mut responses = Vec::with_capacity(queries.len());
    for query in queries {
        let request = QueryRequest::new(query, top_k).with_agent(agent);
        responses.push(pipeline.handle_query(request).await?);
    }
    Ok(responses)
}

async fn run_health(config: &AppConfig) -> Result<HealthResponse> {
    let llm: Arc<dyn LlmProvider> =
        create_provider(config.llm_config()).context("failed to build generation backend")?;
    let pipeline = RetrievalPipeline::from_config(config, Some(llm.clone()))?;

    let embedder = pipeline.embedder();
    let mut components = vec![ComponentHealth::from_result(
        "embedding",
        embedder.display_name(),
        embedder.health_check().await,
    )];
    if pipeline.has_agent_reranker() {
        components.push(ComponentHealth::from_result(
            "generation",
            llm.name(),
            llm.health_check().await,
        ));
    }

    Ok(HealthResponse::from_components(components))
}

async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Chunk {
            size,
            overlap,
            path,
        } => {
            let result = tokio::task::spawn_blocking(move || {
                load_document(&path).and_then(|doc| chunk_text(&doc.content, size, overlap))
            })
            .await
            .context("chunking task failed")?;
            let success = result.is_ok();
            print_json(&CommandResponse::from(result))?;
            Ok(success)
        }
        Command::Ingest { paths } => {
            let config = load_config(cli.config.as_deref())?;
            let pipeline = RetrievalPipeline::from_config(&config, None)?;
            let result = pipeline.ingest_paths(&paths).await;
            let success = result.is_ok();
            print_json(&CommandResponse::from(result))?;
            Ok(success)
        }
        Command::Search {
            docs,
            top_k,
            agent,
            queries,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let pipeline = RetrievalPipeline::from_config(&config, None)?;
            let top_k = top_k.unwrap_or(config.rag.default_top_k);
            let result = run_search(&pipeline, &docs, top_k, agent, queries).await;
            let success = result.is_ok();
            print_json(&CommandResponse::from(result))?;
            Ok(success)
        }
        Command::Health => {
            let config = load_config(cli.config.as_deref())?;
            let report = run_health(&config).await?;
            let success = report.status == "healthy";
            print_json(&CommandResponse::ok(report))?;
            Ok(success)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "command failed");
            ExitCode::FAILURE
        }
    }
}
