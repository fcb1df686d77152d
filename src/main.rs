//! docbuddy - Main CLI entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docbuddy::cli::{output, Args, Commands};
use docbuddy::config::{Config, EmbeddingBackend, IndexBackend};
use docbuddy::doctor::Doctor;
use docbuddy::embedding::{EmbeddingProvider, LocalEmbedder, OllamaEmbedder};
use docbuddy::index::{LocalVectorIndex, QdrantIndex, VectorIndex};
use docbuddy::models::OllamaClient;
use docbuddy::rag::{PipelineOptions, RagPipeline, RetryPolicy};
use docbuddy::repl::ReplSession;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let client = OllamaClient::new(&args.ollama_url())?;

    match &args.command {
        Commands::Populate {
            data_path,
            index_path,
            chunk_size,
            chunk_overlap,
            reset,
        } => {
            run_populate(
                &args,
                &config,
                client,
                data_path,
                index_path.clone(),
                *chunk_size,
                *chunk_overlap,
                *reset,
            )
            .await
        }
        Commands::Query {
            query_text,
            model,
            k,
            score_threshold,
            with_scores,
            json,
            index_path,
        } => {
            run_query(
                &args,
                &config,
                client,
                query_text,
                model.as_deref(),
                *k,
                *score_threshold,
                *with_scores,
                *json,
                index_path.clone(),
            )
            .await
        }
        Commands::Start {
            data_path,
            index_path,
        } => run_repl(&args, &config, client, data_path, index_path.clone()).await,
        Commands::Doctor => run_doctor(client, config).await,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Build the embedding provider the config asks for
async fn build_embedder(
    config: &Config,
    client: &OllamaClient,
    show_progress: bool,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let spinner = spinner(show_progress, "Loading embedding model...");
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.backend {
        EmbeddingBackend::Ollama => Arc::new(
            OllamaEmbedder::connect(client.clone(), &config.embedding.ollama_models).await?,
        ),
        EmbeddingBackend::Local => {
            let candidates = config.embedding.local_models.clone();
            // model download and weight loading are blocking
            Arc::new(tokio::task::spawn_blocking(move || LocalEmbedder::load(&candidates)).await??)
        }
    };
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(embedder)
}

/// Open the vector index the config asks for
async fn build_index(
    config: &Config,
    index_path: Option<PathBuf>,
    dimension: usize,
) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match config.index.backend {
        IndexBackend::Local => {
            let path = index_path.unwrap_or_else(|| config.index.path.clone());
            Arc::new(LocalVectorIndex::open(&path)?)
        }
        IndexBackend::Qdrant => Arc::new(
            QdrantIndex::connect(
                &config.index.qdrant_url,
                &config.index.collection,
                dimension,
            )
            .await?,
        ),
    };
    Ok(index)
}

fn build_pipeline(
    config: &Config,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    client: OllamaClient,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<RagPipeline> {
    let options = PipelineOptions {
        chunk_size,
        chunk_overlap,
        ..Default::default()
    };
    let retry = RetryPolicy {
        max_retries: config.generation.max_retries,
        ..Default::default()
    };
    Ok(RagPipeline::new(embedder, index, Arc::new(client), options)?.with_retry_policy(retry))
}

fn spinner(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Some(pb)
}

#[allow(clippy::too_many_arguments)]
async fn run_populate(
    args: &Args,
    config: &Config,
    client: OllamaClient,
    data_path: &std::path::Path,
    index_path: Option<PathBuf>,
    chunk_size: usize,
    chunk_overlap: usize,
    reset: bool,
) -> Result<()> {
    let show_progress = args.verbosity().show_progress();
    let embedder = build_embedder(config, &client, show_progress).await?;
    let index = build_index(config, index_path, embedder.dimension()).await?;
    let pipeline = build_pipeline(config, embedder, index, client, chunk_size, chunk_overlap)?;

    let pb = spinner(show_progress, "Chunking, embedding, and indexing...");
    let report = pipeline.populate(data_path, reset).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let report = report?;
    output::print_population_report(&report);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_query(
    args: &Args,
    config: &Config,
    client: OllamaClient,
    query_text: &str,
    model: Option<&str>,
    k: usize,
    score_threshold: f32,
    with_scores: bool,
    json: bool,
    index_path: Option<PathBuf>,
) -> Result<()> {
    let show_progress = args.verbosity().show_progress() && !json;
    let embedder = build_embedder(config, &client, show_progress).await?;
    let index = build_index(config, index_path, embedder.dimension()).await?;
    let pipeline = build_pipeline(
        config,
        embedder,
        index,
        client,
        docbuddy::corpus::chunker::DEFAULT_CHUNK_SIZE,
        docbuddy::corpus::chunker::DEFAULT_CHUNK_OVERLAP,
    )?;

    let model_config = config.generation.to_model_config(model);
    let pb = spinner(show_progress, "Retrieving and generating...");
    let outcome = pipeline.query(query_text, k, score_threshold, &model_config).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            output::print_query_error(&e);
            std::process::exit(1);
        }
    };
    if json {
        output::print_outcome_json(&outcome)?;
    } else {
        output::print_outcome(&outcome, with_scores);
    }
    Ok(())
}

async fn run_repl(
    args: &Args,
    config: &Config,
    client: OllamaClient,
    data_path: &std::path::Path,
    index_path: Option<PathBuf>,
) -> Result<()> {
    if !client.health_check().await {
        println!(
            "{}",
            "Ollama is not running! Start with: ollama serve".red()
        );
        anyhow::bail!("Ollama not reachable at {}", args.ollama_url());
    }

    let embedder = build_embedder(config, &client, true).await?;
    let index = build_index(config, index_path, embedder.dimension()).await?;
    let pipeline = build_pipeline(
        config,
        embedder,
        index,
        client,
        docbuddy::corpus::chunker::DEFAULT_CHUNK_SIZE,
        docbuddy::corpus::chunker::DEFAULT_CHUNK_OVERLAP,
    )?;

    let session = ReplSession::new(
        Arc::new(pipeline),
        data_path.to_path_buf(),
        config.generation.to_model_config(None),
    );
    session.run(Config::history_path().ok()).await?;
    Ok(())
}

async fn run_doctor(client: OllamaClient, config: Config) -> Result<()> {
    println!("{}", "Running diagnostics...".cyan());
    let doctor = Doctor::new(client, config);
    let checks = doctor.run_diagnostics().await;
    if Doctor::report(&checks) {
        println!("{}", "All checks passed".green());
        Ok(())
    } else {
        anyhow::bail!("some checks failed")
    }
}
