use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_retrieval::application::{IngestionService, SearchEngine};
use rag_retrieval::cli::{Cli, Command};
use rag_retrieval::domain::ports::EmbeddingService;
use rag_retrieval::infrastructure::{
    Config, EmbedderSettings, HfTokenizer, OnnxModel, PersistentVectorStore, SentenceEmbedder,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_index=info,rag_retrieval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let tokenizer = HfTokenizer::from_file(&config.embedding.tokenizer_path)?;
    let model = OnnxModel::from_file(
        &config.embedding.model_path,
        config.embedding.intra_threads,
    )?;
    let embedder: Arc<dyn EmbeddingService> = Arc::new(SentenceEmbedder::new(
        Arc::new(tokenizer),
        Arc::new(model),
        EmbedderSettings::from(&config.embedding),
    )?);

    let store = Arc::new(
        PersistentVectorStore::initialize(&config.store.log_path, embedder.clone()).await?,
    );

    match cli.command {
        Command::Ingest { files } => {
            let ingestion = IngestionService::new(embedder, store.clone())
                .with_max_chunk_chars(config.chunking.max_chunk_chars)
                .with_concurrency(config.ingestion.concurrency);
            for file in &files {
                if let Err(e) = ingest_file(&ingestion, file).await {
                    error!(file = %file.display(), error = %e, "ingestion failed");
                    return Err(e);
                }
            }
        }
        Command::Search { query, limit } => {
            let limit = limit.unwrap_or(config.search.default_limit);
            let engine = SearchEngine::new(embedder, store, config.search.default_limit);
            let results = engine.search(&query, limit).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Compact => {
            let stats = store.compact().await?;
            println!(
                "compacted {}: {} records -> {}",
                store.log_path().display(),
                stats.records_before,
                stats.records_after
            );
        }
    }

    Ok(())
}

async fn ingest_file(ingestion: &IngestionService, path: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let document = ingestion.ingest(&name, &text).await?;
    info!(
        document_id = %document.id,
        name = %document.name,
        chunks = document.chunk_count,
        "ingested file"
    );
    Ok(())
}
