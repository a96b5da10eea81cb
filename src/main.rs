use std::sync::Arc;

use anyhow::Result;

use ledger_rag::api::{self, AppState};
use ledger_rag::config::Settings;
use ledger_rag::ingest::SyncOptions;
use ledger_rag::llm::ChatCompletionClient;
use ledger_rag::logger;
use ledger_rag::rag::embeddings::EmbeddingGenerator;
use ledger_rag::rag::vector_store::VectorStore;
use ledger_rag::rag::RAGEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    logger::init();

    tracing::info!("Embedding model: {}", settings.embedding_model);
    tracing::info!("Chat model: {}", settings.chat_model);
    tracing::info!(
        "Vector index: {} at {}",
        settings.vector_index_name,
        settings.qdrant_url
    );

    let embeddings = EmbeddingGenerator::new(
        settings.openai_base_url.clone(),
        settings.openai_api_key.clone(),
        settings.embedding_model.clone(),
    );
    let vector_store = VectorStore::new(
        &settings.qdrant_url,
        settings.qdrant_api_key.clone(),
        &settings.vector_index_name,
        settings.embedding_dimension,
    )?;
    let llm = ChatCompletionClient::new(
        settings.openai_base_url.clone(),
        settings.openai_api_key.clone(),
        settings.chat_model.clone(),
    );

    let state = Arc::new(AppState {
        rag_engine: RAGEngine::new(Arc::new(embeddings), Arc::new(vector_store)),
        llm: Arc::new(llm),
        sync_options: SyncOptions::default(),
    });

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
