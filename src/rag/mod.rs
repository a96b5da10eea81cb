pub mod embeddings;
pub mod vector_store;

use std::sync::Arc;

use anyhow::Result;

use self::embeddings::Embedder;
use self::vector_store::VectorIndex;
use crate::models::{Document, ScoredMatch};

pub struct RAGEngine {
    embeddings: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorIndex>,
}

impl RAGEngine {
    pub fn new(embeddings: Arc<dyn Embedder>, vector_store: Arc<dyn VectorIndex>) -> Self {
        Self {
            embeddings,
            vector_store,
        }
    }

    /// Embed and upsert one batch of documents.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = self.embeddings.embed_documents(&texts).await?;
        self.vector_store.upsert(documents, vectors).await
    }

    /// Top `limit` matches for `query`, keeping only those scoring at least
    /// `threshold`.
    pub async fn retrieve(&self, query: &str, limit: u64, threshold: f32) -> Result<Vec<ScoredMatch>> {
        let query_embedding = self.embeddings.embed_query(query).await?;
        let results = self.vector_store.search(query_embedding, limit).await?;
        let found = results.len();

        let kept: Vec<ScoredMatch> = results
            .into_iter()
            .filter(|m| m.score >= threshold)
            .collect();

        tracing::debug!(
            "Retrieved {} matches, {} above threshold {}",
            found,
            kept.len(),
            threshold
        );
        Ok(kept)
    }
}
