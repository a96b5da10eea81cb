use anyhow::{Context, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::{Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::models::{Document, DocumentMetadata, ScoredMatch};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite one point per document. `embeddings[i]` belongs to
    /// `documents[i]`.
    async fn upsert(&self, documents: &[Document], embeddings: Vec<Vec<f32>>) -> Result<()>;

    /// Nearest neighbours of `vector`, best first.
    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredMatch>>;
}

/// Stable point id for a row, so uploading the same file twice overwrites
/// instead of duplicating.
pub fn document_id(metadata: &DocumentMetadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metadata.source.as_bytes());
    hasher.update(b":");
    hasher.update(metadata.row.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

pub struct VectorStore {
    client: Qdrant,
    collection_name: String,
    dimension: u64,
    ready: OnceCell<()>,
}

impl VectorStore {
    /// Builds the client only; the collection is checked on first use.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection_name: &str,
        dimension: u64,
    ) -> Result<Self> {
        tracing::info!("Building Qdrant client for URL: {}", url);
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .context("Qdrant client build failed")?;

        Ok(Self {
            client,
            collection_name: collection_name.to_string(),
            dimension,
            ready: OnceCell::new(),
        })
    }

    async fn ensure_collection(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                if !self.client.collection_exists(&self.collection_name).await? {
                    tracing::info!(
                        "Creating collection {} ({} dims)",
                        self.collection_name,
                        self.dimension
                    );
                    self.client
                        .create_collection(
                            CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                                VectorParamsBuilder::new(self.dimension, Distance::Cosine),
                            ),
                        )
                        .await?;
                }
                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    async fn upsert(&self, documents: &[Document], embeddings: Vec<Vec<f32>>) -> Result<()> {
        if documents.len() != embeddings.len() {
            anyhow::bail!(
                "Got {} embeddings for {} documents",
                embeddings.len(),
                documents.len()
            );
        }
        if documents.is_empty() {
            return Ok(());
        }
        self.ensure_collection().await?;

        let points: Vec<PointStruct> = documents
            .iter()
            .zip(embeddings)
            .map(|(doc, embedding)| {
                let mut payload = JsonMap::new();
                payload.insert(
                    "page_content".to_string(),
                    JsonValue::String(doc.page_content.clone()),
                );
                payload.insert(
                    "source".to_string(),
                    JsonValue::String(doc.metadata.source.clone()),
                );
                payload.insert("row".to_string(), JsonValue::from(doc.metadata.row));
                PointStruct::new(document_id(&doc.metadata), embedding, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .context("Qdrant upsert failed")?;

        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredMatch>> {
        self.ensure_collection().await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, vector, limit).with_payload(true),
            )
            .await
            .context("Qdrant search failed")?;

        Ok(response.result.into_iter().filter_map(to_match).collect())
    }
}

fn to_match(point: ScoredPoint) -> Option<ScoredMatch> {
    let page_content = point.payload.get("page_content")?.as_str()?.clone();
    let source = point
        .payload
        .get("source")
        .and_then(|v| v.as_str())
        .cloned()
        .unwrap_or_default();
    let row = point
        .payload
        .get("row")
        .and_then(|v| v.as_integer())
        .unwrap_or_default()
        .max(0) as u64;

    Some(ScoredMatch {
        document: Document {
            page_content,
            metadata: DocumentMetadata { source, row },
        },
        score: point.score,
    })
}
