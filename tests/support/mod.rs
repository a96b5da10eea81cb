#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use ledger_rag::api::AppState;
use ledger_rag::ingest::SyncOptions;
use ledger_rag::llm::ChatModel;
use ledger_rag::models::{Document, DocumentMetadata, ScoredMatch};
use ledger_rag::rag::embeddings::Embedder;
use ledger_rag::rag::vector_store::VectorIndex;
use ledger_rag::rag::RAGEngine;

/// Returns a one-dimensional vector per text. Calls numbered in
/// `fail_on_calls` (1-based) return an error.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub fail_on_calls: Vec<usize>,
}

impl FakeEmbedder {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_calls: calls.to_vec(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_calls.contains(&call) {
            anyhow::bail!("embedding service unavailable");
        }
        Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
    }
}

/// Stores upserted documents and answers searches from a canned list.
#[derive(Default)]
pub struct FakeIndex {
    pub stored: Mutex<Vec<Document>>,
    pub canned: Vec<ScoredMatch>,
    pub last_limit: Mutex<Option<u64>>,
}

impl FakeIndex {
    pub fn with_matches(canned: Vec<ScoredMatch>) -> Self {
        Self {
            canned,
            ..Self::default()
        }
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn upsert(&self, documents: &[Document], embeddings: Vec<Vec<f32>>) -> Result<()> {
        assert_eq!(documents.len(), embeddings.len());
        self.stored.lock().unwrap().extend_from_slice(documents);
        Ok(())
    }

    async fn search(&self, _vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredMatch>> {
        *self.last_limit.lock().unwrap() = Some(limit);
        Ok(self.canned.iter().take(limit as usize).cloned().collect())
    }
}

/// Replies with a fixed answer and records every prompt it receives.
pub struct FakeChat {
    pub reply: String,
    pub prompts: Mutex<Vec<(String, String, f32)>>,
    pub healthy: bool,
}

impl FakeChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    /// Health check fails with an error.
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::replying("ok")
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string(), temperature));
        Ok(self.reply.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        if !self.healthy {
            anyhow::bail!("chat service unreachable");
        }
        Ok(true)
    }
}

pub fn scored(content: &str, score: f32) -> ScoredMatch {
    ScoredMatch {
        document: Document {
            page_content: content.to_string(),
            metadata: DocumentMetadata {
                source: "fixture.csv".to_string(),
                row: 0,
            },
        },
        score,
    }
}

pub fn documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|row| Document {
            page_content: format!("date: 2024-01-01\namount: {}", row),
            metadata: DocumentMetadata {
                source: "fixture.csv".to_string(),
                row: row as u64,
            },
        })
        .collect()
}

pub fn csv_with_rows(n: usize) -> String {
    let mut csv = String::from("date,amount,bank,contact\n");
    for i in 0..n {
        csv.push_str(&format!("2024-01-{:02},{}.00,Chase,Vendor {}\n", (i % 28) + 1, i, i));
    }
    csv
}

pub fn no_delay() -> SyncOptions {
    SyncOptions {
        delay: Duration::ZERO,
        ..SyncOptions::default()
    }
}

pub struct Harness {
    pub embedder: Arc<FakeEmbedder>,
    pub index: Arc<FakeIndex>,
    pub chat: Arc<FakeChat>,
}

impl Harness {
    pub fn new(embedder: FakeEmbedder, index: FakeIndex, chat: FakeChat) -> Self {
        Self {
            embedder: Arc::new(embedder),
            index: Arc::new(index),
            chat: Arc::new(chat),
        }
    }

    pub fn engine(&self) -> RAGEngine {
        RAGEngine::new(self.embedder.clone(), self.index.clone())
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            rag_engine: self.engine(),
            llm: self.chat.clone(),
            sync_options: no_delay(),
        })
    }
}
