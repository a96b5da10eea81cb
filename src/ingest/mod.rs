pub mod csv_loader;

use std::time::Duration;

use chrono::Utc;

use crate::models::{BatchResult, BatchStatus, Document, SyncSummary};
use crate::rag::RAGEngine;

pub const BATCH_SIZE: usize = 50;
pub const BATCH_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            delay: BATCH_DELAY,
        }
    }
}

/// Upsert `documents` batch by batch, sleeping `options.delay` between
/// batches. A failed batch is recorded and the loop moves on.
///
/// `on_batch` is called after every batch, in order.
pub async fn sync_documents<F>(
    engine: &RAGEngine,
    documents: &[Document],
    options: &SyncOptions,
    mut on_batch: F,
) -> Vec<BatchResult>
where
    F: FnMut(&BatchResult),
{
    let batch_size = options.batch_size.max(1);
    let total_batches = documents.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(total_batches);

    for (i, batch) in documents.chunks(batch_size).enumerate() {
        if i > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        let number = i + 1;
        let result = match engine.add_documents(batch).await {
            Ok(()) => {
                tracing::info!("Batch {}/{}: {} documents stored", number, total_batches, batch.len());
                BatchResult {
                    batch: number,
                    documents: batch.len(),
                    status: BatchStatus::Success,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Batch {}/{} failed: {:#}", number, total_batches, e);
                BatchResult {
                    batch: number,
                    documents: batch.len(),
                    status: BatchStatus::Error,
                    error: Some(format!("{:#}", e)),
                }
            }
        };

        on_batch(&result);
        results.push(result);
    }

    results
}

pub fn summarize(results: &[BatchResult]) -> SyncSummary {
    let successful_batches = results
        .iter()
        .filter(|r| r.status == BatchStatus::Success)
        .count();

    SyncSummary {
        total_documents: results.iter().map(|r| r.documents).sum(),
        total_batches: results.len(),
        successful_batches,
        failed_batches: results.len() - successful_batches,
        processed_at: Utc::now(),
    }
}
