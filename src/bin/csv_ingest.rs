use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use ledger_rag::config::Settings;
use ledger_rag::ingest::{self, csv_loader, SyncOptions, BATCH_SIZE};
use ledger_rag::models::BatchStatus;
use ledger_rag::rag::embeddings::EmbeddingGenerator;
use ledger_rag::rag::vector_store::VectorStore;
use ledger_rag::rag::RAGEngine;

#[derive(Parser, Debug)]
#[command(name = "csv-ingest")]
#[command(about = "Ingest a CSV file of transactions into the vector index")]
struct Args {
    /// CSV file to ingest
    #[arg(short, long)]
    file: PathBuf,

    /// Rows per upsert batch
    #[arg(long, default_value_t = BATCH_SIZE)]
    batch_size: usize,

    /// Pause between batches in milliseconds
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    ledger_rag::logger::init();

    let args = Args::parse();

    if !args.file.is_file() {
        anyhow::bail!("File does not exist: {}", args.file.display());
    }

    let source = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.display().to_string());

    println!("Reading {}...", args.file.display());
    let documents = csv_loader::load_file(&args.file, &source)?;
    println!("Found {} rows", documents.len());

    if documents.is_empty() {
        println!("Nothing to ingest. Exiting.");
        return Ok(());
    }

    println!(
        "Connecting to {} at {}...",
        settings.vector_index_name, settings.qdrant_url
    );
    let engine = RAGEngine::new(
        Arc::new(EmbeddingGenerator::new(
            settings.openai_base_url.clone(),
            settings.openai_api_key.clone(),
            settings.embedding_model.clone(),
        )),
        Arc::new(VectorStore::new(
            &settings.qdrant_url,
            settings.qdrant_api_key.clone(),
            &settings.vector_index_name,
            settings.embedding_dimension,
        )?),
    );

    let options = SyncOptions {
        batch_size: args.batch_size,
        delay: Duration::from_millis(args.delay_ms),
    };

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let results = ingest::sync_documents(&engine, &documents, &options, |result| {
        pb.set_message(format!("batch {}", result.batch));
        pb.inc(result.documents as u64);
    })
    .await;

    pb.finish_with_message("done");

    let summary = ingest::summarize(&results);
    println!("\nIngest complete!");
    println!("  Rows:        {}", summary.total_documents);
    println!("  Batches:     {}/{} succeeded", summary.successful_batches, summary.total_batches);
    println!("  Collection:  {}", settings.vector_index_name);

    let failed: Vec<_> = results
        .iter()
        .filter(|r| r.status == BatchStatus::Error)
        .collect();
    if !failed.is_empty() {
        println!("\nFailed batches:");
        for result in failed {
            println!(
                "  batch {}: {}",
                result.batch,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}
