use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tempfile::NamedTempFile;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::AppError;
use crate::ingest::{self, csv_loader, SyncOptions};
use crate::llm::ChatModel;
use crate::models::{
    AnalysisResult, ChatAnswer, ChatMetadata, ChatQuery, Document, HealthResponse,
    HealthServices, SyncResponse,
};
use crate::prompts::{self, QueryKind};
use crate::rag::RAGEngine;
use crate::summarize;

pub const DEFAULT_LIMIT: u64 = 4;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const CHAT_SCORE_THRESHOLD: f32 = 0.5;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub struct AppState {
    pub rag_engine: RAGEngine,
    pub llm: Arc<dyn ChatModel>,
    pub sync_options: SyncOptions,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/sync", post(sync_handler))
        .route("/chat", post(chat_handler))
        .route("/summarize", get(summarize_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// Reads the `file` part, refusing anything that is not CSV before its body
/// is consumed.
async fn extract_csv(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(AppError::bad_request)? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or("unknown").to_string();
        if !csv_loader::is_csv_content_type(&content_type) {
            return Err(AppError::UnsupportedFileType(content_type));
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field.bytes().await.map_err(AppError::bad_request)?;
        return Ok(Upload {
            file_name,
            data: data.to_vec(),
        });
    }
    Err(AppError::bad_request("No file uploaded (expected multipart field 'file')"))
}

fn parse_upload(upload: Upload) -> anyhow::Result<Vec<Document>> {
    parse_upload_in(&std::env::temp_dir(), upload)
}

fn parse_upload_in(dir: &Path, upload: Upload) -> anyhow::Result<Vec<Document>> {
    // Removed from disk when `tmp` drops, whatever the parse outcome.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&upload.data)?;
    tmp.flush()?;
    csv_loader::load_file(tmp.path(), &upload.file_name)
}

async fn sync_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::bad_request(e.body_text()))?;
    let upload = extract_csv(&mut multipart).await?;
    let file_name = upload.file_name.clone();
    tracing::info!("Received {} ({} bytes)", file_name, upload.data.len());

    let documents = tokio::task::spawn_blocking(move || parse_upload(upload))
        .await
        .map_err(|e| AppError::Upstream(e.into()))??;

    tracing::info!("Parsed {} rows from {}", documents.len(), file_name);

    let results =
        ingest::sync_documents(&state.rag_engine, &documents, &state.sync_options, |_| {}).await;
    let summary = ingest::summarize(&results);

    let message = if summary.failed_batches == 0 {
        format!("Processed {} documents from {}", summary.total_documents, file_name)
    } else {
        format!(
            "Processed {} documents from {} with {} failed batches",
            summary.total_documents, file_name, summary.failed_batches
        )
    };

    Ok(Json(SyncResponse {
        message,
        results,
        summary,
    }))
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatQuery>, JsonRejection>,
) -> Result<Json<ChatAnswer>, AppError> {
    let request_id = Uuid::new_v4();
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::bad_request("Query must not be empty"));
    }
    let limit = request.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(AppError::bad_request("Limit must be at least 1"));
    }
    let temperature = request.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(AppError::bad_request("Temperature must be between 0 and 2"));
    }

    let matches = state
        .rag_engine
        .retrieve(query, limit, CHAT_SCORE_THRESHOLD)
        .await?;

    let kind = QueryKind::classify(query);
    tracing::info!(
        "Request {}: {} matches, {} prompt",
        request_id,
        matches.len(),
        kind.as_str()
    );

    let context = prompts::format_context(&matches);
    let response = state
        .llm
        .complete(kind.system_prompt(), &prompts::user_prompt(&context, query), temperature)
        .await?;

    Ok(Json(ChatAnswer {
        response,
        metadata: ChatMetadata {
            matches_found: matches.len(),
            scores: matches.iter().map(|m| m.score).collect(),
            query_type: kind.as_str().to_string(),
        },
    }))
}

async fn summarize_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalysisResult>, AppError> {
    let analysis = summarize::summarize(&state.rag_engine, state.llm.as_ref()).await?;
    Ok(Json(analysis))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let llm_healthy = state.llm.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        services: HealthServices { llm: llm_healthy },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(data: &str) -> Upload {
        Upload {
            file_name: "march.csv".to_string(),
            data: data.as_bytes().to_vec(),
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_temp_file_removed_after_parse() {
        let dir = tempfile::tempdir().unwrap();

        let documents = parse_upload_in(dir.path(), upload("date,amount\n2024-01-01,12.50\n")).unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].metadata.source, "march.csv");
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_temp_file_removed_when_parse_fails() {
        let dir = tempfile::tempdir().unwrap();

        let invalid = Upload {
            file_name: "broken.csv".to_string(),
            data: b"date,amount\n\xff\xfe,1\n".to_vec(),
        };
        let result = parse_upload_in(dir.path(), invalid);

        assert!(result.is_err());
        assert_eq!(entries(dir.path()), 0);
    }
}
