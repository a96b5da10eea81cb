pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod logger;
pub mod models;
pub mod prompts;
pub mod rag;
pub mod summarize;
