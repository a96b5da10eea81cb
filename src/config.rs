use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime settings, read from `.env` and the process environment.
///
/// Keys are the lowercased environment variable names, so `OPENAI_API_KEY`
/// lands in `openai_api_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: u64,
    pub chat_model: String,
    pub qdrant_url: String,
    #[serde(default)]
    pub qdrant_api_key: Option<String>,
    pub vector_index_name: String,
    pub bind_addr: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("openai_base_url", "https://api.openai.com/v1")?
            .set_default("embedding_model", "text-embedding-3-small")?
            .set_default("embedding_dimension", 1536)?
            .set_default("chat_model", "gpt-4o-mini")?
            .set_default("qdrant_url", "http://localhost:6334")?
            .set_default("vector_index_name", "transactions")?
            .set_default("bind_addr", "0.0.0.0:3000")?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = settings
            .try_deserialize()
            .context("Invalid configuration (is OPENAI_API_KEY set?)")?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY must not be empty");
        }
        if self.vector_index_name.trim().is_empty() {
            anyhow::bail!("VECTOR_INDEX_NAME must not be empty");
        }
        if self.embedding_dimension == 0 {
            anyhow::bail!("EMBEDDING_DIMENSION must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 1536,
            chat_model: "gpt-4o-mini".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            vector_index_name: "transactions".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let mut settings = sample();
        settings.openai_api_key = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut settings = sample();
        settings.embedding_dimension = 0;
        assert!(settings.validate().is_err());
    }
}
