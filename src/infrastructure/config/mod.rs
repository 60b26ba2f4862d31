use crate::domain::error::{AppError, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime settings. Loaded from an optional `FineTuneAdmin.toml` with
/// `FINETUNE_*` environment variables taking precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub export_dir: PathBuf,
    pub http_host: String,
    pub http_port: u16,
    pub auth_token: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("finetune_admin.db"),
            export_dir: PathBuf::from("exports"),
            http_host: "127.0.0.1".to_string(),
            http_port: 8000,
            auth_token: String::new(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("FineTuneAdmin.toml"))
            .merge(Env::prefixed("FINETUNE_"))
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {e}")))?;

        if settings.openai_api_key.is_empty() {
            return Err(AppError::ConfigError(
                "FINETUNE_OPENAI_API_KEY is required".to_string(),
            ));
        }
        if settings.auth_token.is_empty() {
            return Err(AppError::ConfigError(
                "FINETUNE_AUTH_TOKEN is required".to_string(),
            ));
        }

        Ok(settings)
    }
}
