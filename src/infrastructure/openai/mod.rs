use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde_json::{json, Value};
use std::path::Path;

/// Seam over the external fine-tuning provider. Raw responses are passed
/// through untouched so the HTTP surface can return them as-is.
#[async_trait]
pub trait FineTuneProvider {
    async fn upload_file(&self, path: &Path, purpose: &str) -> Result<Value>;
    async fn create_fine_tune(&self, training_file: Option<&str>, model: &str) -> Result<Value>;
    async fn retrieve_fine_tune(&self, fine_tune_id: &str) -> Result<Value>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Failed to parse JSON: {e}")))
    }
}

#[async_trait]
impl FineTuneProvider for OpenAiClient {
    async fn upload_file(&self, path: &Path, purpose: &str) -> Result<Value> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "training.jsonl".to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::ProviderError(format!("Failed to read training file: {e}")))?;

        let form = multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.url("files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Request failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn create_fine_tune(&self, training_file: Option<&str>, model: &str) -> Result<Value> {
        // No local pre-validation: a missing training_file is omitted from the
        // body and the provider's rejection is surfaced to the caller.
        let mut body = json!({ "model": model });
        if let Some(file_id) = training_file {
            body["training_file"] = json!(file_id);
        }

        let response = self
            .client
            .post(self.url("fine-tunes"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Request failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn retrieve_fine_tune(&self, fine_tune_id: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.url(&format!("fine-tunes/{fine_tune_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Request failed: {e}")))?;

        Self::read_json(response).await
    }
}
