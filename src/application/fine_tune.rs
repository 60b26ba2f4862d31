use crate::application::exporter::TrainingFileExporter;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::connection::Database;
use crate::infrastructure::db::repositories::ModelConfigRepository;
use crate::infrastructure::openai::FineTuneProvider;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

const UPLOAD_PURPOSE: &str = "fine-tune";

/// Drives the provider's fine-tuning workflow and persists returned
/// identifiers onto the model config row.
///
/// Each operation is a plain read-modify-write: no row locking, so concurrent
/// calls against the same id are last-write-wins.
pub struct FineTuneService {
    configs: ModelConfigRepository,
    exporter: Arc<TrainingFileExporter>,
    provider: Arc<dyn FineTuneProvider + Send + Sync>,
}

impl FineTuneService {
    pub fn new(
        db: &Database,
        exporter: Arc<TrainingFileExporter>,
        provider: Arc<dyn FineTuneProvider + Send + Sync>,
    ) -> Self {
        Self {
            configs: ModelConfigRepository::new(db),
            exporter,
            provider,
        }
    }

    pub async fn upload_training_file(&self, model_config_id: i64) -> Result<Value> {
        self.configs.get(model_config_id).await?;

        let summary = self.exporter.export(model_config_id).await?;
        let path = self.exporter.file_path(model_config_id);

        let response = self.provider.upload_file(&path, UPLOAD_PURPOSE).await?;

        let file_id = response["id"].as_str().ok_or_else(|| {
            AppError::ProviderError("Upload response is missing a file id".to_string())
        })?;
        self.configs.set_file_id(model_config_id, file_id).await?;

        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!(model_config_id, error = %e, "Failed to remove local training file");
            }
        }

        info!(
            model_config_id,
            file_id,
            lines = summary.lines,
            "Uploaded training file"
        );

        Ok(response)
    }

    pub async fn create_fine_tune(&self, model_config_id: i64) -> Result<Value> {
        let config = self.configs.get(model_config_id).await?;

        let response = self
            .provider
            .create_fine_tune(config.file_id.as_deref(), config.base_model.as_str())
            .await?;

        let fine_tune_id = response["id"].as_str().ok_or_else(|| {
            AppError::ProviderError("Create response is missing a fine-tune id".to_string())
        })?;
        self.configs
            .set_fine_tune_id(model_config_id, fine_tune_id)
            .await?;

        info!(model_config_id, fine_tune_id, "Created fine-tune job");

        Ok(response)
    }

    pub async fn retrieve_fine_tune(&self, model_config_id: i64) -> Result<Value> {
        let config = self.configs.get(model_config_id).await?;

        // No stored job id is not pre-validated locally; the provider rejects
        // the resulting request and that rejection is surfaced.
        let fine_tune_id = config.fine_tune_id.unwrap_or_default();

        let response = self.provider.retrieve_fine_tune(&fine_tune_id).await?;

        let status = response["status"].as_str();
        let fine_tuned_model = response["fine_tuned_model"].as_str();
        self.configs
            .set_fine_tune_result(model_config_id, status, fine_tuned_model)
            .await?;

        info!(model_config_id, ?status, "Retrieved fine-tune job");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model_config::ModelConfigInput;
    use crate::domain::training_example::TrainingExampleInput;
    use crate::infrastructure::db::repositories::TrainingExampleRepository;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockProvider {
        upload_response: Option<Value>,
        create_response: Option<Value>,
        retrieve_response: Option<Value>,
        create_calls: Mutex<Vec<(Option<String>, String)>>,
        retrieve_calls: Mutex<Vec<String>>,
        uploaded_paths: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl FineTuneProvider for MockProvider {
        async fn upload_file(&self, path: &Path, purpose: &str) -> Result<Value> {
            assert_eq!(purpose, "fine-tune");
            assert!(path.exists(), "upload must see the exported file");
            self.uploaded_paths.lock().unwrap().push(path.to_path_buf());
            self.upload_response
                .clone()
                .ok_or_else(|| AppError::ProviderError("upload refused".to_string()))
        }

        async fn create_fine_tune(
            &self,
            training_file: Option<&str>,
            model: &str,
        ) -> Result<Value> {
            self.create_calls
                .lock()
                .unwrap()
                .push((training_file.map(str::to_string), model.to_string()));
            self.create_response
                .clone()
                .ok_or_else(|| AppError::ProviderError("create refused".to_string()))
        }

        async fn retrieve_fine_tune(&self, fine_tune_id: &str) -> Result<Value> {
            self.retrieve_calls
                .lock()
                .unwrap()
                .push(fine_tune_id.to_string());
            self.retrieve_response
                .clone()
                .ok_or_else(|| AppError::ProviderError("retrieve refused".to_string()))
        }
    }

    struct Harness {
        db: Database,
        configs: ModelConfigRepository,
        exporter: Arc<TrainingFileExporter>,
        _dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        let db = Database::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(TrainingFileExporter::new(&db, dir.path()));
        let configs = ModelConfigRepository::new(&db);
        Harness {
            db,
            configs,
            exporter,
            _dir: dir,
        }
    }

    impl Harness {
        fn service(&self, provider: Arc<MockProvider>) -> FineTuneService {
            FineTuneService::new(&self.db, self.exporter.clone(), provider)
        }

        async fn insert_config(&self, base_model: &str) -> i64 {
            self.configs
                .insert(&ModelConfigInput {
                    model_name: "support-bot".to_string(),
                    base_model: base_model.to_string(),
                    user_id: None,
                })
                .await
                .unwrap()
                .id
        }

        async fn insert_example(&self, model_config_id: i64, prompt: &str, completion: &str) {
            TrainingExampleRepository::new(&self.db)
                .insert(&TrainingExampleInput {
                    model_config_id,
                    prompt: prompt.to_string(),
                    completion: completion.to_string(),
                    user_id: None,
                    is_fine_tuned: false,
                    will_be_fine_tuned: false,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn upload_stores_file_id_and_removes_local_file() {
        let h = harness().await;
        let id = h.insert_config("curie").await;
        h.insert_example(id, "p", "c").await;

        let provider = Arc::new(MockProvider {
            upload_response: Some(json!({"id": "file-123", "status": "uploaded"})),
            ..Default::default()
        });
        let service = h.service(provider);

        let response = service.upload_training_file(id).await.unwrap();
        assert_eq!(response["id"], "file-123");

        let config = h.configs.get(id).await.unwrap();
        assert_eq!(config.file_id.as_deref(), Some("file-123"));
        assert!(!h.exporter.file_path(id).exists());
    }

    #[tokio::test]
    async fn upload_failure_leaves_file_id_unchanged() {
        let h = harness().await;
        let id = h.insert_config("curie").await;
        h.insert_example(id, "p", "c").await;

        let service = h.service(Arc::new(MockProvider::default()));

        let err = service.upload_training_file(id).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderError(_)));
        assert!(h.configs.get(id).await.unwrap().file_id.is_none());
    }

    #[tokio::test]
    async fn upload_missing_config_is_not_found() {
        let h = harness().await;
        let service = h.service(Arc::new(MockProvider::default()));
        let err = service.upload_training_file(404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_sends_stored_file_id_and_base_model() {
        let h = harness().await;
        let id = h.insert_config("davinci").await;
        h.configs.set_file_id(id, "file-xyz").await.unwrap();

        let provider = Arc::new(MockProvider {
            create_response: Some(json!({"id": "ft-456"})),
            ..Default::default()
        });
        let service = h.service(provider.clone());

        service.create_fine_tune(id).await.unwrap();

        let calls = provider.create_calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[(Some("file-xyz".to_string()), "davinci".to_string())]
        );
        drop(calls);

        let config = h.configs.get(id).await.unwrap();
        assert_eq!(config.fine_tune_id.as_deref(), Some("ft-456"));
    }

    #[tokio::test]
    async fn create_without_upload_still_issues_the_call() {
        let h = harness().await;
        let id = h.insert_config("ada").await;

        let service = h.service(Arc::new(MockProvider::default()));
        let err = service.create_fine_tune(id).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderError(_)));
    }

    #[tokio::test]
    async fn retrieve_updates_status_and_model_name_only() {
        let h = harness().await;
        let id = h.insert_config("curie").await;
        h.configs.set_file_id(id, "file-1").await.unwrap();
        h.configs.set_fine_tune_id(id, "ft-1").await.unwrap();

        let provider = Arc::new(MockProvider {
            retrieve_response: Some(json!({
                "id": "ft-1",
                "status": "succeeded",
                "fine_tuned_model": "curie:ft-2023",
            })),
            ..Default::default()
        });
        let service = h.service(provider.clone());

        service.retrieve_fine_tune(id).await.unwrap();

        assert_eq!(
            provider.retrieve_calls.lock().unwrap().as_slice(),
            &["ft-1".to_string()]
        );

        let config = h.configs.get(id).await.unwrap();
        assert_eq!(config.status.as_deref(), Some("succeeded"));
        assert_eq!(config.fine_tuned_model.as_deref(), Some("curie:ft-2023"));
        assert_eq!(config.file_id.as_deref(), Some("file-1"));
        assert_eq!(config.fine_tune_id.as_deref(), Some("ft-1"));
        assert_eq!(config.model_name, "support-bot");
    }

    #[tokio::test]
    async fn full_workflow_against_mock_provider() {
        let h = harness().await;
        let id = h.insert_config("curie").await;
        h.insert_example(id, "Q: sky?", "A: blue").await;
        h.insert_example(id, "Q: grass?", "A: green").await;

        let summary = h.exporter.export(id).await.unwrap();
        assert_eq!(summary.lines, 2);

        let provider = Arc::new(MockProvider {
            upload_response: Some(json!({"id": "file-123"})),
            create_response: Some(json!({"id": "ft-456"})),
            retrieve_response: Some(json!({"status": "succeeded"})),
            ..Default::default()
        });
        let service = h.service(provider);

        service.upload_training_file(id).await.unwrap();
        assert_eq!(
            h.configs.get(id).await.unwrap().file_id.as_deref(),
            Some("file-123")
        );

        service.create_fine_tune(id).await.unwrap();
        assert_eq!(
            h.configs.get(id).await.unwrap().fine_tune_id.as_deref(),
            Some("ft-456")
        );

        service.retrieve_fine_tune(id).await.unwrap();
        assert_eq!(
            h.configs.get(id).await.unwrap().status.as_deref(),
            Some("succeeded")
        );
    }
}
