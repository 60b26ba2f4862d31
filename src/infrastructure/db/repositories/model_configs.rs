use crate::domain::error::{AppError, Result};
use crate::domain::model_config::{BaseModel, ModelConfig, ModelConfigInput, ModelConfigPatch};
use sqlx::sqlite::SqlitePool;

use super::super::connection::Database;

pub struct ModelConfigRepository {
    pool: SqlitePool,
}

impl ModelConfigRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn insert(&self, input: &ModelConfigInput) -> Result<ModelConfig> {
        let base_model: BaseModel = input.base_model.parse()?;

        let result = sqlx::query(
            "INSERT INTO model_configs (model_name, base_model, user_id) VALUES (?, ?, ?)",
        )
        .bind(&input.model_name)
        .bind(base_model.as_str())
        .bind(input.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert model config: {e}")))?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<ModelConfig> {
        let row = sqlx::query_as::<_, ModelConfigEntity>(
            "SELECT id, model_name, base_model, user_id, file_id, fine_tune_id, \
             fine_tuned_model, status, created_at FROM model_configs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch model config: {e}")))?;

        match row {
            Some(entity) => entity.try_into(),
            None => Err(AppError::NotFound(format!("Model config not found: {}", id))),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<ModelConfig>> {
        let rows = sqlx::query_as::<_, ModelConfigEntity>(
            "SELECT id, model_name, base_model, user_id, file_id, fine_tune_id, \
             fine_tuned_model, status, created_at FROM model_configs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list model configs: {e}")))?;

        rows.into_iter().map(|e| e.try_into()).collect()
    }

    pub async fn update(&self, id: i64, input: &ModelConfigInput) -> Result<ModelConfig> {
        let base_model: BaseModel = input.base_model.parse()?;

        let result = sqlx::query(
            "UPDATE model_configs SET model_name = ?, base_model = ?, user_id = ? WHERE id = ?",
        )
        .bind(&input.model_name)
        .bind(base_model.as_str())
        .bind(input.user_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update model config: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Model config not found: {}", id)));
        }

        self.get(id).await
    }

    pub async fn patch(&self, id: i64, patch: &ModelConfigPatch) -> Result<ModelConfig> {
        let current = self.get(id).await?;

        let base_model = match &patch.base_model {
            Some(raw) => raw.parse::<BaseModel>()?,
            None => current.base_model,
        };

        // Outer None keeps the current value; Some(None) clears the column.
        sqlx::query(
            "UPDATE model_configs SET model_name = ?, base_model = ?, user_id = ?, \
             file_id = ?, fine_tune_id = ?, fine_tuned_model = ?, status = ? WHERE id = ?",
        )
        .bind(patch.model_name.as_ref().unwrap_or(&current.model_name))
        .bind(base_model.as_str())
        .bind(patch.user_id.unwrap_or(current.user_id))
        .bind(patch.file_id.clone().unwrap_or(current.file_id))
        .bind(patch.fine_tune_id.clone().unwrap_or(current.fine_tune_id))
        .bind(
            patch
                .fine_tuned_model
                .clone()
                .unwrap_or(current.fine_tuned_model),
        )
        .bind(patch.status.clone().unwrap_or(current.status))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to patch model config: {e}")))?;

        self.get(id).await
    }

    /// Cascades to the owned training examples (enforced by the schema).
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM model_configs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete model config: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Model config not found: {}", id)));
        }

        Ok(())
    }

    pub async fn set_file_id(&self, id: i64, file_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE model_configs SET file_id = ? WHERE id = ?")
            .bind(file_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store file id: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Model config not found: {}", id)));
        }

        Ok(())
    }

    pub async fn set_fine_tune_id(&self, id: i64, fine_tune_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE model_configs SET fine_tune_id = ? WHERE id = ?")
            .bind(fine_tune_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store fine-tune id: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Model config not found: {}", id)));
        }

        Ok(())
    }

    pub async fn set_fine_tune_result(
        &self,
        id: i64,
        status: Option<&str>,
        fine_tuned_model: Option<&str>,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE model_configs SET status = ?, fine_tuned_model = ? WHERE id = ?")
                .bind(status)
                .bind(fine_tuned_model)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to store fine-tune result: {e}"))
                })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Model config not found: {}", id)));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ModelConfigEntity {
    id: i64,
    model_name: String,
    base_model: String,
    user_id: Option<i64>,
    file_id: Option<String>,
    fine_tune_id: Option<String>,
    fine_tuned_model: Option<String>,
    status: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ModelConfigEntity> for ModelConfig {
    type Error = AppError;

    fn try_from(entity: ModelConfigEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            model_name: entity.model_name,
            base_model: entity.base_model.parse()?,
            user_id: entity.user_id,
            file_id: entity.file_id,
            fine_tune_id: entity.fine_tune_id,
            fine_tuned_model: entity.fine_tuned_model,
            status: entity.status,
            created_at: Some(entity.created_at),
        })
    }
}
