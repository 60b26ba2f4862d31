use crate::domain::error::{AppError, Result};
use crate::domain::training_example::{
    TrainingExample, TrainingExampleInput, TrainingExamplePatch,
};
use sqlx::sqlite::SqlitePool;

use super::super::connection::Database;

pub struct TrainingExampleRepository {
    pool: SqlitePool,
}

impl TrainingExampleRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn insert(&self, input: &TrainingExampleInput) -> Result<TrainingExample> {
        let result = sqlx::query(
            "INSERT INTO training_examples \
             (model_config_id, prompt, completion, user_id, is_fine_tuned, will_be_fine_tuned) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(input.model_config_id)
        .bind(&input.prompt)
        .bind(&input.completion)
        .bind(input.user_id)
        .bind(input.is_fine_tuned)
        .bind(input.will_be_fine_tuned)
        .execute(&self.pool)
        .await
        .map_err(map_insert_err)?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<TrainingExample> {
        let row = sqlx::query_as::<_, TrainingExampleEntity>(
            "SELECT id, model_config_id, prompt, completion, user_id, \
             is_fine_tuned, will_be_fine_tuned, created_at FROM training_examples WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch training example: {e}")))?;

        match row {
            Some(entity) => Ok(entity.into()),
            None => Err(AppError::NotFound(format!(
                "Training example not found: {}",
                id
            ))),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<TrainingExample>> {
        let rows = sqlx::query_as::<_, TrainingExampleEntity>(
            "SELECT id, model_config_id, prompt, completion, user_id, \
             is_fine_tuned, will_be_fine_tuned, created_at FROM training_examples ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list training examples: {e}")))?;

        Ok(rows.into_iter().map(|e| e.into()).collect())
    }

    pub async fn list_for_model(&self, model_config_id: i64) -> Result<Vec<TrainingExample>> {
        let rows = sqlx::query_as::<_, TrainingExampleEntity>(
            "SELECT id, model_config_id, prompt, completion, user_id, \
             is_fine_tuned, will_be_fine_tuned, created_at FROM training_examples \
             WHERE model_config_id = ?",
        )
        .bind(model_config_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list training examples: {e}")))?;

        Ok(rows.into_iter().map(|e| e.into()).collect())
    }

    pub async fn update(&self, id: i64, input: &TrainingExampleInput) -> Result<TrainingExample> {
        let result = sqlx::query(
            "UPDATE training_examples SET model_config_id = ?, prompt = ?, completion = ?, \
             user_id = ?, is_fine_tuned = ?, will_be_fine_tuned = ? WHERE id = ?",
        )
        .bind(input.model_config_id)
        .bind(&input.prompt)
        .bind(&input.completion)
        .bind(input.user_id)
        .bind(input.is_fine_tuned)
        .bind(input.will_be_fine_tuned)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_insert_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Training example not found: {}",
                id
            )));
        }

        self.get(id).await
    }

    pub async fn patch(&self, id: i64, patch: &TrainingExamplePatch) -> Result<TrainingExample> {
        let current = self.get(id).await?;

        let merged = TrainingExampleInput {
            model_config_id: patch.model_config_id.unwrap_or(current.model_config_id),
            prompt: patch.prompt.clone().unwrap_or(current.prompt),
            completion: patch.completion.clone().unwrap_or(current.completion),
            user_id: patch.user_id.unwrap_or(current.user_id),
            is_fine_tuned: patch.is_fine_tuned.unwrap_or(current.is_fine_tuned),
            will_be_fine_tuned: patch.will_be_fine_tuned.unwrap_or(current.will_be_fine_tuned),
        };

        self.update(id, &merged).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM training_examples WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to delete training example: {e}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Training example not found: {}",
                id
            )));
        }

        Ok(())
    }
}

// A dangling model_config_id trips the schema FK; surface it as a validation
// failure rather than a generic database error.
fn map_insert_err(e: sqlx::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("FOREIGN KEY") {
        AppError::ValidationError("model_config_id does not reference an existing model config".to_string())
    } else {
        AppError::DatabaseError(format!("Failed to write training example: {msg}"))
    }
}

#[derive(sqlx::FromRow)]
struct TrainingExampleEntity {
    id: i64,
    model_config_id: i64,
    prompt: String,
    completion: String,
    user_id: Option<i64>,
    is_fine_tuned: bool,
    will_be_fine_tuned: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<TrainingExampleEntity> for TrainingExample {
    fn from(entity: TrainingExampleEntity) -> Self {
        Self {
            id: entity.id,
            model_config_id: entity.model_config_id,
            prompt: entity.prompt,
            completion: entity.completion,
            user_id: entity.user_id,
            is_fine_tuned: entity.is_fine_tuned,
            will_be_fine_tuned: entity.will_be_fine_tuned,
            created_at: Some(entity.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model_config::ModelConfigInput;
    use crate::infrastructure::db::repositories::ModelConfigRepository;

    async fn setup() -> (Database, ModelConfigRepository, TrainingExampleRepository) {
        let db = Database::connect_in_memory().await.unwrap();
        let configs = ModelConfigRepository::new(&db);
        let examples = TrainingExampleRepository::new(&db);
        (db, configs, examples)
    }

    fn example(model_config_id: i64, prompt: &str, completion: &str) -> TrainingExampleInput {
        TrainingExampleInput {
            model_config_id,
            prompt: prompt.to_string(),
            completion: completion.to_string(),
            user_id: None,
            is_fine_tuned: false,
            will_be_fine_tuned: false,
        }
    }

    async fn insert_config(configs: &ModelConfigRepository) -> i64 {
        configs
            .insert(&ModelConfigInput {
                model_name: "m".to_string(),
                base_model: "curie".to_string(),
                user_id: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn insert_requires_existing_model_config() {
        let (_db, _configs, examples) = setup().await;
        let err = examples.insert(&example(99, "p", "c")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let (_db, configs, examples) = setup().await;
        let config_id = insert_config(&configs).await;

        let created = examples.insert(&example(config_id, "hi", "hello")).await.unwrap();
        assert_eq!(created.prompt, "hi");
        assert!(!created.is_fine_tuned);

        let mut input = example(config_id, "hi", "hello there");
        input.will_be_fine_tuned = true;
        let updated = examples.update(created.id, &input).await.unwrap();
        assert_eq!(updated.completion, "hello there");
        assert!(updated.will_be_fine_tuned);

        examples.delete(created.id).await.unwrap();
        let err = examples.get(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn patch_flips_flags_only() {
        let (_db, configs, examples) = setup().await;
        let config_id = insert_config(&configs).await;
        let created = examples.insert(&example(config_id, "p", "c")).await.unwrap();

        let patch = TrainingExamplePatch {
            is_fine_tuned: Some(true),
            ..Default::default()
        };
        let patched = examples.patch(created.id, &patch).await.unwrap();

        assert!(patched.is_fine_tuned);
        assert_eq!(patched.prompt, "p");
        assert_eq!(patched.completion, "c");
    }

    #[tokio::test]
    async fn deleting_model_config_cascades() {
        let (_db, configs, examples) = setup().await;
        let config_id = insert_config(&configs).await;

        let a = examples.insert(&example(config_id, "p1", "c1")).await.unwrap();
        let b = examples.insert(&example(config_id, "p2", "c2")).await.unwrap();

        configs.delete(config_id).await.unwrap();

        for id in [a.id, b.id] {
            let err = examples.get(id).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
    }
}
