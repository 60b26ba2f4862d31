use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::connection::Database;
use crate::infrastructure::db::repositories::{ModelConfigRepository, TrainingExampleRepository};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub file_name: String,
    pub lines: usize,
    pub file_size: u64,
}

/// Writes a model's training examples as a line-delimited JSON training file.
///
/// The file name is derived from the model config id, so repeated exports for
/// one model overwrite the same file. The caller owns the file afterwards and
/// is expected to delete it once consumed.
pub struct TrainingFileExporter {
    configs: ModelConfigRepository,
    examples: TrainingExampleRepository,
    export_dir: PathBuf,
}

impl TrainingFileExporter {
    pub fn new(db: &Database, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            configs: ModelConfigRepository::new(db),
            examples: TrainingExampleRepository::new(db),
            export_dir: export_dir.into(),
        }
    }

    pub fn file_name(model_config_id: i64) -> String {
        format!("fine_tune_{model_config_id}.jsonl")
    }

    pub fn file_path(&self, model_config_id: i64) -> PathBuf {
        self.export_dir.join(Self::file_name(model_config_id))
    }

    pub async fn export(&self, model_config_id: i64) -> Result<ExportSummary> {
        // NotFound must surface before anything touches the filesystem.
        self.configs.get(model_config_id).await?;

        let examples = self.examples.list_for_model(model_config_id).await?;

        fs::create_dir_all(&self.export_dir)
            .map_err(|e| AppError::ExportError(format!("Failed to create export dir: {e}")))?;

        let path = self.file_path(model_config_id);
        let lines = write_training_file(&path, &examples)?;

        let file_size = fs::metadata(&path)
            .map_err(|e| AppError::ExportError(format!("Failed to stat training file: {e}")))?
            .len();

        info!(
            model_config_id,
            lines, file_size, "Exported training file"
        );

        Ok(ExportSummary {
            file_name: Self::file_name(model_config_id),
            lines,
            file_size,
        })
    }
}

fn write_training_file(
    path: &Path,
    examples: &[crate::domain::training_example::TrainingExample],
) -> Result<usize> {
    let file = File::create(path)
        .map_err(|e| AppError::ExportError(format!("Failed to create training file: {e}")))?;
    let mut writer = BufWriter::new(file);

    for example in examples {
        // The provider expects a trailing newline inside both values.
        let record = json!({
            "prompt": format!("{}\n", example.prompt),
            "completion": format!("{}\n", example.completion),
        });
        writeln!(writer, "{record}")
            .map_err(|e| AppError::ExportError(format!("Failed to write training line: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::ExportError(format!("Failed to flush training file: {e}")))?;

    Ok(examples.len())
}
