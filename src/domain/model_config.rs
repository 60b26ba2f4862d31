use crate::domain::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base models offered by the provider for fine-tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseModel {
    Ada,
    Babbage,
    Curie,
    Davinci,
}

impl BaseModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseModel::Ada => "ada",
            BaseModel::Babbage => "babbage",
            BaseModel::Curie => "curie",
            BaseModel::Davinci => "davinci",
        }
    }
}

impl FromStr for BaseModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ada" => Ok(BaseModel::Ada),
            "babbage" => Ok(BaseModel::Babbage),
            "curie" => Ok(BaseModel::Curie),
            "davinci" => Ok(BaseModel::Davinci),
            other => Err(AppError::ValidationError(format!(
                "Unknown base model: {} (expected one of ada, babbage, curie, davinci)",
                other
            ))),
        }
    }
}

impl fmt::Display for BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: i64,
    pub model_name: String,
    pub base_model: BaseModel,
    pub user_id: Option<i64>,
    pub file_id: Option<String>,
    pub fine_tune_id: Option<String>,
    pub fine_tuned_model: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfigInput {
    pub model_name: String,
    pub base_model: String,
    pub user_id: Option<i64>,
}

/// Partial update for PATCH. Absent fields keep their current value; the
/// nullable fields accept an explicit JSON null to clear the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfigPatch {
    pub model_name: Option<String>,
    pub base_model: Option<String>,
    #[serde(default, deserialize_with = "crate::domain::double_option")]
    pub user_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "crate::domain::double_option")]
    pub file_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::domain::double_option")]
    pub fine_tune_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::domain::double_option")]
    pub fine_tuned_model: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::domain::double_option")]
    pub status: Option<Option<String>>,
}
