use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: i64,
    pub model_config_id: i64,
    pub prompt: String,
    pub completion: String,
    pub user_id: Option<i64>,
    pub is_fine_tuned: bool,
    pub will_be_fine_tuned: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExampleInput {
    pub model_config_id: i64,
    pub prompt: String,
    pub completion: String,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub is_fine_tuned: bool,
    #[serde(default)]
    pub will_be_fine_tuned: bool,
}

/// Partial update for PATCH. Absent fields keep their current value; user_id
/// is nullable and accepts an explicit JSON null to clear it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingExamplePatch {
    pub model_config_id: Option<i64>,
    pub prompt: Option<String>,
    pub completion: Option<String>,
    #[serde(default, deserialize_with = "crate::domain::double_option")]
    pub user_id: Option<Option<i64>>,
    pub is_fine_tuned: Option<bool>,
    pub will_be_fine_tuned: Option<bool>,
}
