pub mod error;
pub mod model_config;
pub mod training_example;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent PATCH field (outer `None`) from an explicit JSON
/// null (`Some(None)`), which serde's plain `Option` collapses.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
