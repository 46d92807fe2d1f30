use serde::{Deserialize, Serialize};

use super::enums::UserGender;

/// Body of `runInference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub gender: UserGender,
    pub age: u32,
    pub complaints: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub diagnosis: String,
    #[serde(default)]
    pub recommendations: String,
}
