//! Wire types for the prediction endpoint.
//!
//! The backend speaks snake_case JSON. Every response field is required:
//! a body missing any of them does not deserialize, and the client
//! reports it as malformed instead of guessing.

use serde::{Deserialize, Serialize};

/// Outgoing body of `POST /prediction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub user_id: String,
    /// Raw base64 body, without the `data:...;base64,` prefix.
    pub image: String,
    pub allergies: Vec<String>,
}

/// What the inference service says about a food photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationResult {
    #[serde(rename = "food")]
    pub food_name: String,
    pub allergy_info: Vec<String>,
    pub warning: String,
}

impl ClassificationResult {
    /// Allergy info flattened the way the history log stores it.
    pub fn allergy_info_joined(&self) -> String {
        self.allergy_info.join(", ")
    }
}
