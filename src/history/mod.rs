//! History domain: the append-only log of past classifications.
//!
//! Records are created here and never mutated or deleted by this crate.
//! Recording is not idempotent: the same record sent twice is stored twice.

mod client;

pub use client::HttpHistoryStore;

use crate::classify::ClassificationResult;
use serde::{Deserialize, Serialize};

/// Verdict stored with every record.
pub const SAFETY_VERDICT: &str = "This food is safe for you.";

/// Outgoing body of `POST /history`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Full data URI of the submitted photo.
    pub image: String,
    pub food_name: String,
    /// Allergy info joined with `", "`.
    pub allergy_info: String,
    pub safety: String,
    pub warning: String,
}

impl HistoryRecord {
    /// Build the record for a finished classification.
    pub fn from_classification(image_preview: &str, result: &ClassificationResult) -> Self {
        Self {
            image: image_preview.to_string(),
            food_name: result.food_name.clone(),
            allergy_info: result.allergy_info_joined(),
            safety: SAFETY_VERDICT.to_string(),
            warning: result.warning.clone(),
        }
    }
}

/// Acknowledgment id of a stored record. The backend may not return one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordId(Option<String>);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Some(id.into()))
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().unwrap_or("<no id>"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("history request failed: {0}")]
    Network(String),

    #[error("history store rejected the token ({status})")]
    Unauthorized { status: u16 },

    #[error("history store returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Persists history records against a bearer token.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, token: &str, record: &HistoryRecord) -> Result<RecordId, RecordError>;
}
