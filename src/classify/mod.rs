//! Classification domain: remote food/allergen inference.
//!
//! Public API:
//!   - `Classifier`: the seam the pipeline calls through
//!   - `HttpClassifier`: the real client (client.rs)
//!   - wire types (types.rs)

mod client;
pub mod types;

pub use client::HttpClassifier;
pub use types::{ClassificationRequest, ClassificationResult};

/// Why a classification call produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("prediction request failed: {0}")]
    Network(String),

    #[error("prediction endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("prediction response was malformed: {0}")]
    Malformed(String),
}

/// Sends one image to the inference service. Exactly one round-trip per
/// call; implementations must not retry.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        identity: &str,
        raw_payload: &str,
        known_allergens: &[String],
    ) -> Result<ClassificationResult, ClassificationError>;
}
