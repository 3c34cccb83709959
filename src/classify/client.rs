//! HTTP client for the prediction endpoint.

use super::types::{ClassificationRequest, ClassificationResult};
use super::{ClassificationError, Classifier};
use crate::config::ServiceConfig;
use crate::http::{body_preview, read_body};

/// Talks to `POST {api_base}/prediction`.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Share a connection pool with other clients.
    pub fn with_client(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            url: config.prediction_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        identity: &str,
        raw_payload: &str,
        known_allergens: &[String],
    ) -> Result<ClassificationResult, ClassificationError> {
        let request = ClassificationRequest {
            user_id: identity.to_string(),
            image: raw_payload.to_string(),
            allergies: known_allergens.to_vec(),
        };

        log::info!(
            "[CLASSIFY] POST {} - {} base64 chars, {} known allergen(s)",
            self.url,
            request.image.len(),
            request.allergies.len()
        );
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("[CLASSIFY] HTTP request failed: {}", e);
                ClassificationError::Network(e.to_string())
            })?;

        let (status, body) = read_body(response).await.map_err(|e| {
            log::error!("[CLASSIFY] Failed to read response body: {}", e);
            ClassificationError::Network(e.to_string())
        })?;

        if !status.is_success() {
            log::error!("[CLASSIFY] API returned {}: {}", status, body_preview(&body));
            return Err(ClassificationError::Status {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        let result = serde_json::from_str::<ClassificationResult>(&body).map_err(|e| {
            log::warn!(
                "[CLASSIFY] Failed to parse result: {} - raw: {}",
                e,
                body_preview(&body)
            );
            ClassificationError::Malformed(e.to_string())
        })?;

        log::info!(
            "[CLASSIFY] {}ms - food={}, allergy_info=[{}]",
            start.elapsed().as_millis(),
            result.food_name,
            result.allergy_info_joined()
        );
        Ok(result)
    }
}
