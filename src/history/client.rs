//! HTTP client for the history endpoint.

use super::{HistoryRecord, HistoryStore, RecordError, RecordId};
use crate::config::ServiceConfig;
use crate::http::{body_preview, read_body};
use reqwest::StatusCode;

/// Talks to `POST {api_base}/history`.
#[derive(Debug, Clone)]
pub struct HttpHistoryStore {
    client: reqwest::Client,
    url: String,
}

impl HttpHistoryStore {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            url: config.history_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Pull a record id out of an acknowledgment body: `{"id": ..}`,
/// `{"_id": ..}`, or either nested under `"data"`. Anything else is an
/// anonymous success.
fn parse_record_id(body: &str) -> RecordId {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return RecordId::unknown();
    };
    let find = |v: &serde_json::Value| {
        ["id", "_id"].iter().find_map(|k| match v.get(*k)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };
    find(&json)
        .or_else(|| json.get("data").and_then(find))
        .map(RecordId::new)
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl HistoryStore for HttpHistoryStore {
    async fn record(&self, token: &str, record: &HistoryRecord) -> Result<RecordId, RecordError> {
        log::info!(
            "[HISTORY] POST {} - food={}, allergy_info=[{}]",
            self.url,
            record.food_name,
            record.allergy_info
        );
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                log::error!("[HISTORY] HTTP request failed: {}", e);
                RecordError::Network(e.to_string())
            })?;

        let (status, body) = read_body(response).await.map_err(|e| {
            log::error!("[HISTORY] Failed to read response body: {}", e);
            RecordError::Network(e.to_string())
        })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            log::error!("[HISTORY] Token rejected: {}", status);
            return Err(RecordError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            log::error!("[HISTORY] API returned {}: {}", status, body_preview(&body));
            return Err(RecordError::Status {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        let id = parse_record_id(&body);
        log::info!(
            "[HISTORY] Recorded {} in {}ms",
            id,
            start.elapsed().as_millis()
        );
        Ok(id)
    }
}
