//! Upload orchestrator: one submit cycle at a time.
//!
//! submit: guard → Busy → first staged preview → classify → record history
//! → clear selection → Idle.
//!
//! The Busy flag is released by a drop guard, so every exit path returns
//! to Idle, including a caller dropping the `submit` future on timeout.
//! Nothing here waits on a pending preview or retries a failed call.

use crate::classify::{ClassificationError, ClassificationResult, Classifier, HttpClassifier};
use crate::config::ServiceConfig;
use crate::history::{HistoryRecord, HistoryStore, HttpHistoryStore, RecordError, RecordId};
use crate::intake::{EncodeError, PreviewState, SelectionStore};
use crate::session::Session;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Busy,
}

/// Why a cycle ended before anything was recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationFailure {
    #[error("preview is still being encoded")]
    PreviewPending,

    #[error("preview unavailable: {0}")]
    PreviewFailed(EncodeError),

    #[error(transparent)]
    Client(ClassificationError),
}

/// Terminal result of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Classified and recorded; the selection has been cleared.
    Success {
        result: ClassificationResult,
        record_id: RecordId,
    },
    /// Nothing was recorded; the selection is untouched.
    ClassificationFailed(ClassificationFailure),
    /// Classified, but the history store refused the record. The selection
    /// is untouched and `record` can be re-sent on its own.
    RecordFailed {
        result: ClassificationResult,
        record: HistoryRecord,
        error: RecordError,
    },
    /// Nothing staged.
    NoSelection,
    /// Another cycle is in flight.
    AlreadyBusy,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::ClassificationFailed(_) => "classification_failed",
            Self::RecordFailed { .. } => "record_failed",
            Self::NoSelection => "no_selection",
            Self::AlreadyBusy => "already_busy",
        }
    }
}

/// Resets the Busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct UploadOrchestrator {
    selection: Arc<SelectionStore>,
    classifier: Arc<dyn Classifier>,
    history: Arc<dyn HistoryStore>,
    busy: AtomicBool,
}

impl UploadOrchestrator {
    pub fn new(
        selection: Arc<SelectionStore>,
        classifier: Arc<dyn Classifier>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            selection,
            classifier,
            history,
            busy: AtomicBool::new(false),
        }
    }

    /// Wire the HTTP clients for a backend, sharing one connection pool,
    /// around a fresh selection store.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    pub fn with_http_client(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self::new(
            Arc::new(SelectionStore::new()),
            Arc::new(HttpClassifier::with_client(client.clone(), config)),
            Arc::new(HttpHistoryStore::with_client(client, config)),
        )
    }

    pub fn selection(&self) -> &Arc<SelectionStore> {
        &self.selection
    }

    pub fn state(&self) -> OrchestratorState {
        if self.busy.load(Ordering::Acquire) {
            OrchestratorState::Busy
        } else {
            OrchestratorState::Idle
        }
    }

    fn try_claim(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    /// Run one classification cycle on the first staged image.
    ///
    /// `known_allergens` is passed through to the classifier unchanged.
    pub async fn submit(&self, session: &Session, known_allergens: &[String]) -> SubmitOutcome {
        if self.selection.is_empty() {
            log::info!("[PIPELINE] Submit rejected: nothing staged");
            return SubmitOutcome::NoSelection;
        }
        let Some(_busy) = self.try_claim() else {
            log::warn!("[PIPELINE] Submit rejected: a cycle is already in flight");
            return SubmitOutcome::AlreadyBusy;
        };

        let outcome = self.run_cycle(session, known_allergens).await;
        log::info!("[PIPELINE] Cycle finished: {}", outcome.label());
        outcome
    }

    async fn run_cycle(&self, session: &Session, known_allergens: &[String]) -> SubmitOutcome {
        let cycle_start = std::time::Instant::now();

        let Some(item) = self.selection.first() else {
            return SubmitOutcome::NoSelection;
        };

        let preview = match item.preview() {
            PreviewState::Ready(encoded) => encoded,
            PreviewState::Pending => {
                log::warn!("[PIPELINE] '{}' has no preview yet", item.name());
                return SubmitOutcome::ClassificationFailed(ClassificationFailure::PreviewPending);
            }
            PreviewState::Failed(e) => {
                log::warn!("[PIPELINE] '{}' has no usable preview: {}", item.name(), e);
                return SubmitOutcome::ClassificationFailed(ClassificationFailure::PreviewFailed(e));
            }
        };
        log::info!(
            "[PIPELINE] Submitting '{}' ({}) for user {}",
            item.name(),
            item.id(),
            session.user_id
        );

        let classify_start = std::time::Instant::now();
        let result = match self
            .classifier
            .classify(&session.user_id, preview.payload(), known_allergens)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                log::error!("[PIPELINE] Classification failed: {}", e);
                return SubmitOutcome::ClassificationFailed(ClassificationFailure::Client(e));
            }
        };
        let classify_ms = classify_start.elapsed().as_millis();

        let record = HistoryRecord::from_classification(preview.data_uri(), &result);
        let record_start = std::time::Instant::now();
        let record_id = match self.history.record(&session.token, &record).await {
            Ok(id) => id,
            Err(error) => {
                log::error!(
                    "[PIPELINE] Classified as '{}' but recording failed: {}",
                    result.food_name,
                    error
                );
                return SubmitOutcome::RecordFailed {
                    result,
                    record,
                    error,
                };
            }
        };
        let record_ms = record_start.elapsed().as_millis();

        self.selection.clear();
        log::info!(
            "[PIPELINE] Total: {}ms (classify={} + record={})",
            cycle_start.elapsed().as_millis(),
            classify_ms,
            record_ms
        );
        SubmitOutcome::Success { result, record_id }
    }
}
