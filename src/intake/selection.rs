//! Selection store: the staging area for picked images.
//!
//! Every accepted pick gets a background encode task that fills its preview
//! slot. Each item owns its own `watch` channel, so previews complete in any
//! order without touching each other. Re-triggering an encode bumps the
//! slot's generation; writes from older attempts are ignored.

use super::encoder::{encode, EncodedImage};
use super::{EncodeError, ImageSource, MimeType, RawImage, RejectedTypeError};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Opaque identity of a staged image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagedId(uuid::Uuid);

impl StagedId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for StagedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a staged image's preview currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    Pending,
    Ready(EncodedImage),
    Failed(EncodeError),
}

impl PreviewState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug)]
struct PreviewSlot {
    generation: u64,
    state: PreviewState,
}

/// A snapshot handle onto one staged image.
///
/// Cloning is cheap; the preview is read live from the item's channel.
#[derive(Debug, Clone)]
pub struct StagedImage {
    id: StagedId,
    name: String,
    mime: MimeType,
    raw: RawImage,
    remote_url: Option<String>,
    preview: watch::Receiver<PreviewSlot>,
}

impl StagedImage {
    pub fn id(&self) -> StagedId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> MimeType {
        self.mime
    }

    pub fn raw(&self) -> &RawImage {
        &self.raw
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    pub fn preview(&self) -> PreviewState {
        self.preview.borrow().state.clone()
    }

    /// What a presentation layer should show: the remote copy if the
    /// backend already has one, else the local preview (blank while the
    /// encode is pending or after it failed).
    pub fn display_source(&self) -> Option<String> {
        if let Some(url) = &self.remote_url {
            return Some(url.clone());
        }
        match &self.preview.borrow().state {
            PreviewState::Ready(encoded) => Some(encoded.data_uri().to_string()),
            _ => None,
        }
    }
}

struct Entry {
    image: StagedImage,
    slot: Arc<watch::Sender<PreviewSlot>>,
    task: Option<AbortHandle>,
}

impl Entry {
    fn new(source: ImageSource, mime: MimeType) -> Self {
        let (tx, rx) = watch::channel(PreviewSlot {
            generation: 0,
            state: PreviewState::Pending,
        });
        let mut entry = Self {
            image: StagedImage {
                id: StagedId::new(),
                name: source.name,
                mime,
                raw: source.raw,
                remote_url: source.remote_url,
                preview: rx,
            },
            slot: Arc::new(tx),
            task: None,
        };
        entry.spawn_encode(0);
        entry
    }

    fn spawn_encode(&mut self, generation: u64) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let name = self.image.name.clone();
        let raw = self.image.raw.clone();
        let mime = self.image.mime;
        let slot = Arc::clone(&self.slot);

        let handle = tokio::spawn(async move {
            let mut guard = AbortGuard {
                slot: Arc::clone(&slot),
                generation,
                name: name.clone(),
                armed: true,
            };
            let result = encode(&name, &raw, mime).await;
            guard.armed = false;

            let state = match result {
                Ok(encoded) => PreviewState::Ready(encoded),
                Err(e) => {
                    log::warn!("[INTAKE] Preview for '{}' unavailable: {}", name, e);
                    PreviewState::Failed(e)
                }
            };
            write_slot(&slot, generation, state);
        });
        self.task = Some(handle.abort_handle());
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Marks the slot `Aborted` if an encode task is dropped before finishing.
struct AbortGuard {
    slot: Arc<watch::Sender<PreviewSlot>>,
    generation: u64,
    name: String,
    armed: bool,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if self.armed {
            let name = std::mem::take(&mut self.name);
            write_slot(
                &self.slot,
                self.generation,
                PreviewState::Failed(EncodeError::Aborted { name }),
            );
        }
    }
}

/// Write a preview state, unless a newer encode attempt owns the slot.
fn write_slot(slot: &watch::Sender<PreviewSlot>, generation: u64, state: PreviewState) {
    slot.send_if_modified(|current| {
        if current.generation != generation {
            return false;
        }
        current.state = state;
        true
    });
}

fn check_type(source: &ImageSource) -> Result<MimeType, RejectedTypeError> {
    MimeType::from_tag(&source.mime).ok_or_else(|| RejectedTypeError {
        name: source.name.clone(),
        mime: source.mime.clone(),
    })
}

/// Ordered staging area of picked images.
///
/// Mutating methods spawn encode tasks and must run inside a Tokio runtime.
pub struct SelectionStore {
    items: Mutex<Vec<Entry>>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    fn items(&self) -> MutexGuard<'_, Vec<Entry>> {
        // Nothing inside the lock can be left half-written, so a poisoned
        // guard is still usable.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stage one pick. Rejected types are reported and never stored.
    pub fn add(&self, source: ImageSource) -> Result<StagedId, RejectedTypeError> {
        let mime = check_type(&source).inspect_err(|e| {
            log::warn!("[INTAKE] Rejected pick: {}", e);
        })?;
        let entry = Entry::new(source, mime);
        let id = entry.image.id;
        log::info!("[INTAKE] Staged '{}' ({}) as {}", entry.image.name, mime, id);
        self.items().push(entry);
        Ok(id)
    }

    /// Remove one item, cancelling its encode if still running.
    pub fn remove(&self, id: StagedId) -> bool {
        let mut items = self.items();
        match items.iter().position(|e| e.image.id == id) {
            Some(index) => {
                let entry = items.remove(index);
                log::info!("[INTAKE] Removed '{}' ({})", entry.image.name, id);
                true
            }
            None => false,
        }
    }

    /// Replace the whole selection. All-or-nothing: if any pick is
    /// rejected, the current selection is left as it was.
    pub fn replace_all(&self, sources: Vec<ImageSource>) -> Result<Vec<StagedId>, RejectedTypeError> {
        let mut checked = Vec::with_capacity(sources.len());
        for source in sources {
            let mime = check_type(&source).inspect_err(|e| {
                log::warn!("[INTAKE] Rejected replacement batch: {}", e);
            })?;
            checked.push((source, mime));
        }

        let entries: Vec<Entry> = checked
            .into_iter()
            .map(|(source, mime)| Entry::new(source, mime))
            .collect();
        let ids = entries.iter().map(|e| e.image.id).collect();

        let previous = std::mem::replace(&mut *self.items(), entries);
        log::info!(
            "[INTAKE] Replaced selection ({} → {} items)",
            previous.len(),
            self.len()
        );
        Ok(ids)
    }

    /// Re-run the encode for one item. The newest attempt wins.
    pub fn retry_preview(&self, id: StagedId) -> bool {
        let mut items = self.items();
        let Some(entry) = items.iter_mut().find(|e| e.image.id == id) else {
            return false;
        };
        let mut generation = 0;
        entry.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.state = PreviewState::Pending;
            generation = slot.generation;
        });
        entry.spawn_encode(generation);
        true
    }

    /// Snapshot of the selection in insertion order.
    pub fn current_selection(&self) -> Vec<StagedImage> {
        self.items().iter().map(|e| e.image.clone()).collect()
    }

    /// The insertion-order head, if any.
    pub fn first(&self) -> Option<StagedImage> {
        self.items().first().map(|e| e.image.clone())
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Drop every staged item.
    pub fn clear(&self) {
        let cleared = std::mem::take(&mut *self.items());
        if !cleared.is_empty() {
            log::info!("[INTAKE] Cleared {} staged item(s)", cleared.len());
        }
    }

    /// Wait until an item's preview is no longer pending.
    ///
    /// Returns `None` if the item is not (or no longer) staged.
    pub async fn wait_for_preview(&self, id: StagedId) -> Option<PreviewState> {
        let mut rx = {
            let items = self.items();
            items.iter().find(|e| e.image.id == id)?.image.preview.clone()
        };
        let slot = rx.wait_for(|slot| !slot.state.is_pending()).await.ok()?;
        Some(slot.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> ImageSource {
        ImageSource::new(name, "image/png", RawImage::from_bytes(b"png bytes".to_vec()))
    }

    #[tokio::test]
    async fn add_accepts_allowed_types_in_order() {
        let store = SelectionStore::new();
        let a = store.add(png("a.png")).unwrap();
        let b = store
            .add(ImageSource::new("b.jpg", "image/jpeg", RawImage::from_bytes(b"jpg".to_vec())))
            .unwrap();
        let ids: Vec<_> = store.current_selection().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(store.first().map(|s| s.id()), Some(a));
    }

    #[tokio::test]
    async fn add_rejects_disallowed_type() {
        let store = SelectionStore::new();
        let err = store
            .add(ImageSource::new("anim.gif", "image/gif", RawImage::from_bytes(b"gif".to_vec())))
            .unwrap_err();
        assert_eq!(err.mime, "image/gif");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn preview_populates_in_background() {
        let store = SelectionStore::new();
        let id = store.add(png("a.png")).unwrap();
        let state = store.wait_for_preview(id).await.unwrap();
        match state {
            PreviewState::Ready(encoded) => {
                assert!(encoded.data_uri().starts_with("data:image/png;base64,"));
            }
            other => panic!("expected ready preview, got {:?}", other),
        }
        let item = store.first().unwrap();
        assert!(item.display_source().unwrap().starts_with("data:image/png"));
    }

    #[tokio::test]
    async fn failed_preview_keeps_item_selectable() {
        let store = SelectionStore::new();
        let id = store
            .add(ImageSource::new(
                "gone.png",
                "image/png",
                RawImage::File("/no/such/file.png".into()),
            ))
            .unwrap();
        let state = store.wait_for_preview(id).await.unwrap();
        assert!(matches!(state, PreviewState::Failed(EncodeError::Read { .. })));
        assert_eq!(store.len(), 1);
        assert_eq!(store.first().unwrap().display_source(), None);
    }

    #[tokio::test]
    async fn remote_url_wins_for_display() {
        let store = SelectionStore::new();
        store
            .add(png("a.png").with_remote_url("https://cdn.example/a.png"))
            .unwrap();
        assert_eq!(
            store.first().unwrap().display_source().as_deref(),
            Some("https://cdn.example/a.png")
        );
    }

    #[tokio::test]
    async fn remove_drops_only_that_item() {
        let store = SelectionStore::new();
        let a = store.add(png("a.png")).unwrap();
        let b = store.add(png("b.png")).unwrap();
        assert!(store.remove(a));
        assert!(!store.remove(a));
        assert_eq!(store.first().map(|s| s.id()), Some(b));
        assert_eq!(store.wait_for_preview(a).await, None);
    }

    #[tokio::test]
    async fn replace_all_is_all_or_nothing() {
        let store = SelectionStore::new();
        let kept = store.add(png("kept.png")).unwrap();

        let err = store
            .replace_all(vec![
                png("new.png"),
                ImageSource::new("doc.pdf", "application/pdf", RawImage::from_bytes(b"%PDF".to_vec())),
            ])
            .unwrap_err();
        assert_eq!(err.name, "doc.pdf");
        assert_eq!(store.first().map(|s| s.id()), Some(kept));

        let ids = store.replace_all(vec![png("x.png"), png("y.png")]).unwrap();
        let current: Vec<_> = store.current_selection().iter().map(|s| s.id()).collect();
        assert_eq!(current, ids);
    }

    #[tokio::test]
    async fn retry_preview_recomputes_equal_output() {
        let store = SelectionStore::new();
        let id = store.add(png("a.png")).unwrap();
        let first = store.wait_for_preview(id).await.unwrap();
        assert!(store.retry_preview(id));
        let second = store.wait_for_preview(id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn store_never_holds_disallowed_types() {
        let store = SelectionStore::new();
        let tags = ["image/png", "image/gif", "image/jpeg", "text/plain", "image/svg+xml", "image/bmp"];
        let mut staged = Vec::new();
        for (i, tag) in tags.iter().cycle().take(24).enumerate() {
            let source = ImageSource::new(format!("f{}", i), *tag, RawImage::from_bytes(vec![1, 2, 3]));
            if let Ok(id) = store.add(source) {
                staged.push(id);
            }
            if i % 5 == 4 {
                if let Some(id) = staged.pop() {
                    store.remove(id);
                }
            }
            for item in store.current_selection() {
                assert!(MimeType::from_tag(item.mime().as_str()).is_some());
            }
        }
        assert_eq!(store.len(), staged.len());
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = SelectionStore::new();
        store.add(png("a.png")).unwrap();
        store.add(png("b.png")).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.first().is_none());
    }
}
