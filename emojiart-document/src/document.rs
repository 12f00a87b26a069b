//! The document controller: intents, published state, and side effects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use emojiart_core::{Background, Emoji, EmojiArtModel, Position};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::{decode_image, BackgroundImage, ImageFetcher};

/// File name of the well-known autosave target.
pub const AUTOSAVE_FILENAME: &str = "autosaved.emojiart";

/// Default coalescing delay between the last mutation and the autosave write.
const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the state-change broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Progress of the background-image fetch pipeline.
///
/// `Failed` is a terminal state for a URL whose fetch or decode failed while
/// still current; a later background change returns the status to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// No fetch in flight.
    Idle,
    /// A fetch for the current URL background is in flight.
    Fetching,
    /// The fetch for this URL failed or produced undecodable bytes.
    Failed(Url),
}

/// State-change notification pushed to subscribers.
///
/// Events carry no snapshots; subscribers read current state through the
/// document's accessors.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// The emoji list or background value changed.
    ModelChanged,
    /// The displayed background image was set or cleared.
    BackgroundImageChanged,
    /// The fetch pipeline moved to a new status.
    FetchStatusChanged(FetchStatus),
}

/// Configuration for a document controller.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Autosave target; `None` disables persistence entirely.
    pub autosave_path: Option<PathBuf>,
    /// Coalescing delay timed from the last mutation of a burst.
    pub autosave_delay: Duration,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            autosave_path: None,
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
        }
    }
}

impl DocumentConfig {
    /// A configuration with no persistence (tests, scratch documents).
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Autosave to the well-known file name inside `dir`.
    #[must_use]
    pub fn autosaved_in(dir: impl Into<PathBuf>) -> Self {
        Self {
            autosave_path: Some(dir.into().join(AUTOSAVE_FILENAME)),
            ..Self::default()
        }
    }

    /// Override the coalescing delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }
}

/// Everything behind the document's single mutation lock.
struct DocumentState {
    model: EmojiArtModel,
    background_image: Option<Arc<BackgroundImage>>,
    fetch_status: FetchStatus,
}

/// The stateful controller around one owned [`EmojiArtModel`].
///
/// Cloning yields another handle to the same document. All mutation happens
/// under one lock, which is the document's single logical mutation context;
/// fetch completions and autosave writes run on spawned tasks that re-acquire
/// the lock (and, for fetches, re-check freshness) before touching state.
///
/// Construction and every intent must happen inside a tokio runtime, since
/// side effects are spawned as tasks.
#[derive(Clone)]
pub struct EmojiArtDocument {
    state: Arc<Mutex<DocumentState>>,
    fetcher: Arc<dyn ImageFetcher>,
    event_tx: broadcast::Sender<DocumentEvent>,
    autosave_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: DocumentConfig,
}

impl EmojiArtDocument {
    /// Open a document: restore the autosave file when present and usable,
    /// otherwise start from the seeded default (two sample emoji on a blank
    /// background). A restored non-blank background starts its fetch/decode
    /// immediately.
    #[must_use]
    pub fn new(config: DocumentConfig, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let model = Self::load_or_seed(config.autosave_path.as_deref());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let document = Self {
            state: Arc::new(Mutex::new(DocumentState {
                model,
                background_image: None,
                fetch_status: FetchStatus::Idle,
            })),
            fetcher,
            event_tx,
            autosave_task: Arc::new(Mutex::new(None)),
            config,
        };
        if document.background() != Background::Blank {
            document.refresh_background_image();
        }
        document
    }

    fn load_or_seed(path: Option<&Path>) -> EmojiArtModel {
        if let Some(path) = path {
            match EmojiArtModel::from_file(path) {
                Ok(model) => {
                    tracing::info!(path = %path.display(), "Restored autosaved document");
                    return model;
                }
                Err(e) => {
                    tracing::info!(
                        path = %path.display(),
                        "No usable autosave, starting from the default document: {e}"
                    );
                }
            }
        }
        let mut model = EmojiArtModel::new();
        model.add_emoji("😄", Position::new(-200, -100), 80);
        model.add_emoji("🥵", Position::new(50, 100), 40);
        model
    }

    // -----------------------------------------------------------------------
    // Published state
    // -----------------------------------------------------------------------

    /// Subscribe to state-change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the placed emoji in z-order.
    #[must_use]
    pub fn emojis(&self) -> Vec<Emoji> {
        self.lock_state().model.emojis().to_vec()
    }

    /// The current background value.
    #[must_use]
    pub fn background(&self) -> Background {
        self.lock_state().model.background().clone()
    }

    /// The currently displayed background image, if any.
    #[must_use]
    pub fn background_image(&self) -> Option<Arc<BackgroundImage>> {
        self.lock_state().background_image.clone()
    }

    /// Progress of the background-image fetch pipeline.
    #[must_use]
    pub fn background_image_fetch_status(&self) -> FetchStatus {
        self.lock_state().fetch_status.clone()
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Replace the background. A value structurally different from the
    /// previous one restarts the fetch pipeline.
    pub fn set_background(&self, background: Background) {
        let changed = {
            let mut state = self.lock_state();
            let changed = state.model.background() != &background;
            state.model.set_background(background);
            changed
        };
        tracing::debug!(changed, "Background set");
        self.publish(DocumentEvent::ModelChanged);
        self.schedule_autosave();
        if changed {
            self.refresh_background_image();
        }
    }

    /// Place a new emoji. The size is truncated toward zero to an integer.
    pub fn add_emoji(&self, text: impl Into<String>, at: Position, size: f64) {
        {
            let mut state = self.lock_state();
            #[allow(clippy::cast_possible_truncation)]
            state.model.add_emoji(text, at, size as i32);
        }
        self.publish(DocumentEvent::ModelChanged);
        self.schedule_autosave();
    }

    /// Remove the emoji with the given id; silent no-op when absent.
    pub fn delete_emoji(&self, id: i32) {
        {
            let mut state = self.lock_state();
            state.model.delete_emoji(id);
        }
        self.publish(DocumentEvent::ModelChanged);
        self.schedule_autosave();
    }

    /// Move an emoji by a fractional offset, truncated toward zero per axis.
    /// Silent no-op when the id is unknown.
    pub fn move_emoji(&self, id: i32, by: (f64, f64)) {
        let moved = {
            let mut state = self.lock_state();
            if let Some(emoji) = state.model.emoji_mut(id) {
                #[allow(clippy::cast_possible_truncation)]
                {
                    emoji.x += by.0 as i32;
                    emoji.y += by.1 as i32;
                }
                true
            } else {
                false
            }
        };
        if moved {
            self.publish(DocumentEvent::ModelChanged);
            self.schedule_autosave();
        }
    }

    /// Scale an emoji's size by a factor, rounding half away from zero.
    /// There is no size floor. Silent no-op when the id is unknown.
    pub fn scale_emoji(&self, id: i32, by: f64) {
        let scaled = {
            let mut state = self.lock_state();
            if let Some(emoji) = state.model.emoji_mut(id) {
                #[allow(clippy::cast_possible_truncation)]
                {
                    emoji.size = (f64::from(emoji.size) * by).round() as i32;
                }
                true
            } else {
                false
            }
        };
        if scaled {
            self.publish(DocumentEvent::ModelChanged);
            self.schedule_autosave();
        }
    }

    // -----------------------------------------------------------------------
    // Background fetch pipeline
    // -----------------------------------------------------------------------

    /// Re-derive the displayed image from the current background value.
    ///
    /// Clears the image synchronously, then dispatches on the background
    /// case: embedded bytes decode in place, URLs start an async fetch whose
    /// result is applied only if that URL is still current on completion.
    fn refresh_background_image(&self) {
        let (background, status_reset) = {
            let mut state = self.lock_state();
            state.background_image = None;
            let reset = state.fetch_status != FetchStatus::Idle;
            state.fetch_status = FetchStatus::Idle;
            (state.model.background().clone(), reset)
        };
        self.publish(DocumentEvent::BackgroundImageChanged);
        if status_reset {
            self.publish(DocumentEvent::FetchStatusChanged(FetchStatus::Idle));
        }

        match background {
            Background::Blank => {}
            Background::ImageData(bytes) => {
                let image = decode_image(&bytes).map(Arc::new);
                {
                    let mut state = self.lock_state();
                    state.background_image = image;
                }
                self.publish(DocumentEvent::BackgroundImageChanged);
            }
            Background::Url(url) => {
                {
                    let mut state = self.lock_state();
                    state.fetch_status = FetchStatus::Fetching;
                }
                self.publish(DocumentEvent::FetchStatusChanged(FetchStatus::Fetching));
                let document = self.clone();
                tokio::spawn(async move {
                    let bytes = document.fetcher.fetch(&url).await;
                    document.apply_fetch_result(&url, bytes);
                });
            }
        }
    }

    /// Apply a completed fetch, unless a later intent superseded it.
    ///
    /// The captured `url` is compared against the current background; on
    /// mismatch the result is discarded with no state change at all.
    fn apply_fetch_result(&self, url: &Url, bytes: Option<Vec<u8>>) {
        let (status, image_set) = {
            let mut state = self.lock_state();
            if state.model.background() != &Background::Url(url.clone()) {
                tracing::debug!(%url, "Discarding superseded background fetch");
                return;
            }
            match bytes.as_deref().and_then(decode_image) {
                Some(image) => {
                    state.background_image = Some(Arc::new(image));
                    state.fetch_status = FetchStatus::Idle;
                    (FetchStatus::Idle, true)
                }
                None => {
                    state.fetch_status = FetchStatus::Failed(url.clone());
                    (FetchStatus::Failed(url.clone()), false)
                }
            }
        };
        if image_set {
            self.publish(DocumentEvent::BackgroundImageChanged);
        }
        self.publish(DocumentEvent::FetchStatusChanged(status));
    }

    // -----------------------------------------------------------------------
    // Autosave
    // -----------------------------------------------------------------------

    /// Reschedule the single pending autosave write.
    ///
    /// The document is encoded now, so the write that eventually fires
    /// carries the state as of the last mutation of the burst. The previous
    /// pending write, if any, is aborted.
    fn schedule_autosave(&self) {
        let Some(path) = self.config.autosave_path.clone() else {
            return;
        };
        let bytes = match self.lock_state().model.to_json() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to encode document for autosave: {e}");
                return;
            }
        };
        let delay = self.config.autosave_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Past the sleep there is no cancellation point: a reschedule can
            // only abort a write that has not started.
            match std::fs::write(&path, &bytes) {
                Ok(()) => tracing::debug!(path = %path.display(), "Autosaved document"),
                Err(e) => {
                    tracing::error!(path = %path.display(), "Autosave write failed: {e}");
                }
            }
        });
        let mut pending = self
            .autosave_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lock_state(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: DocumentEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("State change event dropped: no subscribers");
        }
    }
}
