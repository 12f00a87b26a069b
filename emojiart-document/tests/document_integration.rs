//! Integration tests for the document controller: intents, event
//! publication, autosave coalescing, and the background fetch pipeline.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use emojiart_core::{Background, EmojiArtModel, Position};
use emojiart_document::{
    DocumentConfig, DocumentEvent, EmojiArtDocument, FetchStatus, ImageFetcher,
};
use tokio::sync::Notify;
use url::Url;

/// Scriptable fetcher: canned responses per URL, optional gates that hold a
/// fetch open until released, and a call counter.
#[derive(Default)]
struct StubFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn respond(&self, url: &str, bytes: Vec<u8>) {
        self.responses
            .lock()
            .expect("lock")
            .insert(url.to_string(), bytes);
    }

    /// Hold fetches of `url` open until the returned handle is notified.
    fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .expect("lock")
            .insert(url.to_string(), gate.clone());
        gate
    }

    fn fetch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Option<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().expect("lock").get(url.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .expect("lock")
            .get(url.as_str())
            .cloned()
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode png");
    out
}

fn ephemeral_document(fetcher: Arc<StubFetcher>) -> EmojiArtDocument {
    EmojiArtDocument::new(DocumentConfig::ephemeral(), fetcher)
}

/// Poll until `cond` holds, failing the test after ~2 seconds.
async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

// ===========================================================================
// Construction and seeded defaults
// ===========================================================================

#[tokio::test]
async fn test_seeded_default_document() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));

    let emojis = doc.emojis();
    assert_eq!(emojis.len(), 2);
    assert_eq!(emojis[0].text, "😄");
    assert_eq!(emojis[0].position(), Position::new(-200, -100));
    assert_eq!(emojis[0].size, 80);
    assert_eq!(emojis[1].text, "🥵");
    assert_eq!(emojis[1].position(), Position::new(50, 100));
    assert_eq!(emojis[1].size, 40);

    assert_eq!(doc.background(), Background::Blank);
    assert!(doc.background_image().is_none());
    assert_eq!(doc.background_image_fetch_status(), FetchStatus::Idle);
}

#[tokio::test]
async fn test_restore_from_autosave_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DocumentConfig::autosaved_in(dir.path());

    let mut model = EmojiArtModel::new();
    model.add_emoji("🎸", Position::new(7, -7), 64);
    std::fs::write(
        config.autosave_path.as_ref().expect("path"),
        model.to_json().expect("encode"),
    )
    .expect("write");

    let doc = EmojiArtDocument::new(config, Arc::new(StubFetcher::default()));
    let emojis = doc.emojis();
    assert_eq!(emojis.len(), 1);
    assert_eq!(emojis[0].text, "🎸");
}

#[tokio::test]
async fn test_corrupt_autosave_falls_back_to_seeded_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DocumentConfig::autosaved_in(dir.path());
    std::fs::write(config.autosave_path.as_ref().expect("path"), b"{garbage").expect("write");

    let doc = EmojiArtDocument::new(config, Arc::new(StubFetcher::default()));
    assert_eq!(doc.emojis().len(), 2);
    assert_eq!(doc.background(), Background::Blank);
}

#[tokio::test]
async fn test_restored_url_background_starts_fetch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DocumentConfig::autosaved_in(dir.path());
    let url = Url::parse("https://example.com/restored.png").expect("url");

    let mut model = EmojiArtModel::new();
    model.set_background(Background::Url(url.clone()));
    std::fs::write(
        config.autosave_path.as_ref().expect("path"),
        model.to_json().expect("encode"),
    )
    .expect("write");

    let fetcher = Arc::new(StubFetcher::default());
    fetcher.respond(url.as_str(), png_bytes(4, 4));

    let doc = EmojiArtDocument::new(config, fetcher.clone());
    wait_for("restored background image", || doc.background_image().is_some()).await;
    assert_eq!(fetcher.fetch_calls(), 1);
}

#[tokio::test]
async fn test_clones_share_the_same_document() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    let other = doc.clone();

    other.add_emoji("🚲", Position::new(0, 0), 30.0);

    assert_eq!(doc.emojis().len(), 3);
}

// ===========================================================================
// Intents
// ===========================================================================

#[tokio::test]
async fn test_add_emoji_truncates_size_toward_zero() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    doc.add_emoji("🚗", Position::new(1, 2), 55.9);

    let emojis = doc.emojis();
    let added = emojis.last().expect("added");
    assert_eq!(added.size, 55);
    assert_eq!(added.position(), Position::new(1, 2));
}

#[tokio::test]
async fn test_delete_emoji_removes_only_the_matching_id() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    let before = doc.emojis();

    doc.delete_emoji(before[0].id());

    let after = doc.emojis();
    assert_eq!(after.len(), before.len() - 1);
    assert!(after.iter().all(|e| e.id() != before[0].id()));
}

#[tokio::test]
async fn test_move_emoji_truncates_offsets_toward_zero() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    let id = doc.emojis()[0].id();
    let start = doc.emojis()[0].position();

    doc.move_emoji(id, (10.9, -4.7));

    let moved = doc.emojis()[0].position();
    assert_eq!(moved, Position::new(start.x + 10, start.y - 4));
}

#[tokio::test]
async fn test_scale_emoji_rounds_half_away_from_zero() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    doc.add_emoji("📏", Position::new(0, 0), 40.0);
    let id = doc.emojis().last().expect("added").id();

    doc.scale_emoji(id, 1.5);
    assert_eq!(doc.emojis().last().expect("emoji").size, 60);

    doc.add_emoji("📐", Position::new(0, 0), 41.0);
    let id = doc.emojis().last().expect("added").id();
    doc.scale_emoji(id, 0.5);
    assert_eq!(doc.emojis().last().expect("emoji").size, 21);
}

#[tokio::test]
async fn test_intents_on_unknown_ids_are_silent_no_ops() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    let before = doc.emojis();

    doc.delete_emoji(999);
    doc.move_emoji(999, (5.0, 5.0));
    doc.scale_emoji(999, 2.0);

    assert_eq!(doc.emojis(), before);
}

#[tokio::test]
async fn test_mutations_publish_model_changed() {
    let doc = ephemeral_document(Arc::new(StubFetcher::default()));
    let mut events = doc.subscribe();

    doc.add_emoji("🔔", Position::new(0, 0), 20.0);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event within 1s")
        .expect("channel open");
    assert!(matches!(event, DocumentEvent::ModelChanged));
}

// ===========================================================================
// Background fetch pipeline
// ===========================================================================

#[tokio::test]
async fn test_url_background_fetches_and_publishes_image() {
    let fetcher = Arc::new(StubFetcher::default());
    let url = Url::parse("https://example.com/bg.png").expect("url");
    fetcher.respond(url.as_str(), png_bytes(5, 3));

    let doc = ephemeral_document(fetcher.clone());
    doc.set_background(Background::Url(url));

    wait_for("background image", || doc.background_image().is_some()).await;
    let image = doc.background_image().expect("image");
    assert_eq!((image.width, image.height), (5, 3));
    assert_eq!(doc.background_image_fetch_status(), FetchStatus::Idle);
}

#[tokio::test]
async fn test_setting_the_same_background_fetches_only_once() {
    let fetcher = Arc::new(StubFetcher::default());
    let url = Url::parse("https://example.com/same.png").expect("url");
    fetcher.respond(url.as_str(), png_bytes(1, 1));

    let doc = ephemeral_document(fetcher.clone());
    doc.set_background(Background::Url(url.clone()));
    wait_for("first fetch", || doc.background_image().is_some()).await;

    doc.set_background(Background::Url(url));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(fetcher.fetch_calls(), 1);
    assert!(doc.background_image().is_some());
}

#[tokio::test]
async fn test_superseded_fetch_result_is_discarded() {
    let fetcher = Arc::new(StubFetcher::default());
    let url_a = Url::parse("https://example.com/a.png").expect("url");
    let url_b = Url::parse("https://example.com/b.png").expect("url");
    fetcher.respond(url_a.as_str(), png_bytes(1, 1));
    fetcher.respond(url_b.as_str(), png_bytes(2, 2));
    let gate_a = fetcher.gate(url_a.as_str());

    let doc = ephemeral_document(fetcher.clone());
    doc.set_background(Background::Url(url_a));
    doc.set_background(Background::Url(url_b.clone()));

    wait_for("b's image", || doc.background_image().is_some()).await;
    let image = doc.background_image().expect("image");
    assert_eq!((image.width, image.height), (2, 2));

    // Let the stale fetch of A complete; its result must not be applied.
    gate_a.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let image = doc.background_image().expect("image still set");
    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(doc.background(), Background::Url(url_b));
    assert_eq!(doc.background_image_fetch_status(), FetchStatus::Idle);
}

#[tokio::test]
async fn test_failed_fetch_resolves_to_failed_status() {
    let fetcher = Arc::new(StubFetcher::default());
    let url = Url::parse("https://example.com/missing.png").expect("url");
    // No canned response: the fetch resolves to None.

    let doc = ephemeral_document(fetcher);
    doc.set_background(Background::Url(url.clone()));

    wait_for("failed status", || {
        doc.background_image_fetch_status() == FetchStatus::Failed(url.clone())
    })
    .await;
    assert!(doc.background_image().is_none());
}

#[tokio::test]
async fn test_undecodable_fetch_bytes_resolve_to_failed_status() {
    let fetcher = Arc::new(StubFetcher::default());
    let url = Url::parse("https://example.com/not-an-image").expect("url");
    fetcher.respond(url.as_str(), b"<html>not an image</html>".to_vec());

    let doc = ephemeral_document(fetcher);
    doc.set_background(Background::Url(url.clone()));

    wait_for("failed status", || {
        doc.background_image_fetch_status() == FetchStatus::Failed(url.clone())
    })
    .await;
    assert!(doc.background_image().is_none());
}

#[tokio::test]
async fn test_image_data_background_decodes_synchronously() {
    let fetcher = Arc::new(StubFetcher::default());
    let doc = ephemeral_document(fetcher.clone());

    doc.set_background(Background::ImageData(png_bytes(3, 1)));

    // No fetch, no waiting: the image is available as soon as the intent
    // returns.
    let image = doc.background_image().expect("decoded image");
    assert_eq!((image.width, image.height), (3, 1));
    assert_eq!(doc.background_image_fetch_status(), FetchStatus::Idle);
    assert_eq!(fetcher.fetch_calls(), 0);
}

#[tokio::test]
async fn test_blank_background_clears_image_and_status() {
    let fetcher = Arc::new(StubFetcher::default());
    let url = Url::parse("https://example.com/bg.png").expect("url");
    fetcher.respond(url.as_str(), png_bytes(2, 2));

    let doc = ephemeral_document(fetcher);
    doc.set_background(Background::Url(url));
    wait_for("image", || doc.background_image().is_some()).await;

    doc.set_background(Background::Blank);

    assert!(doc.background_image().is_none());
    assert_eq!(doc.background_image_fetch_status(), FetchStatus::Idle);
}

#[tokio::test]
async fn test_new_background_clears_stale_failed_status() {
    let fetcher = Arc::new(StubFetcher::default());
    let url = Url::parse("https://example.com/broken.png").expect("url");

    let doc = ephemeral_document(fetcher);
    doc.set_background(Background::Url(url.clone()));
    wait_for("failed status", || {
        doc.background_image_fetch_status() == FetchStatus::Failed(url.clone())
    })
    .await;

    doc.set_background(Background::Blank);
    assert_eq!(doc.background_image_fetch_status(), FetchStatus::Idle);
}

// ===========================================================================
// Autosave coalescing
// ===========================================================================

#[tokio::test]
async fn test_autosave_coalesces_a_burst_into_one_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DocumentConfig::autosaved_in(dir.path()).with_delay(Duration::from_millis(200));
    let path = config.autosave_path.clone().expect("path");

    let doc = EmojiArtDocument::new(config, Arc::new(StubFetcher::default()));
    for i in 0..10 {
        doc.add_emoji("💾", Position::new(i, i), 20.0);
    }

    // The write fires a full delay after the last mutation, never sooner.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!path.exists(), "autosave fired before the coalescing delay");

    wait_for("autosave file", || path.exists()).await;
    let restored = EmojiArtModel::from_file(&path).expect("parse autosave");
    assert_eq!(restored.emojis().len(), 12);
    assert_eq!(restored.emojis(), doc.emojis().as_slice());
}

#[tokio::test]
async fn test_autosave_delay_restarts_on_every_mutation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DocumentConfig::autosaved_in(dir.path()).with_delay(Duration::from_millis(400));
    let path = config.autosave_path.clone().expect("path");

    let doc = EmojiArtDocument::new(config, Arc::new(StubFetcher::default()));
    doc.add_emoji("⏱️", Position::new(0, 0), 20.0);
    tokio::time::sleep(Duration::from_millis(250)).await;

    // This mutation aborts the pending write and starts a fresh delay.
    doc.add_emoji("⏱️", Position::new(1, 1), 20.0);
    assert!(!path.exists(), "first schedule should have been aborted");

    wait_for("autosave file", || path.exists()).await;
    let restored = EmojiArtModel::from_file(&path).expect("parse autosave");
    assert_eq!(restored.emojis().len(), 4);
}

#[tokio::test]
async fn test_autosaved_document_survives_reconstruction() {
    let dir = tempfile::tempdir().expect("tempdir");
    let delay = Duration::from_millis(50);

    {
        let config = DocumentConfig::autosaved_in(dir.path()).with_delay(delay);
        let path = config.autosave_path.clone().expect("path");
        let doc = EmojiArtDocument::new(config, Arc::new(StubFetcher::default()));
        doc.add_emoji("🔁", Position::new(9, 9), 33.0);
        wait_for("autosave file", || path.exists()).await;
    }

    let config = DocumentConfig::autosaved_in(dir.path()).with_delay(delay);
    let doc = EmojiArtDocument::new(config, Arc::new(StubFetcher::default()));
    assert_eq!(doc.emojis().len(), 3);
    assert_eq!(doc.emojis().last().expect("emoji").text, "🔁");
}
