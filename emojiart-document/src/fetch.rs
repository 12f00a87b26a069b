//! Background-image byte fetching and decoding.

use async_trait::async_trait;
use url::Url;

/// A decoded background image ready for display.
///
/// Pixels are plain RGBA bytes (4 per pixel, row-major); the presentation
/// layer owns any further conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data.
    pub data: Vec<u8>,
}

/// Decode raw image bytes into a displayable [`BackgroundImage`].
///
/// Never fails loudly: undecodable input yields `None`.
#[must_use]
pub fn decode_image(bytes: &[u8]) -> Option<BackgroundImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Some(BackgroundImage {
                width,
                height,
                data: rgba.into_raw(),
            })
        }
        Err(e) => {
            tracing::debug!("Undecodable background image bytes: {e}");
            None
        }
    }
}

/// Asynchronous single-shot byte fetcher for remote backgrounds.
///
/// One attempt, no retry; any failure resolves to `None`.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the bytes behind `url`, or `None` on any failure.
    async fn fetch(&self, url: &Url) -> Option<Vec<u8>>;
}

/// HTTP fetcher backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Option<Vec<u8>> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, "Background fetch failed: {e}");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, "Background fetch rejected: {e}");
                return None;
            }
        };
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                tracing::warn!(%url, "Background fetch body read failed: {e}");
                None
            }
        }
    }
}
