//! The single image source behind the canvas.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

/// The background of a document: none, a remote image, or embedded bytes.
///
/// Exactly one case is active at a time; replacing the whole value is how a
/// background change is expressed. Equality is structural.
///
/// The wire shape is a single-key JSON object:
/// `{"blank": true}`, `{"url": "<string>"}`, or
/// `{"imageData": "<base64>"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BackgroundRepr", into = "BackgroundRepr")]
pub enum Background {
    /// No background.
    #[default]
    Blank,
    /// A remote image reference.
    Url(Url),
    /// Embedded raw image bytes (e.g. a pasted or dropped image).
    ImageData(Vec<u8>),
}

impl Background {
    /// The URL when this background is a remote reference.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            _ => None,
        }
    }

    /// The raw bytes when this background is embedded image data.
    #[must_use]
    pub fn image_data(&self) -> Option<&[u8]> {
        match self {
            Self::ImageData(data) => Some(data),
            _ => None,
        }
    }
}

/// Wire representation of [`Background`].
///
/// Each case is an object with a single distinguishing key, so untagged
/// deserialization picks the active case from the field name alone.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BackgroundRepr {
    Url {
        url: Url,
    },
    ImageData {
        #[serde(rename = "imageData")]
        image_data: String,
    },
    Blank {
        blank: bool,
    },
}

impl From<Background> for BackgroundRepr {
    fn from(background: Background) -> Self {
        match background {
            Background::Blank => Self::Blank { blank: true },
            Background::Url(url) => Self::Url { url },
            Background::ImageData(data) => Self::ImageData {
                image_data: BASE64.encode(data),
            },
        }
    }
}

impl TryFrom<BackgroundRepr> for Background {
    type Error = base64::DecodeError;

    fn try_from(repr: BackgroundRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            BackgroundRepr::Blank { .. } => Self::Blank,
            BackgroundRepr::Url { url } => Self::Url(url),
            BackgroundRepr::ImageData { image_data } => {
                Self::ImageData(BASE64.decode(image_data)?)
            }
        })
    }
}
