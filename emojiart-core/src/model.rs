//! The persisted document: background plus an ordered list of placed emoji.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Background, CoreResult, Position};

/// A single placed emoji glyph.
///
/// Identity lives in the `id`, which is unique within a document and never
/// changes; `text`, position, and size are plain mutable data. List order is
/// insertion order and only matters for rendering (z-order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    /// The glyph, expected to be a single emoji (not enforced).
    pub text: String,
    /// Horizontal offset from the canvas origin.
    pub x: i32,
    /// Vertical offset from the canvas origin.
    pub y: i32,
    /// Nominal display size.
    pub size: i32,
    id: i32,
}

impl Emoji {
    /// The stable identity of this emoji within its document.
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// The position of this emoji.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// The document aggregate: a [`Background`] and the placed emoji.
///
/// Mutated exclusively through the document controller; serializes to the
/// compact JSON shape `{"background": ..., "emojis": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ModelRepr")]
pub struct EmojiArtModel {
    background: Background,
    emojis: Vec<Emoji>,
    /// Source of fresh emoji ids; not part of the wire format.
    #[serde(skip_serializing)]
    unique_emoji_id: i32,
}

impl PartialEq for EmojiArtModel {
    fn eq(&self, other: &Self) -> bool {
        self.background == other.background && self.emojis == other.emojis
    }
}

impl Eq for EmojiArtModel {}

impl EmojiArtModel {
    /// Create an empty document with a blank background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decoding`](crate::CoreError::Decoding) if the
    /// bytes are not well-formed JSON of the documented shape.
    pub fn from_json(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read a document file and parse it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`](crate::CoreError::Io) if the file cannot be
    /// read, or [`CoreError::Decoding`](crate::CoreError::Decoding) if its
    /// contents do not parse.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// Serialize the document to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decoding`](crate::CoreError::Decoding) if
    /// serialization fails.
    pub fn to_json(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The current background.
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Replace the background with a new value.
    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    /// All placed emoji in z-order.
    #[must_use]
    pub fn emojis(&self) -> &[Emoji] {
        &self.emojis
    }

    /// Append a new emoji with a freshly allocated id.
    pub fn add_emoji(&mut self, text: impl Into<String>, at: Position, size: i32) {
        self.unique_emoji_id += 1;
        self.emojis.push(Emoji {
            text: text.into(),
            x: at.x,
            y: at.y,
            size,
            id: self.unique_emoji_id,
        });
    }

    /// Remove the emoji with the given id; silently does nothing if absent.
    pub fn delete_emoji(&mut self, id: i32) {
        if let Some(index) = self.emojis.iter().position(|emoji| emoji.id == id) {
            self.emojis.remove(index);
        }
    }

    /// Look up an emoji by id.
    #[must_use]
    pub fn emoji(&self, id: i32) -> Option<&Emoji> {
        self.emojis.iter().find(|emoji| emoji.id == id)
    }

    /// Look up an emoji by id for mutation of its position and size.
    pub fn emoji_mut(&mut self, id: i32) -> Option<&mut Emoji> {
        self.emojis.iter_mut().find(|emoji| emoji.id == id)
    }
}

/// Wire representation of [`EmojiArtModel`].
///
/// The id counter is rebuilt from the highest persisted id, so ids allocated
/// after a reload keep increasing.
#[derive(Deserialize)]
struct ModelRepr {
    #[serde(default)]
    background: Background,
    #[serde(default)]
    emojis: Vec<Emoji>,
}

impl From<ModelRepr> for EmojiArtModel {
    fn from(repr: ModelRepr) -> Self {
        let unique_emoji_id = repr.emojis.iter().map(|emoji| emoji.id).max().unwrap_or(0);
        Self {
            background: repr.background,
            emojis: repr.emojis,
            unique_emoji_id,
        }
    }
}
