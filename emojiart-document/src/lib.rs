//! # EmojiArt Document
//!
//! The stateful controller around one [`emojiart_core::EmojiArtModel`]:
//! mutation intents, state-change publication, coalesced autosave, and the
//! asynchronous background-image fetch pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │               EmojiArtDocument                   │
//! ├──────────────────────────────────────────────────┤
//! │  Intents          │  Side effects                │
//! │  - set background │  - debounced autosave write  │
//! │  - add/delete     │  - background fetch + decode │
//! │  - move/scale     │  - event broadcast           │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The presentation layer calls intents and reads the published state; it
//! never touches the model directly. All intents mutate under a single lock,
//! so the model only ever changes on one logical mutation context. Fetch and
//! autosave run on spawned tasks and re-acquire that lock before touching
//! shared state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod fetch;

pub use document::{DocumentConfig, DocumentEvent, EmojiArtDocument, FetchStatus};
pub use fetch::{decode_image, BackgroundImage, HttpFetcher, ImageFetcher};

/// Document crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
