//! # EmojiArt Core
//!
//! The persisted data layer of the emoji drawing board: the document model
//! (a background plus an ordered list of placed emoji), its compact JSON
//! format, and the palette library of curated emoji sets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               emojiart-core                 │
//! ├─────────────────────────────────────────────┤
//! │  EmojiArtModel    │  PaletteStore           │
//! │  - Background     │  - Ordered palettes     │
//! │  - Placed emoji   │  - Stable integer ids   │
//! │  - JSON document  │  - Key-value backend    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! This crate is purely synchronous. The stateful controller that drives
//! mutations, autosave, and background-image fetching lives in
//! `emojiart-document`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod error;
pub mod geometry;
pub mod model;
pub mod palette;

pub use background::Background;
pub use error::{CoreError, CoreResult};
pub use geometry::Position;
pub use model::{Emoji, EmojiArtModel};
pub use palette::{FileBackend, MemoryBackend, Palette, PaletteBackend, PaletteStore};

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
