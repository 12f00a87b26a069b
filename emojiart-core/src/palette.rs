//! The palette library: named emoji sets with persisted storage.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// A named, ordered set of emoji glyphs offered for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Display name of the set.
    pub name: String,
    /// The glyphs, concatenated into one string.
    pub emojis: String,
    id: i32,
}

impl Palette {
    /// The stable identity of this palette within its store.
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }
}

/// Key-value persistence consumed by [`PaletteStore`].
///
/// `set` is fire-and-forget: implementations log failures instead of
/// propagating them, since in-memory state stays authoritative either way.
pub trait PaletteBackend: Send + Sync {
    /// Read the bytes stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]);
}

/// In-memory backend, mainly for tests and ephemeral stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaletteBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8]) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_vec());
    }
}

/// Directory-backed backend: one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl PaletteBackend for FileBackend {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &[u8]) {
        let path = self.path_for(key);
        if let Err(e) = std::fs::write(&path, value) {
            tracing::warn!("Failed to persist {key} to {}: {e}", path.display());
        }
    }
}

/// Sanitize a storage key for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The built-in palettes used to seed a store whose storage is empty.
const BUILTIN_PALETTES: &[(&str, &str)] = &[
    ("Vehicles", "🚗🚕🚙🚌🏎️🚜🚓🚒🚐🛻🚚🚛🛵🚲🛴🩼🏍️🛺🚖🚝🚄🚊🚀🛸🚁🛶⛵️🚤🚋🛥️🛳️⛴️🚢"),
    ("Sports", "⚽️🏀🏈⚾️🥎🎾🏐🏉🥏🎱🪀🏓🏸🏒🏑🥍🏏🪃🥅⛳️🪁🏹🥊"),
    ("Music", "🎬🎤🎧🎼🎹🥁🪘🎷🎺🪗🎸🪕🎻"),
    (
        "Animals",
        "🐔🐧🐦🐤🐣🐥🦆🦅🦉🦇🐺🐗🐴🦄🐝🪱🐛🦋🐌🐢🐍🦎🦖🦕🐬🦑🦈🦭🐅🐆🦓🦍🦧🦣🐘🦛🐃🦬🦘🦒🐫🐪🦏🐂🐄🐏🐖🐑🦙🐈🐩🐕🦌🐐🐈‍⬛🐓🦃🦤🦜🐇🕊️🦢🦫🦦🐁🐀🐿️",
    ),
    ("Animal Faces", "🐶🐱🐭🐹🐰🦊🐻🐼🐻‍❄️🐨🐯🦁🐮🐷🐽🐸🐵🙈🙉🙊"),
    ("Flora", "🌵🎄🌲🌳🌴🌱🌿☘️🍀🪴🎋🍃🍁🍂🍄🌺🌹🌼🌻"),
    ("Weather", "☀️🌤️⛅️🌥️☁️🌦️🌧️⛈️🌩️🌨️❄️☔️🌪️🌈☂️💦💧💨🌫️"),
    ("COVID", "😷🤧🦠🤒"),
    (
        "Faces",
        "😀😃😄😁😆🥹😅🙂😇😊☺️🥲🤣😂🙃😉😌😍🥰😘😗🤪😜😛😋😚😙🤨🧐🤓😎🥸🤩🥳😭😤😠😡🤬🤯😳😥😰😨😱😶‍🌫️🥶🥵😓🤗🤔🫣🤭🫢🫡🤫🫠🤥😶🫥😐🫤😲🥱😴🤢🤮🤧😷🤑🤕🤒🤡🤠",
    ),
];

/// An ordered, never-empty list of palettes persisted under a named slot.
///
/// Every successful mutation re-serializes the full list to the backend
/// (no coalescing). Ids are assigned `max(existing) + 1` and never reused.
pub struct PaletteStore {
    name: String,
    palettes: Vec<Palette>,
    backend: Box<dyn PaletteBackend>,
}

impl std::fmt::Debug for PaletteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaletteStore")
            .field("name", &self.name)
            .field("palettes", &self.palettes)
            .finish_non_exhaustive()
    }
}

impl PaletteStore {
    /// Open the store named `name`, restoring its palettes from `backend`.
    ///
    /// If the slot is absent, corrupt, or holds an empty list, the store is
    /// seeded with the built-in palettes so it is never empty.
    pub fn new(name: impl Into<String>, backend: Box<dyn PaletteBackend>) -> Self {
        let mut store = Self {
            name: name.into(),
            palettes: Vec::new(),
            backend,
        };
        store.restore();
        if store.palettes.is_empty() {
            tracing::info!("Seeding palette store '{}' with built-ins", store.name);
            for (name, emojis) in BUILTIN_PALETTES {
                let index = store.palettes.len();
                store.insert_palette(*name, *emojis, index);
            }
        }
        store
    }

    /// The name of this store's storage slot.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All palettes in order.
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// Number of palettes; at least 1 after initialization.
    #[must_use]
    pub fn count(&self) -> usize {
        self.palettes.len()
    }

    /// The palette at `index`, clamped into range.
    ///
    /// Never out of bounds: an overlarge index yields the last palette.
    #[must_use]
    pub fn palette_at(&self, index: usize) -> &Palette {
        let safe_index = index.min(self.palettes.len() - 1);
        &self.palettes[safe_index]
    }

    /// Insert a new palette at `index` (clamped into `[0, count]`).
    ///
    /// The new palette gets id `max(existing ids) + 1`, so ids are never
    /// reused even after removals. Persists the updated list.
    pub fn insert_palette(
        &mut self,
        name: impl Into<String>,
        emojis: impl Into<String>,
        index: usize,
    ) {
        let unique = self.palettes.iter().map(Palette::id).max().unwrap_or(0) + 1;
        let palette = Palette {
            name: name.into(),
            emojis: emojis.into(),
            id: unique,
        };
        let safe_index = index.min(self.palettes.len());
        self.palettes.insert(safe_index, palette);
        self.persist();
    }

    /// Remove the palette at `index` (clamped into range) and return a safe
    /// next-selection index, `index % new_count`.
    ///
    /// Refuses to remove the last remaining palette; the store never becomes
    /// empty. Persists on successful removal.
    pub fn remove_palette(&mut self, index: usize) -> usize {
        if self.palettes.len() > 1 {
            let safe_index = index.min(self.palettes.len() - 1);
            self.palettes.remove(safe_index);
            self.persist();
        }
        index % self.palettes.len()
    }

    fn storage_key(&self) -> String {
        format!("PaletteStore:{}", self.name)
    }

    fn restore(&mut self) {
        if let Some(bytes) = self.backend.get(&self.storage_key()) {
            match serde_json::from_slice::<Vec<Palette>>(&bytes) {
                Ok(palettes) => {
                    tracing::debug!(
                        "Restored {} palettes for store '{}'",
                        palettes.len(),
                        self.name
                    );
                    self.palettes = palettes;
                }
                Err(e) => {
                    tracing::warn!("Ignoring corrupt palette data for '{}': {e}", self.name);
                }
            }
        }
    }

    fn persist(&self) {
        match serde_json::to_vec(&self.palettes) {
            Ok(bytes) => self.backend.set(&self.storage_key(), &bytes),
            Err(e) => tracing::warn!("Failed to encode palettes for '{}': {e}", self.name),
        }
    }
}
