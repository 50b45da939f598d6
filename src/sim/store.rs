/// Position persistence: remember the last tile the character stood on.
///
/// One file per namespace (usually one per map):
///
///   <save_dir>/position-<namespace>.toml
///
///   x = 12
///   y = -3
///
/// Written via temp file + rename so a crash mid-write never leaves a
/// truncated save behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::grid::GridCoord;
use crate::error::StoreError;
use super::ports::PositionStore;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct SavedPosition {
    x: i32,
    y: i32,
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, namespace: &str) -> Self {
        FileStore {
            path: dir.as_ref().join(file_name(namespace)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forget the saved position.
    pub fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path: self.path.clone(), source }),
        }
    }
}

impl PositionStore for FileStore {
    fn save(&mut self, tile: GridCoord) -> Result<(), StoreError> {
        let text = toml::to_string(&SavedPosition { x: tile.x, y: tile.y })?;
        write_atomic(&self.path, text.as_bytes())
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })
    }

    fn load(&self) -> Result<Option<GridCoord>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
        };
        let saved: SavedPosition = toml::from_str(&text)?;
        Ok(Some(GridCoord::new(saved.x, saved.y)))
    }
}

/// Keep namespaces filesystem-safe: anything outside `[A-Za-z0-9_-]`
/// becomes `_`.
fn file_name(namespace: &str) -> String {
    let clean: String = namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("position-{clean}.toml")
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Where saves live when the config doesn't say.
///
///   1. `$HOME/.local/share/overworld`
///   2. current working directory
pub fn default_save_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(home).join(".local/share/overworld");
        if fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

/// Keeps the position in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    saved: Option<GridCoord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_position(tile: GridCoord) -> Self {
        MemoryStore { saved: Some(tile) }
    }
}

impl PositionStore for MemoryStore {
    fn save(&mut self, tile: GridCoord) -> Result<(), StoreError> {
        self.saved = Some(tile);
        Ok(())
    }

    fn load(&self) -> Result<Option<GridCoord>, StoreError> {
        Ok(self.saved)
    }
}
