/// Error types.
///
/// None of these stop a tick: the overworld logs them and carries on with
/// "no animation change" / "position not persisted" / "default config".

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The animation provider has no animation under the requested name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnimationError {
    #[error("animation '{name}' not found")]
    Unknown { name: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode position: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to decode saved position: {0}")]
    Decode(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
