/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or
/// `~/.local/share/overworld`). Falls back to sensible defaults if the
/// file is missing or incomplete; out-of-range values are normalized.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::grid::TILE_SIZE;
use crate::error::ConfigError;
use crate::sim::dialog::{DEFAULT_REVEAL_MAX_MS, DEFAULT_REVEAL_MIN_MS};
use crate::sim::input::DEFAULT_RUN_ARM_MS;
use crate::sim::movement::{DEFAULT_RUN_SPEED, DEFAULT_WALK_SPEED};

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverworldConfig {
    pub timing: TimingConfig,
    pub movement: MovementConfig,
    pub storage: StorageConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    /// Frame clock period: one movement tick per frame.
    pub tick_rate_ms: u64,
    /// Hold time before walking becomes running.
    pub run_arm_ms: u64,
    pub reveal_min_ms: u64,
    pub reveal_max_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementConfig {
    /// Sub-units per tick while walking / running (1..=TILE_SIZE).
    pub walk_speed: i32,
    pub run_speed: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// Position-save namespace, typically the map name.
    pub namespace: String,
    /// None = default data directory.
    pub save_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    storage: TomlStorage,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_run_arm")]
    run_arm_ms: u64,
    #[serde(default = "default_reveal_min")]
    reveal_min_ms: u64,
    #[serde(default = "default_reveal_max")]
    reveal_max_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_walk_speed")]
    walk_speed: i32,
    #[serde(default = "default_run_speed")]
    run_speed: i32,
}

#[derive(Deserialize, Debug)]
struct TomlStorage {
    #[serde(default = "default_namespace")]
    namespace: String,
    #[serde(default)]
    save_dir: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 frames per second
fn default_run_arm() -> u64 { DEFAULT_RUN_ARM_MS }
fn default_reveal_min() -> u64 { DEFAULT_REVEAL_MIN_MS }
fn default_reveal_max() -> u64 { DEFAULT_REVEAL_MAX_MS }
fn default_walk_speed() -> i32 { DEFAULT_WALK_SPEED }
fn default_run_speed() -> i32 { DEFAULT_RUN_SPEED }
fn default_namespace() -> String { "overworld".into() }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            run_arm_ms: default_run_arm(),
            reveal_min_ms: default_reveal_min(),
            reveal_max_ms: default_reveal_max(),
        }
    }
}

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            walk_speed: default_walk_speed(),
            run_speed: default_run_speed(),
        }
    }
}

impl Default for TomlStorage {
    fn default() -> Self {
        TomlStorage {
            namespace: default_namespace(),
            save_dir: String::new(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl OverworldConfig {
    /// Load config from `config.toml`.
    /// Missing file, unreadable file or parse errors fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if !path.exists() {
                continue;
            }
            match OverworldConfig::from_file(&path) {
                Ok(cfg) => {
                    info!(path = %path.display(), "config_loaded");
                    return cfg;
                }
                Err(error) => {
                    warn!(%error, "config_invalid_using_defaults");
                    return OverworldConfig::default();
                }
            }
        }
        OverworldConfig::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        OverworldConfig::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        Ok(OverworldConfig::from_toml(toml_cfg))
    }

    fn from_toml(t: TomlConfig) -> Self {
        let (mut reveal_min_ms, mut reveal_max_ms) = (t.timing.reveal_min_ms, t.timing.reveal_max_ms);
        if reveal_min_ms > reveal_max_ms {
            warn!(reveal_min_ms, reveal_max_ms, "reveal_range_inverted_swapping");
            std::mem::swap(&mut reveal_min_ms, &mut reveal_max_ms);
        }

        OverworldConfig {
            timing: TimingConfig {
                tick_rate_ms: t.timing.tick_rate_ms.max(1),
                run_arm_ms: t.timing.run_arm_ms,
                reveal_min_ms,
                reveal_max_ms,
            },
            movement: MovementConfig {
                walk_speed: clamp_speed("walk_speed", t.movement.walk_speed),
                run_speed: clamp_speed("run_speed", t.movement.run_speed),
            },
            storage: StorageConfig {
                namespace: t.storage.namespace,
                save_dir: if t.storage.save_dir.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(t.storage.save_dir))
                },
            },
            gamepad: GamepadConfig {
                confirm: t.gamepad.confirm,
                cancel: t.gamepad.cancel,
            },
        }
    }
}

impl Default for OverworldConfig {
    fn default() -> Self {
        OverworldConfig::from_toml(TomlConfig::default())
    }
}

fn clamp_speed(name: &str, value: i32) -> i32 {
    let clamped = value.clamp(1, TILE_SIZE);
    if clamped != value {
        warn!(setting = name, value, clamped, "speed_out_of_range");
    }
    clamped
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/overworld");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = OverworldConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, OverworldConfig::default());
        assert_eq!(cfg.timing.run_arm_ms, 500);
        assert_eq!(cfg.timing.reveal_min_ms, 50);
        assert_eq!(cfg.timing.reveal_max_ms, 100);
        assert_eq!(cfg.movement.walk_speed, 1);
        assert_eq!(cfg.movement.run_speed, 2);
        assert_eq!(cfg.storage.namespace, "overworld");
        assert_eq!(cfg.storage.save_dir, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = OverworldConfig::from_toml_str(
            "[timing]\nrun_arm_ms = 250\n\n[storage]\nnamespace = \"cave\"\nsave_dir = \"saves\"\n",
        )
        .unwrap();
        assert_eq!(cfg.timing.run_arm_ms, 250);
        assert_eq!(cfg.timing.tick_rate_ms, 16);
        assert_eq!(cfg.storage.namespace, "cave");
        assert_eq!(cfg.storage.save_dir, Some(PathBuf::from("saves")));
        assert_eq!(cfg.gamepad.confirm, vec!["A", "Start"]);
    }

    #[test]
    fn out_of_range_values_are_normalized() {
        let cfg = OverworldConfig::from_toml_str(
            "[timing]\nreveal_min_ms = 90\nreveal_max_ms = 20\ntick_rate_ms = 0\n\n[movement]\nwalk_speed = 0\nrun_speed = 99\n",
        )
        .unwrap();
        assert_eq!((cfg.timing.reveal_min_ms, cfg.timing.reveal_max_ms), (20, 90));
        assert_eq!(cfg.timing.tick_rate_ms, 1);
        assert_eq!(cfg.movement.walk_speed, 1);
        assert_eq!(cfg.movement.run_speed, TILE_SIZE);
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(matches!(
            OverworldConfig::from_toml_str("[timing\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = OverworldConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
