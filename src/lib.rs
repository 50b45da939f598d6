//! Tile-grid overworld core.
//!
//! A character walks a grid of 16×16 tiles, one whole tile per step,
//! blocked by walls. Stepping onto trigger tiles opens paged dialogs,
//! revealed one character at a time, and runs scripted actions.
//!
//! ```text
//!   press/release ─► InputBuffer ─► MovementEngine ─► TriggerRegistry
//!                                        │                  │
//!                                   SceneShifter     DialogTypewriter
//!                                   Animation        EventPublisher
//!                                   PositionStore
//! ```
//!
//! Rendering, audio and persistence stay outside: the embedding
//! application passes them in as `sim::ports::Collaborators`.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;

pub use config::OverworldConfig;
pub use domain::direction::Direction;
pub use domain::grid::{GridCoord, GridKey, Placement, Region, TILE_SIZE};
pub use sim::step::step;
pub use sim::trigger::Trigger;
pub use sim::world::{DialogProgress, Overworld};
