/// Collaborator interfaces consumed by the overworld core.
///
/// The core never renders, plays audio or touches storage itself; the
/// embedding application injects these at construction.

use crate::domain::direction::Direction;
use crate::domain::grid::GridCoord;
use crate::error::{AnimationError, StoreError};

/// Character sprite animation.
pub trait AnimationProvider {
    /// Switch to the animation for `dir` and (re)start playback.
    fn select_and_play(&mut self, dir: Direction) -> Result<(), AnimationError>;
    /// Freeze on the neutral standing frame.
    fn stop_at_rest_frame(&mut self);
}

/// Moves the visual root (camera) by the character's displacement.
pub trait SceneShifter {
    fn shift_by(&mut self, dx: i32, dy: i32);
}

/// Events announced to the rest of the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverworldEvent {
    DialogOpened(Vec<String>),
    LeftTriggerArea,
}

impl OverworldEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            OverworldEvent::DialogOpened(_) => "dialog-opened",
            OverworldEvent::LeftTriggerArea => "left-trigger-area",
        }
    }
}

pub trait EventPublisher {
    fn publish(&mut self, event: OverworldEvent);
}

/// Last known tile position, keyed by a namespace fixed at construction.
pub trait PositionStore {
    fn save(&mut self, tile: GridCoord) -> Result<(), StoreError>;
    fn load(&self) -> Result<Option<GridCoord>, StoreError>;
}

// ── No-op collaborators ──

/// Does nothing. Handy for headless embedding.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl AnimationProvider for Detached {
    fn select_and_play(&mut self, _dir: Direction) -> Result<(), AnimationError> {
        Ok(())
    }
    fn stop_at_rest_frame(&mut self) {}
}

impl SceneShifter for Detached {
    fn shift_by(&mut self, _dx: i32, _dy: i32) {}
}

impl EventPublisher for Detached {
    fn publish(&mut self, _event: OverworldEvent) {}
}

impl PositionStore for Detached {
    fn save(&mut self, _tile: GridCoord) -> Result<(), StoreError> {
        Ok(())
    }
    fn load(&self) -> Result<Option<GridCoord>, StoreError> {
        Ok(None)
    }
}

/// Everything the core calls out to, boxed so the world stays non-generic.
pub struct Collaborators {
    pub animation: Box<dyn AnimationProvider>,
    pub scene: Box<dyn SceneShifter>,
    pub events: Box<dyn EventPublisher>,
    pub store: Box<dyn PositionStore>,
}

impl Collaborators {
    pub fn detached() -> Self {
        Collaborators {
            animation: Box::new(Detached),
            scene: Box::new(Detached),
            events: Box::new(Detached),
            store: Box::new(Detached),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators::detached()
    }
}
