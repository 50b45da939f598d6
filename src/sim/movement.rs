/// Movement engine: the per-tick locomotion state machine.
///
/// ## States
///
///   Idle      no step budget, nothing queued
///   Stepping  budget > 0, moving `stride` sub-units per tick
///   Blocked   the queued direction points into a wall (or off the edge
///             of the `i32` tile plane); it is popped from the input
///             stack and nothing moves this tick
///
/// ## Tick order
///
///   1. Commit: budget exhausted and a direction is queued →
///      turn (animation on heading change), wall check on the
///      candidate tile, arm a full tile of budget.
///   2. Advance: spend `stride` (walk or run) of the budget, shift
///      the scene by the same amount. Budget hitting zero = arrival.
///   3. Rest: nothing to do → heading None, rest frame.
///
/// The wall check only happens at commit time, so a step in progress is
/// never rolled back. Direction changes are picked up at the next commit.
///
/// While a dialog is open the engine keeps the character on the grid:
/// any armed budget is discarded and the pixel position is snapped to
/// its tile. No displacement, no arrival.
///
/// Pixels are `i64`; scene deltas stay `i32` and large jumps are handed
/// to the shifter in pieces.

use tracing::{debug, warn};

use crate::domain::direction::Direction;
use crate::domain::grid::{GridCoord, TILE_SIZE};
use crate::domain::walls::WallSet;
use super::input::InputBuffer;
use super::ports::{AnimationProvider, SceneShifter};

pub const DEFAULT_WALK_SPEED: i32 = 1;
pub const DEFAULT_RUN_SPEED: i32 = 2;

/// What a single tick did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    Idle,
    /// The queued direction was dropped; `target` is the wall tile, or
    /// the current tile when the step would leave the coordinate plane.
    Blocked { target: GridCoord },
    Moving,
    /// A step finished exactly on this tile.
    Arrived(GridCoord),
    /// Dialog open: position pinned to the grid. The pin floors to the
    /// tile under the pixel position, so a step heading Left or Up that
    /// was interrupted lands on its target tile without an `Arrived`
    /// (no trigger check, no save for that tile).
    Held,
}

#[derive(Clone, Debug)]
pub struct MovementEngine {
    px: i64,
    py: i64,
    heading: Direction,
    budget: i32,
    walk_speed: i32,
    run_speed: i32,
}

impl MovementEngine {
    pub fn new(start: GridCoord, walk_speed: i32, run_speed: i32) -> Self {
        let (px, py) = start.to_pixel();
        MovementEngine {
            px,
            py,
            heading: Direction::None,
            budget: 0,
            walk_speed: walk_speed.clamp(1, TILE_SIZE),
            run_speed: run_speed.clamp(1, TILE_SIZE),
        }
    }

    /// Tile containing the character's pixel position.
    pub fn tile(&self) -> GridCoord {
        GridCoord::from_pixel(self.px, self.py)
    }

    pub fn pixel(&self) -> (i64, i64) {
        (self.px, self.py)
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    /// Sub-units left in the current step.
    pub fn budget(&self) -> i32 {
        self.budget
    }

    pub fn is_stepping(&self) -> bool {
        self.budget > 0
    }

    /// Place the character exactly on `tile`, cancelling any step in flight.
    pub fn teleport(&mut self, tile: GridCoord, scene: &mut dyn SceneShifter) {
        let (tx, ty) = tile.to_pixel();
        let (dx, dy) = (tx - self.px, ty - self.py);
        self.px = tx;
        self.py = ty;
        self.budget = 0;
        shift_scene(scene, dx, dy);
    }

    pub fn tick(
        &mut self,
        input: &mut InputBuffer,
        walls: &WallSet,
        dialog_active: bool,
        anim: &mut dyn AnimationProvider,
        scene: &mut dyn SceneShifter,
    ) -> TickOutcome {
        // ── 1. Commit to the next tile ──
        let queued = input.effective_direction();
        if !queued.is_none() && self.budget <= 0 {
            if queued != self.heading {
                self.heading = queued;
                if let Err(error) = anim.select_and_play(queued) {
                    warn!(%error, dir = queued.name(), "animation_select_failed");
                }
            }

            let here = self.tile();
            let Some(target) = here.offset(self.heading) else {
                input.pop_front();
                warn!(tile = %here, dir = self.heading.name(), "step_off_plane_edge");
                return TickOutcome::Blocked { target: here };
            };
            if walls.contains(target) {
                input.pop_front();
                debug!(%target, dir = self.heading.name(), "step_blocked");
                return TickOutcome::Blocked { target };
            }
            self.budget = TILE_SIZE;
        }

        // ── 2. Spend budget ──
        if self.budget > 0 {
            if dialog_active {
                self.snap_to_grid(scene);
                return TickOutcome::Held;
            }

            let stride = if input.is_running() { self.run_speed } else { self.walk_speed };
            let advance = stride.min(self.budget);
            let (dx, dy) = self.heading.delta();
            self.px += i64::from(dx * advance);
            self.py += i64::from(dy * advance);
            self.budget -= advance;
            scene.shift_by(dx * advance, dy * advance);

            if self.budget == 0 {
                return TickOutcome::Arrived(self.tile());
            }
            return TickOutcome::Moving;
        }

        // ── 3. Rest ──
        if !self.heading.is_none() {
            self.heading = Direction::None;
            anim.stop_at_rest_frame();
        }
        TickOutcome::Idle
    }

    fn snap_to_grid(&mut self, scene: &mut dyn SceneShifter) {
        self.budget = 0;
        let tile = self.tile();
        self.teleport(tile, scene);
    }
}

/// Hand `(dx, dy)` to the shifter in `i32`-sized pieces.
fn shift_scene(scene: &mut dyn SceneShifter, mut dx: i64, mut dy: i64) {
    while dx != 0 || dy != 0 {
        let sx = dx.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        let sy = dy.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        scene.shift_by(sx as i32, sy as i32);
        dx -= sx;
        dy -= sy;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
