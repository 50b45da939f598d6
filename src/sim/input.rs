/// Input buffer: held directions + run state.
///
/// Every input source (keyboard, gamepad, on-screen buttons) funnels into
/// `press`/`release` (or their aliases `start_move`/`stop_move`), so they
/// all share one policy:
///
///   - Held directions form a stack, most recent first, no duplicates.
///     The effective direction is the top of the stack.
///   - A fresh press arms the run timer. If it elapses before any
///     release, `running` becomes true.
///   - Any release drops run state immediately. The next press re-arms
///     the timer from zero.

use tracing::trace;

use crate::domain::direction::Direction;
use super::timer::OneShotTimer;

/// Hold time before walking turns into running.
pub const DEFAULT_RUN_ARM_MS: u64 = 500;

#[derive(Clone, Debug)]
pub struct InputBuffer {
    pressed: Vec<Direction>,
    running: bool,
    run_arm: OneShotTimer,
    run_arm_ms: u64,
}

impl InputBuffer {
    pub fn new(run_arm_ms: u64) -> Self {
        InputBuffer {
            pressed: Vec::with_capacity(4),
            running: false,
            run_arm: OneShotTimer::new(),
            run_arm_ms,
        }
    }

    pub fn press(&mut self, dir: Direction) {
        if dir.is_none() || self.pressed.contains(&dir) {
            return;
        }
        self.pressed.insert(0, dir);
        self.run_arm.arm(self.run_arm_ms);
        trace!(?dir, stack = ?self.pressed, "direction_pressed");
    }

    pub fn release(&mut self, dir: Direction) {
        if let Some(idx) = self.pressed.iter().position(|&d| d == dir) {
            self.pressed.remove(idx);
        }
        self.run_arm.cancel();
        self.running = false;
        trace!(?dir, stack = ?self.pressed, "direction_released");
    }

    /// Program-driven press (gamepad, UI button). Same policy as `press`.
    pub fn start_move(&mut self, dir: Direction) {
        self.press(dir);
    }

    /// Program-driven release. Same policy as `release`.
    pub fn stop_move(&mut self, dir: Direction) {
        self.release(dir);
    }

    /// Direction the engine should walk this tick.
    pub fn effective_direction(&self) -> Direction {
        self.pressed.first().copied().unwrap_or(Direction::None)
    }

    /// Drop the top direction. Used when it points into a wall.
    pub fn pop_front(&mut self) -> Option<Direction> {
        if self.pressed.is_empty() {
            None
        } else {
            Some(self.pressed.remove(0))
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run_arm_pending(&self) -> bool {
        self.run_arm.is_pending()
    }

    pub fn held(&self) -> &[Direction] {
        &self.pressed
    }

    /// Let `elapsed_ms` pass on the run-arm timer.
    pub fn advance(&mut self, elapsed_ms: u64) {
        if self.run_arm.advance(elapsed_ms).is_some() {
            self.running = true;
            trace!("run_armed");
        }
    }

    /// Forget everything (focus loss, session end).
    pub fn clear(&mut self) {
        self.pressed.clear();
        self.run_arm.cancel();
        self.running = false;
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        InputBuffer::new(DEFAULT_RUN_ARM_MS)
    }
}
