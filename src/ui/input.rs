/// Keyboard tracker.
///
/// Turns raw terminal key events into overworld input:
///   - Movement keys (WASD / arrows) become `Press` / `Release` edges,
///     so holding a key walks continuously and letting go stops.
///   - Enter / Space → `Confirm` (advance dialog)
///   - Esc / q / Ctrl+C → `Quit`
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// Fallback timing follows OS key repeat: a fresh press stays held for
/// `FIRST_REPEAT_WINDOW` (longer than the usual auto-repeat delay) so the
/// gap before the first repeat is not read as a release; once repeats
/// arrive, `REPEAT_GAP` is enough. A tap therefore walks for about half a
/// second, and holding keeps the key down long enough to arm running.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use overworld::Direction;

/// A key seen once is considered held this long, covering the OS delay
/// before auto-repeat starts.
const FIRST_REPEAT_WINDOW: Duration = Duration::from_millis(550);

/// Once a key is repeating, this long without a repeat means released.
const REPEAT_GAP: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, Debug)]
struct Hold {
    last: Instant,
    repeating: bool,
}

impl Hold {
    fn alive_at(&self, now: Instant) -> bool {
        let window = if self.repeating { REPEAT_GAP } else { FIRST_REPEAT_WINDOW };
        now.duration_since(self.last) < window
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyAction {
    Press(Direction),
    Release(Direction),
    Confirm,
    Quit,
}

pub struct KeyTracker {
    /// Last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Hold>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Directions reported as held after the previous drain.
    held_dirs: Vec<Direction>,

    ctrl_c: bool,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl KeyTracker {
    pub fn new() -> Self {
        KeyTracker {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            held_dirs: Vec::with_capacity(4),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and return what changed.
    /// Call this once per frame, before the simulation tick.
    pub fn poll_actions(&mut self) -> Vec<KeyAction> {
        self.fresh_presses.clear();
        self.ctrl_c = false;

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        self.expire(Instant::now());
        self.collect_actions()
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }
        let code = normalize(key.code);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&code);
            }
            // Not trusted yet; rely on timeout-based expiry instead.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(code, now);
                self.last_active.insert(code, Hold { last: now, repeating: was_held });
                if !was_held {
                    self.fresh_presses.push(code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, hold| hold.alive_at(now));
    }

    /// Diff held directions against last frame; add edge actions.
    fn collect_actions(&mut self) -> Vec<KeyAction> {
        let mut actions = Vec::new();
        let now_held: Vec<Direction> = Direction::CARDINAL
            .iter()
            .copied()
            .filter(|d| self.last_active.keys().any(|k| direction_for(*k) == Some(*d)))
            .collect();

        for dir in &self.held_dirs {
            if !now_held.contains(dir) {
                actions.push(KeyAction::Release(*dir));
            }
        }
        // Fresh presses first, in the order they arrived, so the newest
        // ends up on top of the input stack.
        for code in &self.fresh_presses {
            if let Some(dir) = direction_for(*code) {
                if !self.held_dirs.contains(&dir) && now_held.contains(&dir) {
                    actions.push(KeyAction::Press(dir));
                }
            }
        }
        self.held_dirs = now_held;

        if self.fresh_presses.iter().any(|c| matches!(c, KeyCode::Enter | KeyCode::Char(' '))) {
            actions.push(KeyAction::Confirm);
        }
        if self.ctrl_c || self.fresh_presses.iter().any(|c| matches!(c, KeyCode::Esc | KeyCode::Char('q'))) {
            actions.push(KeyAction::Quit);
        }
        actions
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code).is_some_and(|hold| hold.alive_at(now))
    }
}

/// Fold letter case so Shift doesn't create a second "key".
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') => Some(Direction::Right),
        _ => None,
    }
}
