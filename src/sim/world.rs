/// Overworld: the complete state of a running map.
///
/// Owns the four core components and the injected collaborators:
///
///   - `walls`     impassable tiles
///   - `triggers`  narrative triggers + firing session
///   - `input`     held directions and run state
///   - `engine`    character position and step budget
///   - `dialog`    typewriter for the open dialog
///
/// Time enters in two ways. `step()` (see `step.rs`) runs frame ticks;
/// `advance_clock()` lets wall-clock milliseconds pass for the run-arm
/// and reveal timers. The embedding loop calls both once per frame.

use tracing::{debug, info, warn};

use crate::config::OverworldConfig;
use crate::domain::direction::Direction;
use crate::domain::grid::{GridCoord, Placement, Region};
use crate::domain::walls::WallSet;
use super::dialog::DialogTypewriter;
use super::input::InputBuffer;
use super::movement::MovementEngine;
use super::ports::{Collaborators, OverworldEvent};
use super::trigger::{Trigger, TriggerRegistry};

/// What a confirm press did to the dialog.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DialogProgress {
    /// No dialog open; nothing happened.
    Inactive,
    /// The current page was still typing and is now shown in full.
    Skipped,
    NextPage,
    /// Last page dismissed; movement resumes.
    Closed,
}

pub struct Overworld {
    pub walls: WallSet,
    pub triggers: TriggerRegistry,
    pub input: InputBuffer,
    pub engine: MovementEngine,
    pub dialog: DialogTypewriter,
    pub(crate) collab: Collaborators,
    pub tick: u64,
}

impl Overworld {
    /// Fresh map with the character standing on `start`.
    pub fn new(config: &OverworldConfig, start: GridCoord, collab: Collaborators) -> Self {
        Overworld {
            walls: WallSet::new(),
            triggers: TriggerRegistry::new(),
            input: InputBuffer::new(config.timing.run_arm_ms),
            engine: MovementEngine::new(start, config.movement.walk_speed, config.movement.run_speed),
            dialog: DialogTypewriter::new(config.timing.reveal_min_ms, config.timing.reveal_max_ms),
            collab,
            tick: 0,
        }
    }

    /// Swap in a specific typewriter (e.g. a seeded one).
    pub fn with_typewriter(mut self, dialog: DialogTypewriter) -> Self {
        self.dialog = dialog;
        self
    }

    pub fn with_walls(mut self, walls: WallSet) -> Self {
        self.walls = walls;
        self
    }

    // ── Map authoring ──

    pub fn add_wall_cell(&mut self, at: GridCoord) {
        self.walls.add_cell(at);
    }

    pub fn add_wall_region(&mut self, region: Region) {
        self.walls.add_region(region);
    }

    pub fn add_wall(&mut self, placement: impl Into<Placement>) {
        self.walls.add(placement);
    }

    pub fn add_trigger(&mut self, at: GridCoord, trigger: Trigger) {
        self.triggers.add_trigger(at, trigger);
    }

    pub fn add_area_trigger(&mut self, region: Region, trigger: Trigger) {
        self.triggers.add_area_trigger(region, trigger);
    }

    pub fn remove_trigger(&mut self, at: GridCoord) -> bool {
        self.triggers.remove_trigger(at).is_some()
    }

    pub fn remove_triggers_by_tag(&mut self, tag: &str) -> usize {
        self.triggers.remove_triggers_by_tag(tag)
    }

    // ── Input ──

    pub fn press(&mut self, dir: Direction) {
        self.input.press(dir);
    }

    pub fn release(&mut self, dir: Direction) {
        self.input.release(dir);
    }

    pub fn start_move(&mut self, dir: Direction) {
        self.input.start_move(dir);
    }

    pub fn stop_move(&mut self, dir: Direction) {
        self.input.stop_move(dir);
    }

    // ── Clock ──

    /// Let `elapsed_ms` of wall-clock time pass. Returns the number of
    /// dialog characters revealed.
    pub fn advance_clock(&mut self, elapsed_ms: u64) -> usize {
        self.input.advance(elapsed_ms);
        self.dialog.advance(elapsed_ms)
    }

    // ── Position ──

    pub fn tile(&self) -> GridCoord {
        self.engine.tile()
    }

    pub fn pixel(&self) -> (i64, i64) {
        self.engine.pixel()
    }

    /// Jump straight to `tile`, abandoning any step in progress.
    /// The new position is saved; triggers at the destination don't fire.
    pub fn teleport(&mut self, tile: GridCoord) {
        self.engine.teleport(tile, self.collab.scene.as_mut());
        info!(%tile, "teleported");
        self.persist(tile);
    }

    /// Move to the saved position, if there is one. Returns where the
    /// character ended up.
    pub fn restore_position(&mut self) -> GridCoord {
        match self.collab.store.load() {
            Ok(Some(tile)) => {
                self.engine.teleport(tile, self.collab.scene.as_mut());
                info!(%tile, "position_restored");
            }
            Ok(None) => debug!("no_saved_position"),
            Err(error) => warn!(%error, "position_load_failed"),
        }
        self.engine.tile()
    }

    pub(crate) fn persist(&mut self, tile: GridCoord) {
        if let Err(error) = self.collab.store.save(tile) {
            warn!(%error, %tile, "position_save_failed");
        }
    }

    // ── Dialog ──

    pub fn dialog_active(&self) -> bool {
        self.triggers.dialog_active()
    }

    /// Show `pages` and pin the character until the dialog is closed.
    pub fn open_dialog(&mut self, pages: Vec<String>) {
        self.dialog.set_pages(pages.iter().cloned());
        self.triggers.set_dialog_active(true);
        debug!(pages = pages.len(), "dialog_opened");
        self.collab.events.publish(OverworldEvent::DialogOpened(pages));
    }

    /// Confirm press while a dialog may be open: finish the page, then
    /// turn it, then close.
    pub fn continue_dialog(&mut self) -> DialogProgress {
        if !self.dialog_active() {
            return DialogProgress::Inactive;
        }
        if !self.dialog.is_fully_revealed() {
            self.dialog.complete_reveal();
            return DialogProgress::Skipped;
        }
        if self.dialog.advance_page() {
            return DialogProgress::NextPage;
        }
        self.end_dialog();
        DialogProgress::Closed
    }

    /// Close the dialog without paging through it.
    pub fn end_dialog(&mut self) {
        self.dialog.clear();
        self.triggers.set_dialog_active(false);
        debug!("dialog_closed");
    }

    /// Session teardown: drop held input, cancel pending timers, forget
    /// what has fired.
    pub fn end_session(&mut self) {
        self.input.clear();
        self.dialog.clear();
        self.triggers.reset_session();
        info!(tick = self.tick, "session_ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::testkit::Recorder;

    fn world(rec: &Recorder) -> Overworld {
        Overworld::new(&OverworldConfig::default(), GridCoord::new(2, 2), rec.collaborators())
            .with_typewriter(DialogTypewriter::with_seed(50, 100, 3))
    }

    #[test]
    fn teleport_saves_and_shifts_scene() {
        let rec = Recorder::new();
        let mut w = world(&rec);
        w.teleport(GridCoord::new(5, 1));
        assert_eq!(w.tile(), GridCoord::new(5, 1));
        let log = rec.log.borrow();
        assert_eq!(log.saved, vec![GridCoord::new(5, 1)]);
        assert_eq!(log.total_shift(), (3 * 16, -16));
    }

    #[test]
    fn restore_position_uses_store() {
        let rec = Recorder::new();
        rec.log.borrow_mut().stored = Some(GridCoord::new(-4, 9));
        let mut w = world(&rec);
        assert_eq!(w.restore_position(), GridCoord::new(-4, 9));
        assert!(rec.log.borrow().saved.is_empty());
    }

    #[test]
    fn restore_without_save_stays_put() {
        let rec = Recorder::new();
        let mut w = world(&rec);
        assert_eq!(w.restore_position(), GridCoord::new(2, 2));
    }

    #[test]
    fn continue_dialog_sequence() {
        let rec = Recorder::new();
        let mut w = world(&rec);
        assert_eq!(w.continue_dialog(), DialogProgress::Inactive);

        w.open_dialog(vec!["Hello there".into(), "Bye".into()]);
        assert!(w.dialog_active());
        assert_eq!(
            rec.log.borrow().events,
            vec![OverworldEvent::DialogOpened(vec!["Hello there".into(), "Bye".into()])]
        );

        assert_eq!(w.continue_dialog(), DialogProgress::Skipped);
        assert_eq!(w.dialog.revealed(), "Hello there");
        assert_eq!(w.continue_dialog(), DialogProgress::NextPage);
        assert_eq!(w.dialog.revealed(), "B");
        assert_eq!(w.continue_dialog(), DialogProgress::Skipped);
        assert_eq!(w.continue_dialog(), DialogProgress::Closed);
        assert!(!w.dialog_active());
        assert!(!w.dialog.has_content());
    }

    #[test]
    fn advance_clock_drives_both_timers() {
        let rec = Recorder::new();
        let mut w = world(&rec);
        w.open_dialog(vec!["abc".into()]);
        w.press(Direction::Up);
        let revealed = w.advance_clock(500);
        assert_eq!(revealed, 2);
        assert!(w.dialog.is_fully_revealed());
        assert!(w.input.is_running());
    }

    #[test]
    fn end_session_cancels_timers() {
        let rec = Recorder::new();
        let mut w = world(&rec);
        w.press(Direction::Left);
        w.open_dialog(vec!["long text".into()]);
        w.end_session();
        assert!(!w.input.run_arm_pending());
        assert!(!w.dialog.reveal_pending());
        assert_eq!(w.input.effective_direction(), Direction::None);
        assert!(!w.dialog_active());
    }

    #[test]
    fn authoring_wrappers() {
        let rec = Recorder::new();
        let mut w = world(&rec);
        w.add_wall_cell(GridCoord::new(0, 0));
        w.add_wall_region(Region::from_corners(3, 3, 4, 4));
        w.add_wall(GridCoord::new(9, 9));
        assert_eq!(w.walls.len(), 6);

        w.add_trigger(GridCoord::new(1, 1), Trigger::new("npc").with_text("hi"));
        w.add_area_trigger(Region::from_corners(5, 5, 6, 5), Trigger::new("shop").with_text("buy"));
        assert!(w.remove_trigger(GridCoord::new(1, 1)));
        assert!(!w.remove_trigger(GridCoord::new(1, 1)));
        assert_eq!(w.remove_triggers_by_tag("shop"), 2);
        assert!(w.triggers.is_empty());
    }
}
