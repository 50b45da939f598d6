/// Trigger registry: location-bound narrative triggers.
///
/// A trigger is a tagged bundle of dialog pages and actions. Point
/// triggers occupy one tile; an area trigger is one shared payload
/// registered at every tile of its rectangle.
///
/// ## Firing policy (`check_arrival`, once per completed step)
///
///   no trigger here      → clear `last_fired_tag` if no orthogonal
///                          neighbour holds a trigger ("left the area")
///   trigger, no pages    → fires on every entry, session untouched
///   trigger with pages   → suppressed if this tile is `last_fired_key`
///                          or its tag equals `last_fired_tag`;
///                          otherwise fires and records both
///
/// Tag suppression keeps an area from re-firing on every tile crossed
/// inside it. Key suppression stops stepping off and back onto the same
/// tile from re-opening the same dialog.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::domain::grid::{GridCoord, GridKey, Placement, Region};

/// Side effect run when a trigger fires.
pub type TriggerAction = Rc<dyn Fn()>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriggerKind {
    Point,
    Area(Region),
}

#[derive(Clone)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub tag: String,
    pub pages: Vec<String>,
    pub actions: Vec<TriggerAction>,
}

impl Trigger {
    /// A trigger with no pages and no actions. Build it up with the
    /// `with_*` methods, then hand it to the registry.
    pub fn new(tag: impl Into<String>) -> Self {
        Trigger {
            kind: TriggerKind::Point,
            tag: tag.into(),
            pages: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages = pages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_pages([text.into()])
    }

    pub fn with_action(mut self, action: impl Fn() + 'static) -> Self {
        self.actions.push(Rc::new(action));
        self
    }

    pub fn has_pages(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Run every action in registration order.
    pub fn run_actions(&self) {
        for action in &self.actions {
            action();
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .field("pages", &self.pages)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Runtime de-duplication state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerSession {
    pub last_fired_key: Option<GridKey>,
    pub last_fired_tag: Option<String>,
    pub dialog_active: bool,
}

/// Result of an arrival check.
#[derive(Clone, Debug)]
pub enum Arrival {
    Quiet,
    /// No trigger here or next door; the remembered tag was dropped.
    LeftArea,
    Fired(Rc<Trigger>),
}

impl Arrival {
    pub fn fired(&self) -> Option<&Rc<Trigger>> {
        match self {
            Arrival::Fired(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: HashMap<GridKey, Rc<Trigger>>,
    session: TriggerSession,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        TriggerRegistry::default()
    }

    // ── Authoring ──

    /// Register a point trigger at `at`, replacing whatever was there.
    pub fn add_trigger(&mut self, at: GridCoord, mut trigger: Trigger) {
        trigger.kind = TriggerKind::Point;
        self.triggers.insert(at.key(), Rc::new(trigger));
    }

    /// Register one shared trigger at every tile of `region`.
    pub fn add_area_trigger(&mut self, region: Region, mut trigger: Trigger) {
        trigger.kind = TriggerKind::Area(region);
        let shared = Rc::new(trigger);
        for cell in region.cells() {
            self.triggers.insert(cell.key(), Rc::clone(&shared));
        }
    }

    pub fn place(&mut self, placement: impl Into<Placement>, trigger: Trigger) {
        match placement.into() {
            Placement::Point(c) => self.add_trigger(c, trigger),
            Placement::Region(r) => self.add_area_trigger(r, trigger),
        }
    }

    pub fn remove_trigger(&mut self, at: GridCoord) -> Option<Rc<Trigger>> {
        self.triggers.remove(&at.key())
    }

    /// Remove every tile whose trigger carries `tag`. Returns tiles removed.
    pub fn remove_triggers_by_tag(&mut self, tag: &str) -> usize {
        let before = self.triggers.len();
        self.triggers.retain(|_, t| t.tag != tag);
        before - self.triggers.len()
    }

    // ── Queries ──

    pub fn get(&self, at: GridCoord) -> Option<&Rc<Trigger>> {
        self.triggers.get(&at.key())
    }

    pub fn contains(&self, at: GridCoord) -> bool {
        self.triggers.contains_key(&at.key())
    }

    /// Number of occupied tiles (an area counts once per tile).
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    // ── Session ──

    pub fn session(&self) -> &TriggerSession {
        &self.session
    }

    pub fn dialog_active(&self) -> bool {
        self.session.dialog_active
    }

    pub fn set_dialog_active(&mut self, active: bool) {
        self.session.dialog_active = active;
    }

    /// Allow the last fired tile to fire again on its next entry.
    pub fn reset_last_fired_key(&mut self) {
        self.session.last_fired_key = None;
    }

    pub fn reset_session(&mut self) {
        self.session = TriggerSession::default();
    }

    /// Decide whether arriving at `tile` fires a trigger.
    pub fn check_arrival(&mut self, tile: GridCoord) -> Arrival {
        let key = tile.key();

        let trigger = match self.triggers.get(&key) {
            Some(t) => Rc::clone(t),
            None => {
                if self.session.last_fired_tag.is_some()
                    && !tile.neighbors().any(|n| self.contains(n))
                {
                    debug!(%tile, tag = ?self.session.last_fired_tag, "left_trigger_area");
                    self.session.last_fired_tag = None;
                    return Arrival::LeftArea;
                }
                return Arrival::Quiet;
            }
        };

        if !trigger.has_pages() {
            debug!(%tile, tag = %trigger.tag, "action_trigger_fired");
            return Arrival::Fired(trigger);
        }

        let same_tile = self.session.last_fired_key == Some(key);
        let same_tag = self.session.last_fired_tag.as_deref() == Some(trigger.tag.as_str());
        if same_tile || same_tag {
            debug!(%tile, tag = %trigger.tag, same_tile, same_tag, "trigger_suppressed");
            return Arrival::Quiet;
        }

        self.session.last_fired_key = Some(key);
        self.session.last_fired_tag = Some(trigger.tag.clone());
        debug!(%tile, tag = %trigger.tag, pages = trigger.pages.len(), "trigger_fired");
        Arrival::Fired(trigger)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn at(x: i32, y: i32) -> GridCoord {
        GridCoord::new(x, y)
    }

    fn fired_tag(a: &Arrival) -> Option<&str> {
        a.fired().map(|t| t.tag.as_str())
    }

    #[test]
    fn point_trigger_fires_once_per_entry() {
        let mut reg = TriggerRegistry::new();
        reg.add_trigger(at(3, 3), Trigger::new("npc").with_text("Hello"));

        assert!(matches!(reg.check_arrival(at(2, 3)), Arrival::Quiet));
        assert_eq!(fired_tag(&reg.check_arrival(at(3, 3))), Some("npc"));
        assert_eq!(reg.session().last_fired_key, Some(at(3, 3).key()));
        assert_eq!(reg.session().last_fired_tag.as_deref(), Some("npc"));

        // Re-arrival at the same tile stays quiet.
        assert!(matches!(reg.check_arrival(at(3, 3)), Arrival::Quiet));
    }

    #[test]
    fn key_suppression_outlives_leaving_the_area() {
        let mut reg = TriggerRegistry::new();
        reg.add_trigger(at(0, 0), Trigger::new("sign").with_text("Read me"));
        assert!(reg.check_arrival(at(0, 0)).fired().is_some());

        // Adjacent tile: neighbour still holds a trigger, tag kept.
        assert!(matches!(reg.check_arrival(at(1, 0)), Arrival::Quiet));
        assert!(reg.session().last_fired_tag.is_some());

        // Two away: tag dropped.
        assert!(matches!(reg.check_arrival(at(2, 0)), Arrival::LeftArea));
        assert!(reg.session().last_fired_tag.is_none());

        // Key still remembered.
        assert!(matches!(reg.check_arrival(at(0, 0)), Arrival::Quiet));
        reg.reset_last_fired_key();
        assert!(reg.check_arrival(at(0, 0)).fired().is_some());
    }

    #[test]
    fn area_trigger_fires_once_per_tag() {
        let mut reg = TriggerRegistry::new();
        reg.add_area_trigger(
            Region::from_corners(5, 5, 8, 6),
            Trigger::new("shop").with_pages(["Welcome!", "Browse freely."]),
        );
        assert_eq!(reg.len(), 8);

        let mut fires = 0;
        for x in 5..=8 {
            if reg.check_arrival(at(x, 5)).fired().is_some() {
                fires += 1;
            }
        }
        for x in (5..=8).rev() {
            if reg.check_arrival(at(x, 6)).fired().is_some() {
                fires += 1;
            }
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn area_cells_share_one_payload() {
        let mut reg = TriggerRegistry::new();
        reg.add_area_trigger(Region::from_corners(0, 0, 1, 1), Trigger::new("pond"));
        let a = reg.get(at(0, 0)).cloned().unwrap();
        let b = reg.get(at(1, 1)).cloned().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.kind, TriggerKind::Area(Region::from_corners(0, 0, 1, 1)));
    }

    #[test]
    fn leaving_and_reentering_area_fires_again_elsewhere() {
        let mut reg = TriggerRegistry::new();
        reg.add_area_trigger(Region::from_corners(0, 0, 2, 0), Trigger::new("grass").with_text("Rustle"));
        assert!(reg.check_arrival(at(0, 0)).fired().is_some());
        assert!(matches!(reg.check_arrival(at(1, 0)), Arrival::Quiet));
        // Walk away far enough to clear the tag.
        assert!(matches!(reg.check_arrival(at(1, 1)), Arrival::Quiet));
        assert!(matches!(reg.check_arrival(at(1, 2)), Arrival::LeftArea));
        // Entering at a different tile than the last fired one fires.
        assert!(reg.check_arrival(at(2, 0)).fired().is_some());
    }

    #[test]
    fn different_tag_fires_inside_adjacent_areas() {
        let mut reg = TriggerRegistry::new();
        reg.add_trigger(at(0, 0), Trigger::new("a").with_text("A"));
        reg.add_trigger(at(1, 0), Trigger::new("b").with_text("B"));
        assert_eq!(fired_tag(&reg.check_arrival(at(0, 0))), Some("a"));
        assert_eq!(fired_tag(&reg.check_arrival(at(1, 0))), Some("b"));
        assert_eq!(fired_tag(&reg.check_arrival(at(0, 0))), Some("a"));
    }

    #[test]
    fn pageless_trigger_fires_every_time_and_leaves_session() {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let mut reg = TriggerRegistry::new();
        reg.add_trigger(at(4, 4), Trigger::new("door").with_action(move || h.set(h.get() + 1)));

        for _ in 0..3 {
            let arrival = reg.check_arrival(at(4, 4));
            arrival.fired().unwrap().run_actions();
        }
        assert_eq!(hits.get(), 3);
        assert_eq!(reg.session(), &TriggerSession::default());
    }

    #[test]
    fn actions_run_in_registration_order() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let (o1, o2) = (Rc::clone(&order), Rc::clone(&order));
        let t = Trigger::new("x")
            .with_action(move || o1.borrow_mut().push(1))
            .with_action(move || o2.borrow_mut().push(2));
        t.run_actions();
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn removal_by_tile_and_tag() {
        let mut reg = TriggerRegistry::new();
        reg.add_area_trigger(Region::from_corners(0, 0, 2, 2), Trigger::new("fog"));
        reg.add_trigger(at(9, 9), Trigger::new("npc"));
        assert!(reg.remove_trigger(at(1, 1)).is_some());
        assert!(reg.remove_trigger(at(1, 1)).is_none());
        assert_eq!(reg.remove_triggers_by_tag("fog"), 8);
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(at(9, 9)));
    }

    #[test]
    fn point_overwrites_existing() {
        let mut reg = TriggerRegistry::new();
        reg.place(at(0, 0), Trigger::new("old"));
        reg.place(at(0, 0), Trigger::new("new"));
        assert_eq!(reg.get(at(0, 0)).unwrap().tag, "new");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn quiet_without_remembered_tag() {
        let mut reg = TriggerRegistry::new();
        assert!(matches!(reg.check_arrival(at(0, 0)), Arrival::Quiet));
    }

    #[test]
    fn reset_session_clears_everything() {
        let mut reg = TriggerRegistry::new();
        reg.add_trigger(at(0, 0), Trigger::new("t").with_text("x"));
        reg.check_arrival(at(0, 0));
        reg.set_dialog_active(true);
        reg.reset_session();
        assert_eq!(reg.session(), &TriggerSession::default());
        assert!(!reg.dialog_active());
    }
}
