/// Test doubles shared by the sim unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::domain::direction::Direction;
use crate::domain::grid::GridCoord;
use crate::domain::walls::WallSet;
use crate::error::{AnimationError, StoreError};
use super::ports::{
    AnimationProvider, Collaborators, EventPublisher, OverworldEvent, PositionStore, SceneShifter,
};

#[derive(Debug, Default)]
pub struct Log {
    pub anim: Vec<String>,
    pub shifts: Vec<(i32, i32)>,
    pub events: Vec<OverworldEvent>,
    pub saved: Vec<GridCoord>,
    pub stored: Option<GridCoord>,
}

impl Log {
    pub fn total_shift(&self) -> (i64, i64) {
        self.shifts
            .iter()
            .fold((0, 0), |(ax, ay), &(x, y)| (ax + i64::from(x), ay + i64::from(y)))
    }
}

/// Records every collaborator call into a shared `Log`.
#[derive(Clone, Default)]
pub struct Recorder {
    pub log: Rc<RefCell<Log>>,
    /// Animation the provider pretends not to have.
    pub missing: Option<Direction>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    pub fn missing(dir: Direction) -> Self {
        Recorder { missing: Some(dir), ..Recorder::default() }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            animation: Box::new(self.clone()),
            scene: Box::new(self.clone()),
            events: Box::new(self.clone()),
            store: Box::new(self.clone()),
        }
    }
}

impl AnimationProvider for Recorder {
    fn select_and_play(&mut self, dir: Direction) -> Result<(), AnimationError> {
        if self.missing == Some(dir) {
            return Err(AnimationError::Unknown { name: dir.name().to_string() });
        }
        self.log.borrow_mut().anim.push(format!("play:{}", dir.name()));
        Ok(())
    }

    fn stop_at_rest_frame(&mut self) {
        self.log.borrow_mut().anim.push("stop".to_string());
    }
}

impl SceneShifter for Recorder {
    fn shift_by(&mut self, dx: i32, dy: i32) {
        self.log.borrow_mut().shifts.push((dx, dy));
    }
}

impl EventPublisher for Recorder {
    fn publish(&mut self, event: OverworldEvent) {
        self.log.borrow_mut().events.push(event);
    }
}

impl PositionStore for Recorder {
    fn save(&mut self, tile: GridCoord) -> Result<(), StoreError> {
        let mut log = self.log.borrow_mut();
        log.saved.push(tile);
        log.stored = Some(tile);
        Ok(())
    }

    fn load(&self) -> Result<Option<GridCoord>, StoreError> {
        Ok(self.log.borrow().stored)
    }
}

/// Build walls from an ASCII map. `#` = wall, `@` = start tile, anything
/// else is floor. Row 0 is y = 0.
pub fn map_from(rows: &[&str]) -> (WallSet, GridCoord) {
    let mut walls = WallSet::new();
    let mut start = GridCoord::new(0, 0);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let c = GridCoord::new(x as i32, y as i32);
            match ch {
                '#' => walls.add_cell(c),
                '@' => start = c,
                _ => {}
            }
        }
    }
    (walls, start)
}
