/// Wall set: the only terrain property the overworld cares about.
///
/// Walls are supplied by map setup code, never parsed from a file.
/// Read once per committed step by the movement engine; the set is not
/// touched while a tick runs.

use std::collections::HashSet;

use super::grid::{GridCoord, GridKey, Placement, Region};

#[derive(Clone, Debug, Default)]
pub struct WallSet {
    cells: HashSet<GridKey>,
}

impl WallSet {
    pub fn new() -> Self {
        WallSet { cells: HashSet::with_capacity(256) }
    }

    pub fn add_cell(&mut self, c: GridCoord) {
        self.cells.insert(c.key());
    }

    /// Add every tile of the inclusive rectangle.
    pub fn add_region(&mut self, r: Region) {
        self.cells.extend(r.cells().map(GridCoord::key));
    }

    pub fn add(&mut self, placement: impl Into<Placement>) {
        match placement.into() {
            Placement::Point(c) => self.add_cell(c),
            Placement::Region(r) => self.add_region(r),
        }
    }

    /// Returns true if a wall was removed.
    pub fn remove_cell(&mut self, c: GridCoord) -> bool {
        self.cells.remove(&c.key())
    }

    #[inline]
    pub fn contains(&self, c: GridCoord) -> bool {
        self.cells.contains(&c.key())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_inclusive_of_both_corners() {
        let mut w = WallSet::new();
        w.add_region(Region::from_corners(0, 0, 2, 1));
        assert_eq!(w.len(), 6);
        assert!(w.contains(GridCoord::new(0, 0)));
        assert!(w.contains(GridCoord::new(2, 1)));
        assert!(!w.contains(GridCoord::new(3, 1)));
    }

    #[test]
    fn placement_variants() {
        let mut w = WallSet::new();
        w.add(GridCoord::new(-5, -5));
        w.add(Region::from_corners(1, 1, 1, 3));
        assert_eq!(w.len(), 4);
        assert!(w.contains(GridCoord::new(-5, -5)));
        assert!(w.contains(GridCoord::new(1, 2)));
    }

    #[test]
    fn duplicates_collapse_and_remove_works() {
        let mut w = WallSet::new();
        w.add_cell(GridCoord::new(4, 4));
        w.add_cell(GridCoord::new(4, 4));
        assert_eq!(w.len(), 1);
        assert!(w.remove_cell(GridCoord::new(4, 4)));
        assert!(!w.remove_cell(GridCoord::new(4, 4)));
        assert!(w.is_empty());
    }
}
