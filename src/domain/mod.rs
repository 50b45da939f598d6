pub mod direction;
pub mod grid;
pub mod walls;
