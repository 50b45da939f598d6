pub mod dialog;
pub mod input;
pub mod movement;
pub mod ports;
pub mod step;
pub mod store;
pub mod timer;
pub mod trigger;
pub mod world;

#[cfg(test)]
pub(crate) mod testkit;
