/// The step function: advances the overworld by frame ticks.
///
/// Per tick:
///   1. Movement (commit → advance → rest), see `MovementEngine::tick`
///   2. On arrival: trigger check
///        - fired with pages → open dialog, publish `DialogOpened`
///        - fired            → run actions in registration order
///        - left the area    → publish `LeftTriggerArea`
///   3. On arrival: save the tile
///
/// Wall-clock timers (run arm, dialog reveal) are not ticked here; see
/// `Overworld::advance_clock`.

use super::movement::TickOutcome;
use super::ports::OverworldEvent;
use super::trigger::Arrival;
use super::world::Overworld;
use crate::domain::grid::GridCoord;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut Overworld, ticks: u32) -> Vec<TickOutcome> {
    let mut outcomes = Vec::with_capacity(ticks as usize);
    for _ in 0..ticks {
        world.tick += 1;
        let dialog_active = world.triggers.dialog_active();
        let outcome = world.engine.tick(
            &mut world.input,
            &world.walls,
            dialog_active,
            world.collab.animation.as_mut(),
            world.collab.scene.as_mut(),
        );
        if let TickOutcome::Arrived(tile) = outcome {
            resolve_arrival(world, tile);
        }
        outcomes.push(outcome);
    }
    outcomes
}

fn resolve_arrival(world: &mut Overworld, tile: GridCoord) {
    match world.triggers.check_arrival(tile) {
        Arrival::Fired(trigger) => {
            if trigger.has_pages() {
                world.open_dialog(trigger.pages.clone());
            }
            trigger.run_actions();
        }
        Arrival::LeftArea => world.collab.events.publish(OverworldEvent::LeftTriggerArea),
        Arrival::Quiet => {}
    }
    world.persist(tile);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
