/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Movement (start_move / stop_move)
///   A / Start             →  Confirm (advance dialog)
///   Select                →  Quit
///
/// Without the `gamepad` feature this compiles to a tracker that never
/// reports anything.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::info;

use overworld::config::GamepadConfig;
use overworld::Direction;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// What the pad did since the last `update()`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadAction {
    StartMove(Direction),
    StopMove(Direction),
    Confirm,
    Cancel,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::A, Btn::Start],
            cancel:  vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Per-button "pressed since last update" flags.
    just_pressed: [bool; BTN_COUNT],

    /// D-pad held state, indexed like `Direction::CARDINAL`.
    dpad: [bool; 4],
    stick_x: f32,
    stick_y: f32,

    /// Directions reported as held after the previous update.
    moving: [bool; 4],

    action_map: ActionMap,
}

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
fn dir_index(dir: Direction) -> Option<usize> {
    Direction::CARDINAL.iter().position(|d| *d == dir)
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                info!(pads = g.gamepads().count(), "gamepad_ready");
                Some(g)
            }
            Err(error) => {
                info!(%error, "gamepad_unavailable");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            just_pressed: [false; BTN_COUNT],
            dpad: [false; 4],
            stick_x: 0.0,
            stick_y: 0.0,
            moving: [false; 4],
            action_map: ActionMap::default(),
        }
    }

    /// Load button mapping from config. Unknown names are skipped; an
    /// empty result keeps the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let cf = parse_list(&cfg.confirm);
        if !cf.is_empty() { self.action_map.confirm = cf; }
        let ca = parse_list(&cfg.cancel);
        if !ca.is_empty() { self.action_map.cancel = ca; }
    }

    /// Poll the pad and return movement edges plus button actions.
    pub fn update(&mut self) -> Vec<PadAction> {
        self.just_pressed = [false; BTN_COUNT];

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        self.collect_actions()
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(axis, value, _) => match axis {
                    Axis::LeftStickX => self.stick_x = value,
                    Axis::LeftStickY => self.stick_y = value,
                    _ => {}
                },
                EventType::Connected => info!("gamepad_connected"),
                EventType::Disconnected => {
                    self.release_all();
                    info!("gamepad_disconnected");
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad handled separately (not in Btn enum)
        let dpad_dir = match gilrs_btn {
            Button::DPadUp    => Some(Direction::Up),
            Button::DPadDown  => Some(Direction::Down),
            Button::DPadLeft  => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(i) = dpad_dir.and_then(dir_index) {
            self.dpad[i] = held;
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            if held {
                self.just_pressed[btn as usize] = true;
            }
        }
    }

    // ── Action derivation ──

    fn stick_held(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => self.stick_y > STICK_DEADZONE,
            Direction::Down => self.stick_y < -STICK_DEADZONE,
            Direction::Left => self.stick_x < -STICK_DEADZONE,
            Direction::Right => self.stick_x > STICK_DEADZONE,
            Direction::None => false,
        }
    }

    fn collect_actions(&mut self) -> Vec<PadAction> {
        let mut actions = Vec::new();
        for (i, dir) in Direction::CARDINAL.iter().copied().enumerate() {
            let held = self.dpad[i] || self.stick_held(dir);
            if held != self.moving[i] {
                self.moving[i] = held;
                actions.push(if held { PadAction::StartMove(dir) } else { PadAction::StopMove(dir) });
            }
        }
        if self.any_just_pressed(&self.action_map.confirm) {
            actions.push(PadAction::Confirm);
        }
        if self.any_just_pressed(&self.action_map.cancel) {
            actions.push(PadAction::Cancel);
        }
        actions
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.just_pressed[b as usize])
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.just_pressed = [false; BTN_COUNT];
        self.dpad = [false; 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stick_edges_become_start_and_stop() {
        let mut pad = GamepadState::new();
        pad.stick_x = 0.9;
        assert_eq!(pad.collect_actions(), vec![PadAction::StartMove(Direction::Right)]);
        assert!(pad.collect_actions().is_empty());

        pad.stick_x = 0.1;
        assert_eq!(pad.collect_actions(), vec![PadAction::StopMove(Direction::Right)]);
    }

    #[test]
    fn dpad_and_stick_merge() {
        let mut pad = GamepadState::new();
        pad.dpad[dir_index(Direction::Up).unwrap()] = true;
        pad.stick_y = 0.8;
        assert_eq!(pad.collect_actions(), vec![PadAction::StartMove(Direction::Up)]);
        pad.stick_y = 0.0;
        assert!(pad.collect_actions().is_empty());
    }

    #[test]
    fn disconnect_stops_movement() {
        let mut pad = GamepadState::new();
        pad.dpad[dir_index(Direction::Left).unwrap()] = true;
        pad.collect_actions();
        pad.release_all();
        assert_eq!(pad.collect_actions(), vec![PadAction::StopMove(Direction::Left)]);
    }

    #[test]
    fn button_config_overrides_defaults() {
        let mut pad = GamepadState::new();
        pad.load_button_config(&GamepadConfig {
            confirm: vec!["x".into(), "bogus".into()],
            cancel: vec![],
        });
        pad.just_pressed[Btn::A as usize] = true;
        assert!(pad.collect_actions().is_empty());
        pad.just_pressed[Btn::X as usize] = true;
        pad.just_pressed[Btn::Select as usize] = true;
        assert_eq!(pad.collect_actions(), vec![PadAction::Confirm, PadAction::Cancel]);
    }
}
